//! Preview command implementation

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use rayon::prelude::*;

use crate::output::{generate_preview_path, render_direction_strip, save_png, scale_image};
use crate::sprite::{decode_all_directions, Direction};

use super::{expand_inputs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the preview command
///
/// Each input is an independent template, so files are decoded and
/// written in parallel.
pub fn run_preview(
    inputs: &[String],
    output: Option<&Path>,
    slot: usize,
    scale: u8,
    direction: Option<Direction>,
) -> ExitCode {
    let files = match expand_inputs(inputs) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    if files.len() > 1 {
        if let Some(out) = output {
            if !out.as_os_str().to_string_lossy().ends_with('/') && !out.is_dir() {
                eprintln!("Error: multiple inputs need a directory for -o (end it with '/')");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
        }
    }

    let results: Vec<(PathBuf, Result<PathBuf, String>)> = files
        .par_iter()
        .map(|input| (input.clone(), render_preview(input, output, slot, scale, direction)))
        .collect();

    let mut failed = 0;
    for (input, result) in results {
        match result {
            Ok(path) => println!("Saved: {}", path.display()),
            Err(e) => {
                eprintln!("Error: {}: {}", input.display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}

/// Decode one sprite file and write its preview PNG.
pub(crate) fn render_preview(
    input: &Path,
    output: Option<&Path>,
    slot: usize,
    scale: u8,
    direction: Option<Direction>,
) -> Result<PathBuf, String> {
    let data = fs::read(input).map_err(|e| format!("cannot read: {}", e))?;
    let set = decode_all_directions(&data, slot).map_err(|e| e.to_string())?;

    let image = match direction {
        Some(d) => set.get(d).clone(),
        None => render_direction_strip(&set),
    };
    let image = scale_image(image, scale);

    let path = generate_preview_path(input, direction, output);
    save_png(&image, &path).map_err(|e| e.to_string())?;
    log::debug!("rendered {} -> {}", input.display(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::PALETTE_BLOCK_BYTES;
    use crate::sprite::{SHEET_WIDTH, SPRITE_HEIGHT, SPRITE_WIDTH};
    use tempfile::TempDir;

    fn blank_template() -> Vec<u8> {
        let mut data = vec![0u8; PALETTE_BLOCK_BYTES + (SHEET_WIDTH * SPRITE_HEIGHT / 2) as usize];
        // Index 1 of slot 0 is pure red
        data[2..4].copy_from_slice(&0x001Fu16.to_le_bytes());
        data
    }

    #[test]
    fn test_render_preview_strip() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("knight.bin");
        fs::write(&input, blank_template()).unwrap();

        let path = render_preview(&input, None, 0, 1, None).unwrap();
        assert_eq!(path, temp.path().join("knight_preview.png"));
        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (SPRITE_WIDTH * 2 * 8, SPRITE_HEIGHT * 2));
    }

    #[test]
    fn test_render_preview_single_direction_scaled() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("knight.bin");
        fs::write(&input, blank_template()).unwrap();
        let out_dir = temp.path().join("out/");

        let path =
            render_preview(&input, Some(out_dir.as_path()), 0, 2, Some(Direction::NorthEast)).unwrap();
        assert_eq!(path, out_dir.join("knight_ne.png"));
        let image = image::open(&path).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (SPRITE_WIDTH * 4, SPRITE_HEIGHT * 4));
    }

    #[test]
    fn test_render_preview_errors() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.bin");
        assert!(render_preview(&missing, None, 0, 1, None).unwrap_err().contains("cannot read"));

        let short = temp.path().join("short.bin");
        fs::write(&short, [0u8; 16]).unwrap();
        assert!(render_preview(&short, None, 0, 1, None).is_err());
    }
}
