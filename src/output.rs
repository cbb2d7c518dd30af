//! PNG output, preview scaling and file path generation

use image::imageops::FilterType;
use image::{Rgba, RgbaImage};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::sprite::{Direction, DirectionalImageSet};

/// Transparent color used for padding
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Save an RGBA image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    image.save(path)?;
    Ok(())
}

/// Scale image by integer factor using nearest-neighbor interpolation.
///
/// A factor of 0 or 1 returns the image unchanged.
pub fn scale_image(image: RgbaImage, factor: u8) -> RgbaImage {
    if factor <= 1 {
        return image;
    }
    let (w, h) = image.dimensions();
    let new_w = w * factor as u32;
    let new_h = h * factor as u32;
    image::imageops::resize(&image, new_w, new_h, FilterType::Nearest)
}

/// Lay frames out in a grid, left to right.
///
/// `cols` of `None` puts every frame on one row. Frames smaller than the
/// largest one are padded with transparency.
///
/// # Examples
///
/// ```
/// use image::RgbaImage;
/// use sprtheme::output::render_strip;
///
/// let frame = RgbaImage::from_pixel(2, 2, image::Rgba([255, 0, 0, 255]));
/// let frames = vec![frame.clone(), frame.clone(), frame.clone(), frame];
///
/// let strip = render_strip(&frames, None);
/// assert_eq!(strip.dimensions(), (8, 2));
///
/// let grid = render_strip(&frames, Some(2));
/// assert_eq!(grid.dimensions(), (4, 4));
/// ```
pub fn render_strip(frames: &[RgbaImage], cols: Option<u32>) -> RgbaImage {
    if frames.is_empty() {
        return RgbaImage::from_pixel(1, 1, TRANSPARENT);
    }

    let max_width = frames.iter().map(|f| f.width()).max().unwrap_or(1);
    let max_height = frames.iter().map(|f| f.height()).max().unwrap_or(1);

    let num_frames = frames.len() as u32;
    let columns = cols.unwrap_or(num_frames).max(1);
    let rows = num_frames.div_ceil(columns);

    let mut sheet = RgbaImage::from_pixel(columns * max_width, rows * max_height, TRANSPARENT);

    for (i, frame) in frames.iter().enumerate() {
        let dest_x = (i as u32 % columns) * max_width;
        let dest_y = (i as u32 / columns) * max_height;
        image::imageops::overlay(&mut sheet, frame, dest_x as i64, dest_y as i64);
    }

    sheet
}

/// All eight facings side by side in preview order.
pub fn render_direction_strip(set: &DirectionalImageSet) -> RgbaImage {
    render_strip(set.images(), None)
}

/// Generate the output path for a preview.
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o`, all directions | `{input_stem}_preview.png` next to input |
/// | No `-o`, one direction | `{input_stem}_{dir}.png` next to input |
/// | `-o dir/` | same names inside `dir/` |
/// | `-o file.png` | `file.png` |
pub fn generate_preview_path(
    input: &Path,
    direction: Option<Direction>,
    output_arg: Option<&Path>,
) -> PathBuf {
    let input_stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("sprite");
    let suffix = direction.map(|d| d.abbrev()).unwrap_or("preview");
    let file_name = format!("{}_{}.png", input_stem, suffix);

    match output_arg {
        Some(output) => {
            let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();
            if is_dir {
                output.join(file_name)
            } else {
                output.to_path_buf()
            }
        }
        None => {
            let parent = input.parent().unwrap_or(Path::new(""));
            if parent.as_os_str().is_empty() {
                PathBuf::from(file_name)
            } else {
                parent.join(file_name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_path_default() {
        let path = generate_preview_path(Path::new("battle_knight_m_spr.bin"), None, None);
        assert_eq!(path, PathBuf::from("battle_knight_m_spr_preview.png"));
    }

    #[test]
    fn test_preview_path_direction_next_to_input() {
        let path = generate_preview_path(
            Path::new("sprites/battle_knight_m_spr.bin"),
            Some(Direction::SouthWest),
            None,
        );
        assert_eq!(path, PathBuf::from("sprites/battle_knight_m_spr_sw.png"));
    }

    #[test]
    fn test_preview_path_output_dir() {
        let path = generate_preview_path(Path::new("a/knight.bin"), None, Some(Path::new("out/")));
        assert_eq!(path, PathBuf::from("out/knight_preview.png"));
    }

    #[test]
    fn test_preview_path_explicit_file() {
        let path = generate_preview_path(
            Path::new("knight.bin"),
            Some(Direction::North),
            Some(Path::new("n.png")),
        );
        assert_eq!(path, PathBuf::from("n.png"));
    }

    #[test]
    fn test_scale_image() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(1, 0, Rgba([9, 9, 9, 255]));
        let scaled = scale_image(image.clone(), 3);
        assert_eq!(scaled.dimensions(), (6, 3));
        assert_eq!(*scaled.get_pixel(5, 2), Rgba([9, 9, 9, 255]));
        assert_eq!(*scaled.get_pixel(2, 0), TRANSPARENT);
        assert_eq!(scale_image(image.clone(), 1), image);
    }

    #[test]
    fn test_strip_pads_smaller_frames() {
        let red = Rgba([255, 0, 0, 255]);
        let small = RgbaImage::from_pixel(2, 2, red);
        let large = RgbaImage::from_pixel(4, 4, red);
        let strip = render_strip(&[small, large], None);
        assert_eq!(strip.dimensions(), (8, 4));
        assert_eq!(*strip.get_pixel(0, 0), red);
        assert_eq!(*strip.get_pixel(3, 3), TRANSPARENT);
        assert_eq!(*strip.get_pixel(4, 0), red);
    }

    #[test]
    fn test_strip_empty() {
        assert_eq!(render_strip(&[], None).dimensions(), (1, 1));
    }

    #[test]
    fn test_save_png_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let image = RgbaImage::from_pixel(3, 3, Rgba([1, 2, 3, 255]));
        save_png(&image, &path).unwrap();
        let loaded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_save_png_error_kinds() {
        use std::error::Error as _;

        let dir = tempfile::tempdir().unwrap();
        let image = RgbaImage::new(1, 1);

        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let err = save_png(&image, &blocker.join("sub").join("out.png")).unwrap_err();
        assert!(matches!(err, OutputError::Io(_)));
        assert!(err.to_string().starts_with("IO error: "));
        assert!(err.source().is_some());

        let err = save_png(&image, &dir.path().join("out.xyz")).unwrap_err();
        assert!(matches!(err, OutputError::Image(_)));
        assert!(err.to_string().starts_with("Image error: "));
    }
}
