//! Apply command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::bridge::{patch_chapters, to_clut_record, Chapter, ClutRecord};
use crate::config::{load_theme, merge_cli_overrides, CliOverrides, ThemeConfig};
use crate::output::{render_direction_strip, save_png, scale_image};
use crate::section::SectionMapping;
use crate::store::PaletteStore;

use super::{EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// What an applied recipe wrote.
#[derive(Debug, Default)]
pub(crate) struct ApplyReport {
    pub indices_written: usize,
    pub written: Vec<PathBuf>,
}

/// Execute the apply command
pub fn run_apply(recipe: &Path, overrides: &CliOverrides) -> ExitCode {
    let mut config = match load_theme(recipe) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    merge_cli_overrides(&mut config, overrides);

    if config.output.sprite.is_none()
        && config.output.preview.is_none()
        && config.output.nxd.is_empty()
    {
        eprintln!("Error: {} declares no [output] targets", recipe.display());
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    match apply_theme(&config) {
        Ok(report) => {
            for path in &report.written {
                println!("Saved: {}", path.display());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Recolor the template per `config` and write every configured output.
pub(crate) fn apply_theme(config: &ThemeConfig) -> Result<ApplyReport, String> {
    let mapping = SectionMapping::load(&config.template.sections).map_err(|e| {
        format!("{}: {}", config.template.sections.display(), e)
    })?;

    let mut store = PaletteStore::load(&config.template.sprite)
        .map_err(|e| format!("{}: {}", config.template.sprite.display(), e))?;

    let mut report = ApplyReport::default();
    let colors = config.section_colors();
    if colors.is_empty() {
        log::warn!("theme has no [colors]; outputs will match the template");
    }
    for (name, color) in colors {
        report.indices_written += store
            .apply_section(&mapping, name, color, config.generator.strategy)
            .map_err(|e| format!("section '{}': {}", name, e))?;
    }

    if let Some(path) = &config.output.sprite {
        store.save(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        report.written.push(path.clone());
    }

    if let Some(path) = &config.output.preview {
        let set = store.previews(config.template.palette_slot).map_err(|e| e.to_string())?;
        let strip = scale_image(render_direction_strip(&set), config.output.scale);
        save_png(&strip, path).map_err(|e| format!("{}: {}", path.display(), e))?;
        report.written.push(path.clone());
    }

    if !config.output.nxd.is_empty() {
        let themed = to_clut_record(store.slot_bytes()).map_err(|e| e.to_string())?;
        for (container, records) in container_batches(config, themed)? {
            patch_chapters(container, &records)
                .map_err(|e| format!("{}: {}", container.display(), e))?;
            report.written.push(container.to_path_buf());
        }
    }

    Ok(report)
}

/// Group `[[output.nxd]]` entries by container, in recipe order, so each
/// container is read and written once.
fn container_batches(
    config: &ThemeConfig,
    themed: ClutRecord,
) -> Result<Vec<(&Path, Vec<(Chapter, ClutRecord)>)>, String> {
    let mut batches: Vec<(&Path, Vec<(Chapter, ClutRecord)>)> = Vec::new();
    for target in &config.output.nxd {
        let chapter = Chapter::from_name(&target.chapter).map_err(|e| e.to_string())?;
        let record = if target.original { chapter.stock_record() } else { themed };
        let container = target.container.as_path();
        match batches.iter_mut().find(|(path, _)| *path == container) {
            Some((_, records)) => records.push((chapter, record)),
            None => batches.push((container, vec![(chapter, record)])),
        }
    }
    Ok(batches)
}
