//! Loading theme recipes from `theme.toml`
//!
//! Provides functions to load, validate and merge configuration.

use super::schema::ThemeConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::store::ShadeStrategy;

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse theme.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override shade strategy
    pub strategy: Option<ShadeStrategy>,
    /// Override recolored sprite path
    pub sprite_out: Option<PathBuf>,
    /// Override preview path
    pub preview_out: Option<PathBuf>,
    /// Override preview scale
    pub scale: Option<u8>,
}

/// Load a theme recipe.
///
/// Relative paths inside the recipe are resolved against the recipe's
/// own directory.
///
/// # Returns
/// - `Ok(ThemeConfig)` on success
/// - `Err(ConfigError)` if the file cannot be read, parsed or validated
pub fn load_theme(path: &Path) -> Result<ThemeConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let mut config = parse_theme(&contents)?;
    if let Some(dir) = path.parent() {
        config.resolve_paths(dir);
    }
    log::debug!("loaded theme recipe {}", path.display());
    Ok(config)
}

/// Parse and validate recipe text without touching paths.
pub fn parse_theme(contents: &str) -> Result<ThemeConfig, ConfigError> {
    let config: ThemeConfig = toml::from_str(contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut ThemeConfig, overrides: &CliOverrides) {
    if let Some(strategy) = overrides.strategy {
        config.generator.strategy = strategy;
    }

    if let Some(ref sprite) = overrides.sprite_out {
        config.output.sprite = Some(sprite.clone());
    }

    if let Some(ref preview) = overrides.preview_out {
        config.output.preview = Some(preview.clone());
    }

    if let Some(scale) = overrides.scale {
        config.output.scale = scale;
    }
}
