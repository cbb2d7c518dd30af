//! Configuration schema types for `theme.toml`
//!
//! Defines the structure and validation rules for theme recipes.

use image::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bridge::Chapter;
use crate::color::parse_hex_color;
use crate::palette::PALETTE_SLOTS;
use crate::store::ShadeStrategy;

/// Template section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Sprite file the theme starts from
    pub sprite: PathBuf,
    /// Section mapping JSON for the sprite
    pub sections: PathBuf,
    /// Palette slot used for previews
    #[serde(default)]
    pub palette_slot: usize,
}

/// Shade generator selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub strategy: ShadeStrategy,
}

/// Container patch target for characters whose colors live in `charclut.nxd`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NxdTarget {
    /// Container file patched in place
    pub container: PathBuf,
    /// Chapter identifier, e.g. "Chapter1"
    pub chapter: String,
    /// Write the chapter's shipped colors instead of the themed palette
    #[serde(default)]
    pub original: bool,
}

/// Output section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Recolored sprite file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprite: Option<PathBuf>,
    /// Directional preview strip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview: Option<PathBuf>,
    /// Extra upscale applied to the preview strip
    #[serde(default = "default_scale")]
    pub scale: u8,
    /// One entry per `[[output.nxd]]` table
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nxd: Vec<NxdTarget>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { sprite: None, preview: None, scale: default_scale(), nxd: Vec::new() }
    }
}

fn default_scale() -> u8 {
    2
}

/// Root of a `theme.toml` recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub template: TemplateConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Base color per section name, as `#RRGGBB`
    #[serde(default)]
    pub colors: BTreeMap<String, String>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// A validation error in the config
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "colors.cape")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "theme.toml: '{}' {}", self.field, self.message)
    }
}

impl ThemeConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.template.palette_slot >= PALETTE_SLOTS {
            errors.push(ConfigValidationError {
                field: "template.palette_slot".to_string(),
                message: format!("must be below {}", PALETTE_SLOTS),
            });
        }

        if self.output.scale == 0 {
            errors.push(ConfigValidationError {
                field: "output.scale".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        for (section, value) in &self.colors {
            if let Err(e) = parse_hex_color(value) {
                errors.push(ConfigValidationError {
                    field: format!("colors.{}", section),
                    message: format!("'{}' is not a valid color: {}", value, e),
                });
            }
        }

        let mut targets: Vec<(&Path, Chapter)> = Vec::new();
        for (i, nxd) in self.output.nxd.iter().enumerate() {
            match Chapter::from_name(&nxd.chapter) {
                Ok(chapter) if targets.contains(&(nxd.container.as_path(), chapter)) => {
                    errors.push(ConfigValidationError {
                        field: format!("output.nxd[{}].chapter", i),
                        message: format!(
                            "{} record of '{}' is already patched by an earlier entry",
                            chapter,
                            nxd.container.display()
                        ),
                    });
                }
                Ok(chapter) => targets.push((nxd.container.as_path(), chapter)),
                Err(_) => errors.push(ConfigValidationError {
                    field: format!("output.nxd[{}].chapter", i),
                    message: format!("unsupported chapter '{}'", nxd.chapter),
                }),
            }
        }

        errors
    }

    /// Section colors, parsed. Invalid entries are skipped; run
    /// [`ThemeConfig::validate`] first to report them.
    pub fn section_colors(&self) -> Vec<(&str, Rgb<u8>)> {
        self.colors
            .iter()
            .filter_map(|(name, value)| parse_hex_color(value).ok().map(|c| (name.as_str(), c)))
            .collect()
    }

    /// Resolve every relative path against `base` (the recipe's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.template.sprite);
        resolve(&mut self.template.sections);
        if let Some(p) = self.output.sprite.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.output.preview.as_mut() {
            resolve(p);
        }
        for nxd in &mut self.output.nxd {
            resolve(&mut nxd.container);
        }
    }
}
