//! Theme recipe configuration
//!
//! Provides types and parsing for `theme.toml` recipes that describe which
//! template to recolor, how, and where to write the results.

pub mod loader;
pub mod schema;

pub use loader::{load_theme, merge_cli_overrides, parse_theme, CliOverrides, ConfigError};
pub use schema::*;
