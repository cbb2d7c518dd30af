//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod apply;
mod nxd;
mod preview;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::config::CliOverrides;
use crate::sprite::Direction;
use crate::store::ShadeStrategy;

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Check if a path looks like a sprite template (`.bin` / `.spr`).
pub fn is_sprite_file(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("bin") | Some("spr"))
}

/// Expand CLI inputs into sprite paths.
///
/// Arguments containing glob metacharacters are expanded; anything else is
/// taken literally. A pattern that matches nothing is an error.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            files.push(PathBuf::from(input));
            continue;
        }
        let paths = glob(input).map_err(|e| format!("invalid pattern '{}': {}", input, e))?;
        let matched: Vec<PathBuf> =
            paths.filter_map(Result::ok).filter(|p| is_sprite_file(p)).collect();
        if matched.is_empty() {
            return Err(format!("no sprite files match '{}'", input));
        }
        files.extend(matched);
    }
    Ok(files)
}

fn parse_direction(s: &str) -> Result<Direction, String> {
    Direction::from_abbrev(s)
        .ok_or_else(|| format!("unknown direction '{}' (expected n, ne, e, se, s, sw, w, nw)", s))
}

/// sprtheme - Recolor indexed battle sprites and preview all eight facings
#[derive(Parser)]
#[command(name = "sprtheme")]
#[command(about = "sprtheme - Recolor indexed battle sprites by section and preview all eight facings")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render directional previews of sprite files to PNG
    Preview {
        /// Sprite files or glob patterns (e.g. "sprites/*.bin")
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output file or directory.
        /// If omitted: {input}_preview.png (or {input}_{dir}.png) next to the input
        /// If directory (ends with /): dir/{input}_preview.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Palette slot to render with (0-15)
        #[arg(long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..16))]
        slot: u8,

        /// Extra integer upscale on top of the built-in 2x (1-16)
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: u8,

        /// Render a single facing (n, ne, e, se, s, sw, w, nw) instead of the strip
        #[arg(short, long, value_parser = parse_direction)]
        direction: Option<Direction>,
    },
    /// Apply a theme.toml recipe to its sprite template
    Apply {
        /// Theme recipe
        recipe: PathBuf,

        /// Override the recipe's shade strategy
        #[arg(long, value_enum)]
        strategy: Option<ShadeStrategy>,

        /// Override the recolored sprite path
        #[arg(long)]
        sprite_out: Option<PathBuf>,

        /// Override the preview path
        #[arg(long)]
        preview_out: Option<PathBuf>,

        /// Override the preview scale (1-16)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=16))]
        scale: Option<u8>,
    },
    /// Print a sprite's slot-0 palette
    Clut {
        /// Sprite file
        sprite: PathBuf,

        /// Print the 48-integer CLUT record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a palette into the CLUT records of a charclut.nxd container
    PatchNxd {
        /// Container file, patched in place
        container: PathBuf,

        /// Chapter identifier (Chapter1, Chapter23, Chapter4, ...); repeat to patch several
        #[arg(long = "chapter", required = true)]
        chapters: Vec<String>,

        /// Take the palette from this sprite file's slot 0
        #[arg(
            long,
            conflicts_with_all = ["clut", "original"],
            required_unless_present_any = ["clut", "original"]
        )]
        sprite: Option<PathBuf>,

        /// Take the palette from a 48-integer JSON array
        #[arg(long, conflicts_with = "original")]
        clut: Option<String>,

        /// Restore each chapter's shipped colors
        #[arg(long)]
        original: bool,

        /// Also print the converter commands and UPDATE statements for the SQL path
        #[arg(long)]
        print_sql: bool,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    // A second init (e.g. from tests) is harmless
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .try_init();
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Preview { inputs, output, slot, scale, direction } => {
            preview::run_preview(&inputs, output.as_deref(), slot as usize, scale, direction)
        }
        Commands::Apply { recipe, strategy, sprite_out, preview_out, scale } => {
            let overrides = CliOverrides { strategy, sprite_out, preview_out, scale };
            apply::run_apply(&recipe, &overrides)
        }
        Commands::Clut { sprite, json } => nxd::run_clut(&sprite, json),
        Commands::PatchNxd { container, chapters, sprite, clut, original, print_sql } => {
            let source = match (sprite.as_deref(), clut.as_deref()) {
                (Some(path), _) => nxd::RecordSource::Sprite(path),
                (None, Some(json)) => nxd::RecordSource::Json(json),
                (None, None) if original => nxd::RecordSource::Stock,
                (None, None) => {
                    eprintln!("Error: one of --sprite, --clut or --original is required");
                    return ExitCode::from(EXIT_INVALID_ARGS);
                }
            };
            nxd::run_patch_nxd(&container, &chapters, source, print_sql)
        }
    }
}
