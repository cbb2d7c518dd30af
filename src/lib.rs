//! sprtheme - Library for recoloring indexed battle sprites
//!
//! This library provides functionality to:
//! - Decode 4bpp sprite sheets with packed-555 palettes into directional previews
//! - Derive shadow and highlight shades from a chosen base color per costume section
//! - Edit, reset and save a template's palette without touching its pixels
//! - Carry a palette into CLUT records of the `charclut.nxd` container

pub mod bridge;
pub mod cli;
pub mod color;
pub mod config;
pub mod output;
pub mod palette;
pub mod section;
pub mod shades;
pub mod sprite;
pub mod store;
