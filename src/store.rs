//! Editable palette buffer for one template
//!
//! A [`PaletteStore`] keeps the loaded sprite bytes as an immutable
//! original and a working copy that edits go into. Only palette slot 0 of
//! the working copy is ever written; pixel data passes through untouched.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use image::{Rgb, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{packed_to_rgb, read_packed, rgb_to_packed, to_hex};
use crate::palette::{PALETTE_BLOCK_BYTES, PALETTE_COLORS, PALETTE_SLOT_BYTES};
use crate::section::{JobSection, SectionError, SectionMapping};
use crate::shades::{FixedMultiplier, RelativePreserving, ShadeError, ShadeGenerator};
use crate::sprite::{decode_all_directions, DecodeError, Direction, DirectionalImageSet};

/// Error type for palette store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// File read or write failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Template data is malformed
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Shade generation failed
    #[error(transparent)]
    Shade(#[from] ShadeError),
    /// Section lookup failed
    #[error(transparent)]
    Section(#[from] SectionError),
    /// Palette index outside 0-15
    #[error("palette index {0} out of range (0-15)")]
    IndexOutOfRange(u8),
}

/// Which shade generator drives section recoloring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ShadeStrategy {
    /// Fixed per-role multipliers
    #[default]
    Fixed,
    /// Replay the template's original color relationships
    Relative,
}

/// Working palette buffer of one editing session.
#[derive(Debug, Clone)]
pub struct PaletteStore {
    original: Vec<u8>,
    working: Vec<u8>,
    // Captured on first use per section name, dropped on reset
    relative: HashMap<String, RelativePreserving>,
}

impl PaletteStore {
    /// Wrap raw sprite bytes. The buffer must hold the full palette block.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, StoreError> {
        if data.len() < PALETTE_BLOCK_BYTES {
            return Err(DecodeError::MissingPaletteBlock(data.len()).into());
        }
        Ok(Self { working: data.clone(), original: data, relative: HashMap::new() })
    }

    /// Read a sprite file as the original baseline.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let data = fs::read(path)?;
        log::debug!("loaded template {} ({} bytes)", path.display(), data.len());
        Self::from_bytes(data)
    }

    fn check_index(index: u8) -> Result<usize, StoreError> {
        if (index as usize) < PALETTE_COLORS {
            Ok(index as usize * 2)
        } else {
            Err(StoreError::IndexOutOfRange(index))
        }
    }

    /// Write `color` into palette slot 0 at `index`.
    pub fn set_color(&mut self, index: u8, color: Rgb<u8>) -> Result<(), StoreError> {
        let offset = Self::check_index(index)?;
        let word = rgb_to_packed(color);
        self.working[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
        Ok(())
    }

    /// Current color at `index` in palette slot 0.
    pub fn get_color(&self, index: u8) -> Result<Rgb<u8>, StoreError> {
        color_at(&self.working, index)
    }

    /// Color at `index` before any edits.
    pub fn original_color(&self, index: u8) -> Result<Rgb<u8>, StoreError> {
        color_at(&self.original, index)
    }

    /// Copy the raw stored word for `index` from another store, avoiding a
    /// lossy RGB round trip.
    pub fn copy_index_from(&mut self, index: u8, source: &PaletteStore) -> Result<(), StoreError> {
        let offset = Self::check_index(index)?;
        self.working[offset..offset + 2].copy_from_slice(&source.working[offset..offset + 2]);
        Ok(())
    }

    /// Recolor one section with an explicit generator.
    ///
    /// Accent roles are skipped and keep their template color. Linked
    /// sections are not followed; see [`PaletteStore::apply_section`].
    /// Returns the number of indices written.
    pub fn apply_section_with(
        &mut self,
        section: &JobSection,
        base: Rgb<u8>,
        generator: &dyn ShadeGenerator,
    ) -> Result<usize, StoreError> {
        let mut written = 0;
        for (index, role) in section.pairs() {
            if role.is_accent() {
                continue;
            }
            let color = generator.shade(index, role, base)?;
            self.set_color(index, color)?;
            written += 1;
        }
        Ok(written)
    }

    /// Recolor the named section and every section linked with it.
    ///
    /// The link group is everything reachable through `linked_to` in either
    /// direction (see [`SectionMapping::link_group`]). Every member receives
    /// the same base color and is written once.
    pub fn apply_section(
        &mut self,
        mapping: &SectionMapping,
        name: &str,
        base: Rgb<u8>,
        strategy: ShadeStrategy,
    ) -> Result<usize, StoreError> {
        let mut written = 0;
        for member in mapping.link_group(name)? {
            written += match strategy {
                ShadeStrategy::Fixed => self.apply_section_with(member, base, &FixedMultiplier)?,
                ShadeStrategy::Relative => {
                    let generator = self.relative_generator(member)?.clone();
                    self.apply_section_with(member, base, &generator)?
                }
            };
        }
        log::debug!("applied {} to section '{}' ({} indices)", to_hex(base), name, written);
        Ok(written)
    }

    /// Relative generator for a section, captured from the original colors
    /// on first use.
    pub fn relative_generator(
        &mut self,
        section: &JobSection,
    ) -> Result<&RelativePreserving, StoreError> {
        match self.relative.entry(section.name.clone()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut originals = BTreeMap::new();
                for &index in &section.indices {
                    originals.insert(index, color_at(&self.original, index)?);
                }
                let primary = section.primary_index().ok_or_else(|| {
                    SectionError::Validation(vec![format!("section '{}' has no indices", section.name)])
                })?;
                Ok(&*entry.insert(RelativePreserving::new(&originals, primary)?))
            }
        }
    }

    /// The full working buffer.
    pub fn data(&self) -> &[u8] {
        &self.working
    }

    /// The working 512-byte palette block.
    pub fn palette_block(&self) -> &[u8] {
        &self.working[..PALETTE_BLOCK_BYTES]
    }

    /// The working palette slot 0 (32 bytes).
    pub fn slot_bytes(&self) -> &[u8] {
        &self.working[..PALETTE_SLOT_BYTES]
    }

    pub fn is_modified(&self) -> bool {
        self.working != self.original
    }

    /// Directional previews of the working buffer.
    pub fn previews(&self, palette_slot: usize) -> Result<DirectionalImageSet, DecodeError> {
        decode_all_directions(&self.working, palette_slot)
    }

    /// Preview of one facing using palette slot 0.
    pub fn preview(&self, direction: Direction) -> Result<RgbaImage, DecodeError> {
        Ok(self.previews(0)?.get(direction).clone())
    }

    /// Discard all edits and captured relationships.
    pub fn reset(&mut self) {
        self.working = self.original.clone();
        self.relative.clear();
    }

    /// Write the working buffer verbatim as a sprite file.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, &self.working)?;
        log::info!("saved sprite {}", path.display());
        Ok(())
    }
}

/// Slot 0 color at `index` of a raw sprite buffer.
fn color_at(data: &[u8], index: u8) -> Result<Rgb<u8>, StoreError> {
    let offset = PaletteStore::check_index(index)?;
    Ok(packed_to_rgb(read_packed(data[offset], data[offset + 1])))
}
