//! 16-color sprite palettes
//!
//! A sprite file opens with a 512-byte block of 16 palette slots. Each slot
//! holds 16 packed-555 words (32 bytes). Only slot 0 is guaranteed to be
//! populated; see [`resolve_palette_slot`] for the fallback rule.

use image::{Rgb, Rgba};

use crate::color::{packed_to_rgb, read_packed, rgb_to_packed};

/// Colors per palette.
pub const PALETTE_COLORS: usize = 16;

/// Bytes per palette slot (16 colors x 2 bytes).
pub const PALETTE_SLOT_BYTES: usize = PALETTE_COLORS * 2;

/// Number of palette slots in the palette block.
pub const PALETTE_SLOTS: usize = 16;

/// Size of the palette block at the head of every sprite file.
pub const PALETTE_BLOCK_BYTES: usize = PALETTE_SLOT_BYTES * PALETTE_SLOTS;

/// Transparent color used for palette index 0
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A decoded 16-color palette ready for rendering.
///
/// Index 0 is always [`TRANSPARENT`], whatever its stored bits are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgba<u8>; PALETTE_COLORS],
}

impl Palette {
    /// Build a palette from 16 opaque colors. Index 0 is forced transparent.
    pub fn from_colors(colors: [Rgb<u8>; PALETTE_COLORS]) -> Self {
        let mut out = [TRANSPARENT; PALETTE_COLORS];
        for (i, c) in colors.iter().enumerate().skip(1) {
            out[i] = Rgba([c.0[0], c.0[1], c.0[2], 255]);
        }
        Self { colors: out }
    }

    /// Decode 32 bytes of packed-555 words.
    ///
    /// Callers must pass at least [`PALETTE_SLOT_BYTES`] bytes.
    fn from_slot_bytes(bytes: &[u8]) -> Self {
        let mut colors = [Rgb([0, 0, 0]); PALETTE_COLORS];
        for (i, color) in colors.iter_mut().enumerate() {
            *color = packed_to_rgb(read_packed(bytes[i * 2], bytes[i * 2 + 1]));
        }
        Self::from_colors(colors)
    }

    pub fn get(&self, index: usize) -> Rgba<u8> {
        self.colors[index & 0x0F]
    }

    pub fn colors(&self) -> &[Rgba<u8>; PALETTE_COLORS] {
        &self.colors
    }

    /// Encode back to 32 bytes of packed-555 words.
    ///
    /// Index 0 is written as zero.
    pub fn to_bytes(&self) -> [u8; PALETTE_SLOT_BYTES] {
        let mut out = [0u8; PALETTE_SLOT_BYTES];
        for (i, c) in self.colors.iter().enumerate().skip(1) {
            let word = rgb_to_packed(Rgb([c.0[0], c.0[1], c.0[2]]));
            out[i * 2..i * 2 + 2].copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// True when the stored word is black, with or without the unused top bit.
fn is_black_word(word: u16) -> bool {
    word == 0x0000 || word == 0x8000
}

/// True when every entry except the transparent index 0 is black.
///
/// The caller must pass at least [`PALETTE_SLOT_BYTES`] bytes.
pub fn is_blank_slot(slot_bytes: &[u8]) -> bool {
    (1..PALETTE_COLORS)
        .map(|i| read_packed(slot_bytes[i * 2], slot_bytes[i * 2 + 1]))
        .all(is_black_word)
}

/// Pick the palette slot actually used for rendering.
///
/// Compatibility rule: a slot whose region lies outside the palette block
/// (or outside `data`), or whose colors are all black, is replaced by
/// slot 0. Slot 0 itself is always returned as-is.
pub fn resolve_palette_slot(data: &[u8], slot: usize) -> usize {
    if slot == 0 {
        return 0;
    }
    let offset = slot * PALETTE_SLOT_BYTES;
    let end = offset + PALETTE_SLOT_BYTES;
    if end > PALETTE_BLOCK_BYTES || end > data.len() {
        log::debug!("palette slot {} out of bounds, using slot 0", slot);
        return 0;
    }
    if is_blank_slot(&data[offset..end]) {
        log::debug!("palette slot {} is all black, using slot 0", slot);
        return 0;
    }
    slot
}

/// Read a palette slot from sprite data, applying the slot-0 fallback.
///
/// Returns `None` only when `data` is too short to hold slot 0.
pub fn read_palette(data: &[u8], slot: usize) -> Option<Palette> {
    if data.len() < PALETTE_SLOT_BYTES {
        return None;
    }
    let offset = resolve_palette_slot(data, slot) * PALETTE_SLOT_BYTES;
    Some(Palette::from_slot_bytes(&data[offset..offset + PALETTE_SLOT_BYTES]))
}
