//! Sprite sheet decoding
//!
//! After the 512-byte palette block, a sprite file holds a 4-bit indexed
//! bitmap 256 pixels wide. Two pixels share a byte: the even pixel lives in
//! the low nibble, the odd pixel in the high nibble. Sprites are 32x40
//! cells laid out left to right along the top of the sheet. Cells 0-4 hold
//! the five stored facings; the three east-facing directions are produced
//! by mirroring.

use image::RgbaImage;
use thiserror::Error;

use crate::output::scale_image;
use crate::palette::{read_palette, Palette, PALETTE_BLOCK_BYTES, PALETTE_SLOTS};

/// Width of one sprite cell in pixels.
pub const SPRITE_WIDTH: u32 = 32;

/// Height of one sprite cell in pixels.
pub const SPRITE_HEIGHT: u32 = 40;

/// Logical width of the sheet in pixels.
pub const SHEET_WIDTH: u32 = 256;

/// Number of cells that fit on one sheet row.
pub const SPRITES_PER_ROW: usize = (SHEET_WIDTH / SPRITE_WIDTH) as usize;

/// Upscale factor applied to directional previews.
pub const PREVIEW_SCALE: u8 = 2;

/// Error type for sprite decoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer is too small to contain the palette block
    #[error("sprite data is {0} bytes, smaller than the {block}-byte palette block", block = PALETTE_BLOCK_BYTES)]
    MissingPaletteBlock(usize),
    /// Palette slot outside 0-15
    #[error("palette slot {0} out of range (0-15)")]
    PaletteSlotOutOfRange(usize),
    /// Sprite cell outside the first sheet row
    #[error("sprite index {0} out of range (0-{max})", max = SPRITES_PER_ROW - 1)]
    SpriteIndexOutOfRange(usize),
    /// Sheet data ends before the requested cell does
    #[error("sprite {index} needs {needed} bytes but data has {actual}")]
    Truncated {
        index: usize,
        needed: usize,
        actual: usize,
    },
}

/// Facing directions, in preview order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl Direction {
    /// All directions in preview order (N, NE, E, SE, S, SW, W, NW).
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::NorthEast,
        Direction::East,
        Direction::SouthEast,
        Direction::South,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
    ];

    pub const CARDINALS: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    pub const CORNERS: [Direction; 4] = [
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthWest,
    ];

    /// Position of this direction in [`Direction::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Sheet cell this facing is drawn from and whether it is flipped.
    pub fn sheet_cell(self) -> (usize, bool) {
        match self {
            Direction::West => (0, false),
            Direction::SouthWest => (1, false),
            Direction::South => (2, false),
            Direction::NorthWest => (3, false),
            Direction::North => (4, false),
            Direction::East => (0, true),
            Direction::NorthEast => (3, true),
            Direction::SouthEast => (1, true),
        }
    }

    /// Short compass name, used in file names.
    pub fn abbrev(self) -> &'static str {
        match self {
            Direction::North => "n",
            Direction::NorthEast => "ne",
            Direction::East => "e",
            Direction::SouthEast => "se",
            Direction::South => "s",
            Direction::SouthWest => "sw",
            Direction::West => "w",
            Direction::NorthWest => "nw",
        }
    }

    /// Parse a compass abbreviation (case-insensitive).
    pub fn from_abbrev(s: &str) -> Option<Direction> {
        Direction::ALL.into_iter().find(|d| d.abbrev().eq_ignore_ascii_case(s))
    }
}

/// A sprite cell as raw palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedSprite {
    width: u32,
    height: u32,
    indices: Vec<u8>,
}

impl IndexedSprite {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index_at(&self, x: u32, y: u32) -> u8 {
        self.indices[(y * self.width + x) as usize]
    }

    /// Flip along the X axis. Only pixel positions change.
    pub fn mirrored(&self) -> IndexedSprite {
        let mut indices = Vec::with_capacity(self.indices.len());
        for row in self.indices.chunks(self.width as usize) {
            indices.extend(row.iter().rev());
        }
        IndexedSprite { width: self.width, height: self.height, indices }
    }

    /// Color the indices with a palette.
    pub fn to_image(&self, palette: &Palette) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            palette.get(self.index_at(x, y) as usize)
        })
    }
}

/// Number of bytes a buffer needs to contain the given cell.
fn bytes_needed(sprite_index: usize) -> usize {
    let last_pixel = (SPRITE_HEIGHT - 1) * SHEET_WIDTH + sprite_index as u32 * SPRITE_WIDTH
        + (SPRITE_WIDTH - 1);
    PALETTE_BLOCK_BYTES + (last_pixel / 2) as usize + 1
}

/// Extract one sprite cell as palette indices.
///
/// # Errors
///
/// Returns `DecodeError` when the index is outside the first sheet row or
/// the data ends before the cell does.
pub fn decode_indices(data: &[u8], sprite_index: usize) -> Result<IndexedSprite, DecodeError> {
    if sprite_index >= SPRITES_PER_ROW {
        return Err(DecodeError::SpriteIndexOutOfRange(sprite_index));
    }
    let needed = bytes_needed(sprite_index);
    if data.len() < needed {
        return Err(DecodeError::Truncated { index: sprite_index, needed, actual: data.len() });
    }

    let sheet = &data[PALETTE_BLOCK_BYTES..];
    let x_offset = sprite_index as u32 * SPRITE_WIDTH;
    let mut indices = Vec::with_capacity((SPRITE_WIDTH * SPRITE_HEIGHT) as usize);

    for y in 0..SPRITE_HEIGHT {
        for x in 0..SPRITE_WIDTH {
            let pixel = (y * SHEET_WIDTH + x_offset + x) as usize;
            let byte = sheet[pixel / 2];
            let index = if pixel % 2 == 0 { byte & 0x0F } else { byte >> 4 };
            indices.push(index);
        }
    }

    Ok(IndexedSprite { width: SPRITE_WIDTH, height: SPRITE_HEIGHT, indices })
}

/// Decode one sprite cell into a 32x40 image using `palette`.
///
/// Index 0 pixels come out transparent.
pub fn decode_sprite(
    data: &[u8],
    sprite_index: usize,
    palette: &Palette,
) -> Result<RgbaImage, DecodeError> {
    Ok(decode_indices(data, sprite_index)?.to_image(palette))
}

/// Read the palette for `slot`, rejecting slots outside the block.
///
/// In-range slots that are blank still fall back to slot 0.
pub fn palette_for_slot(data: &[u8], slot: usize) -> Result<Palette, DecodeError> {
    if slot >= PALETTE_SLOTS {
        return Err(DecodeError::PaletteSlotOutOfRange(slot));
    }
    if data.len() < PALETTE_BLOCK_BYTES {
        return Err(DecodeError::MissingPaletteBlock(data.len()));
    }
    read_palette(data, slot).ok_or(DecodeError::MissingPaletteBlock(data.len()))
}

/// Eight facing images, indexed by [`Direction`].
#[derive(Debug, Clone)]
pub struct DirectionalImageSet {
    images: Vec<RgbaImage>,
}

impl DirectionalImageSet {
    fn from_images(images: Vec<RgbaImage>) -> Self {
        debug_assert_eq!(images.len(), Direction::ALL.len());
        Self { images }
    }

    pub fn get(&self, direction: Direction) -> &RgbaImage {
        &self.images[direction.index()]
    }

    /// Look up by numeric orientation, clamping out-of-range values to the
    /// nearest valid one (0 = North ... 7 = NorthWest).
    pub fn get_clamped(&self, orientation: i32) -> &RgbaImage {
        &self.images[clamp_orientation(orientation)]
    }

    /// Images in preview order.
    pub fn images(&self) -> &[RgbaImage] {
        &self.images
    }

    pub fn cardinals(&self) -> [&RgbaImage; 4] {
        Direction::CARDINALS.map(|d| self.get(d))
    }

    pub fn corners(&self) -> [&RgbaImage; 4] {
        Direction::CORNERS.map(|d| self.get(d))
    }

    /// Nearest-neighbor upscale every image.
    pub fn scaled(self, factor: u8) -> Self {
        Self::from_images(self.images.into_iter().map(|img| scale_image(img, factor)).collect())
    }
}

/// Clamp a numeric orientation into 0..=7.
pub fn clamp_orientation(orientation: i32) -> usize {
    orientation.clamp(0, Direction::ALL.len() as i32 - 1) as usize
}

/// Decode all eight facings at native 32x40 size.
///
/// Cells 0-4 give W, SW, S, NW, N. E, NE and SE are the horizontal mirrors
/// of W, NW and SW.
pub fn decode_directions(data: &[u8], palette_slot: usize) -> Result<DirectionalImageSet, DecodeError> {
    let palette = palette_for_slot(data, palette_slot)?;

    let mut images = Vec::with_capacity(Direction::ALL.len());
    for direction in Direction::ALL {
        let (cell, mirrored) = direction.sheet_cell();
        let mut sprite = decode_indices(data, cell)?;
        if mirrored {
            sprite = sprite.mirrored();
        }
        images.push(sprite.to_image(&palette));
    }

    Ok(DirectionalImageSet::from_images(images))
}

/// Decode all eight facings upscaled by [`PREVIEW_SCALE`] for display.
pub fn decode_all_directions(
    data: &[u8],
    palette_slot: usize,
) -> Result<DirectionalImageSet, DecodeError> {
    Ok(decode_directions(data, palette_slot)?.scaled(PREVIEW_SCALE))
}

/// Mirror an image along the X axis.
pub fn mirror_horizontal(image: &RgbaImage) -> RgbaImage {
    image::imageops::flip_horizontal(image)
}

/// True when every pixel of the image has zero alpha.
pub fn is_fully_transparent(image: &RgbaImage) -> bool {
    image.pixels().all(|p| p.0[3] == 0)
}
