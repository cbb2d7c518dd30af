//! Bridge between flat sprite palettes and CLUT records in an NXD container
//!
//! Some characters take their colors from a `charclut.nxd` database rather
//! than from their sprite files. Each record there stores 16 colors as 48
//! bytes (R, G, B per color). The container is edited either by patching
//! those 48 bytes in place at a known offset, or through its relational
//! mirror (table `CharCLUT`, column `CLUTData`) produced by an external
//! converter.

use std::fmt;
use std::fs;
use std::path::Path;

use image::Rgb;
use thiserror::Error;

use crate::color::{packed_to_rgb, read_packed, rgb_to_packed};
use crate::palette::{PALETTE_COLORS, PALETTE_SLOT_BYTES};

/// Integers per CLUT record (16 colors x RGB).
pub const CLUT_LEN: usize = PALETTE_COLORS * 3;

/// Table holding CLUT records in the relational mirror.
pub const CLUT_TABLE: &str = "CharCLUT";

/// Column holding the 48-integer JSON array.
pub const CLUT_COLUMN: &str = "CLUTData";

/// Game identifier passed to the converter.
const CONVERTER_GAME: &str = "fft";

/// Byte offset of each record's CLUT data inside `charclut.nxd`.
///
/// Taken from the shipped container; the layout is not a closed-form
/// function of the keys.
const RECORD_OFFSETS: &[((u32, u32), usize)] = &[
    ((1, 0), 0x379),
    ((1, 1), 0x3A9),
    ((1, 2), 0x3D9),
    ((1, 3), 0x409),
    ((2, 0), 0x439),
    ((2, 1), 0x469),
    ((2, 2), 0x499),
    ((2, 3), 0x4C9),
    ((3, 0), 0x4F9),
    ((3, 1), 0x529),
    ((3, 2), 0x559),
    ((3, 3), 0x589),
    ((254, 0), 0x5B9),
    ((254, 1), 0x5E9),
    ((255, 0), 0x619),
    ((255, 1), 0x649),
];

/// Shipped CLUT of the Chapter 1 record.
const STOCK_CHAPTER1: [u8; CLUT_LEN] = [
    0, 0, 0, 40, 32, 32, 224, 216, 208, 40, 56, 72, 48, 72, 104, 56, 96, 128, 80, 128, 184, 72,
    48, 40, 96, 56, 40, 144, 80, 40, 112, 64, 40, 184, 120, 40, 216, 152, 72, 160, 104, 40, 200,
    136, 80, 232, 192, 128,
];

/// Shipped CLUT of the Chapter 2/3 record.
const STOCK_CHAPTER23: [u8; CLUT_LEN] = [
    0, 0, 0, 40, 32, 32, 224, 216, 192, 72, 40, 88, 104, 72, 144, 144, 104, 208, 64, 64, 56, 120,
    112, 104, 168, 160, 152, 80, 32, 8, 128, 56, 8, 104, 64, 24, 160, 96, 24, 216, 160, 80, 200,
    128, 64, 232, 192, 128,
];

/// Shipped CLUT of the Chapter 4 record.
const STOCK_CHAPTER4: [u8; CLUT_LEN] = [
    0, 0, 0, 40, 32, 32, 224, 216, 192, 32, 64, 88, 40, 96, 120, 64, 136, 152, 64, 56, 56, 112,
    96, 80, 176, 160, 136, 80, 32, 8, 128, 56, 8, 104, 64, 24, 160, 96, 24, 216, 160, 80, 200,
    128, 64, 232, 192, 128,
];

/// Error type for CLUT conversion and container patching
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Chapter name with no record mapping
    #[error("unsupported chapter '{0}'")]
    UnsupportedChapter(String),
    /// Key pair missing from the offset table
    #[error("unknown CLUT record Key={0} Key2={1}")]
    UnknownRecord(u32, u32),
    /// CLUT array with the wrong number of entries
    #[error("CLUT data must have exactly {expected} values, got {0}", expected = CLUT_LEN)]
    WrongLength(usize),
    /// CLUT value outside 0-255
    #[error("CLUT value {value} at position {position} is outside 0-255")]
    ValueOutOfRange { position: usize, value: i64 },
    /// Palette input shorter than one slot
    #[error("palette data must be at least {expected} bytes, got {0}", expected = PALETTE_SLOT_BYTES)]
    ShortPalette(usize),
    /// Container too small for the record region
    #[error("container is {len} bytes; record at {offset:#X} needs {needed}")]
    ContainerTooSmall {
        offset: usize,
        needed: usize,
        len: usize,
    },
    /// JSON parse error
    #[error("invalid CLUT JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// File read or write failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One CLUT record: 16 colors as consecutive R, G, B values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClutRecord([u8; CLUT_LEN]);

impl ClutRecord {
    pub fn new(values: [u8; CLUT_LEN]) -> Self {
        Self(values)
    }

    /// Record with every color set to `color`.
    pub fn filled(color: Rgb<u8>) -> Self {
        let mut values = [0u8; CLUT_LEN];
        for chunk in values.chunks_mut(3) {
            chunk.copy_from_slice(&color.0);
        }
        Self(values)
    }

    pub fn values(&self) -> &[u8; CLUT_LEN] {
        &self.0
    }

    pub fn color(&self, index: usize) -> Rgb<u8> {
        let i = index * 3;
        Rgb([self.0[i], self.0[i + 1], self.0[i + 2]])
    }

    /// Serialize as the flat JSON array stored in `CLUTData`.
    pub fn to_json(&self) -> String {
        let values: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        format!("[{}]", values.join(","))
    }

    /// Parse the flat JSON array form, requiring 48 integers in 0-255.
    pub fn from_json(json: &str) -> Result<Self, BridgeError> {
        let raw: Vec<i64> = serde_json::from_str(json)?;
        Self::from_ints(&raw)
    }

    /// Build from integers, requiring exactly 48 values in 0-255.
    pub fn from_ints(raw: &[i64]) -> Result<Self, BridgeError> {
        if raw.len() != CLUT_LEN {
            return Err(BridgeError::WrongLength(raw.len()));
        }
        let mut values = [0u8; CLUT_LEN];
        for (position, (&value, out)) in raw.iter().zip(values.iter_mut()).enumerate() {
            *out = u8::try_from(value)
                .map_err(|_| BridgeError::ValueOutOfRange { position, value })?;
        }
        Ok(Self(values))
    }
}

/// Convert a 32-byte packed-555 palette into a CLUT record.
///
/// Only the first 32 bytes are read; longer input (such as a whole
/// palette block) is accepted.
pub fn to_clut_record(palette: &[u8]) -> Result<ClutRecord, BridgeError> {
    if palette.len() < PALETTE_SLOT_BYTES {
        return Err(BridgeError::ShortPalette(palette.len()));
    }
    let mut values = [0u8; CLUT_LEN];
    for i in 0..PALETTE_COLORS {
        let color = packed_to_rgb(read_packed(palette[i * 2], palette[i * 2 + 1]));
        values[i * 3..i * 3 + 3].copy_from_slice(&color.0);
    }
    Ok(ClutRecord(values))
}

/// Convert a CLUT record back to 32 bytes of packed-555 words.
pub fn from_clut_record(record: &ClutRecord) -> [u8; PALETTE_SLOT_BYTES] {
    let mut out = [0u8; PALETTE_SLOT_BYTES];
    for i in 0..PALETTE_COLORS {
        let word = rgb_to_packed(record.color(i));
        out[i * 2..i * 2 + 2].copy_from_slice(&word.to_le_bytes());
    }
    out
}

/// Story chapters that have their own CLUT record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chapter {
    One,
    TwoThree,
    Four,
}

impl Chapter {
    pub const ALL: [Chapter; 3] = [Chapter::One, Chapter::TwoThree, Chapter::Four];

    /// Parse a chapter identifier. Accepts `Chapter1`, `Chapter23`,
    /// `Chapter4` and their character-prefixed forms.
    pub fn from_name(name: &str) -> Result<Chapter, BridgeError> {
        match name {
            "Chapter1" | "RamzaCh1" | "RamzaChapter1" => Ok(Chapter::One),
            "Chapter2" | "Chapter3" | "Chapter23" | "RamzaCh23" | "RamzaChapter23" => {
                Ok(Chapter::TwoThree)
            }
            "Chapter4" | "RamzaCh4" | "RamzaChapter4" => Ok(Chapter::Four),
            _ => Err(BridgeError::UnsupportedChapter(name.to_string())),
        }
    }

    /// `(Key, Key2)` of the chapter's base-variant record.
    pub fn record_key(self) -> (u32, u32) {
        match self {
            Chapter::One => (1, 0),
            Chapter::TwoThree => (2, 0),
            Chapter::Four => (3, 0),
        }
    }

    /// Sprite template edited to produce this chapter's colors.
    pub fn sprite_file(self) -> &'static str {
        match self {
            Chapter::One => "battle_ramuza_spr.bin",
            Chapter::TwoThree => "battle_ramuza2_spr.bin",
            Chapter::Four => "battle_ramuza3_spr.bin",
        }
    }

    /// The record's colors as shipped with the game.
    pub fn stock_record(self) -> ClutRecord {
        ClutRecord(match self {
            Chapter::One => STOCK_CHAPTER1,
            Chapter::TwoThree => STOCK_CHAPTER23,
            Chapter::Four => STOCK_CHAPTER4,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Chapter::One => "Chapter1",
            Chapter::TwoThree => "Chapter23",
            Chapter::Four => "Chapter4",
        }
    }
}

impl fmt::Display for Chapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a chapter identifier to its record selector `(Key, Key2)`.
pub fn chapter_to_key(chapter: &str) -> Result<(u32, u32), BridgeError> {
    Chapter::from_name(chapter).map(Chapter::record_key)
}

/// Byte offset of a record's CLUT data inside the container.
pub fn record_byte_offset(key: u32, key2: u32) -> Result<usize, BridgeError> {
    RECORD_OFFSETS
        .iter()
        .find(|(k, _)| *k == (key, key2))
        .map(|(_, offset)| *offset)
        .ok_or(BridgeError::UnknownRecord(key, key2))
}

fn record_range(
    container_len: usize,
    key: u32,
    key2: u32,
) -> Result<std::ops::Range<usize>, BridgeError> {
    let offset = record_byte_offset(key, key2)?;
    let needed = offset + CLUT_LEN;
    if container_len < needed {
        return Err(BridgeError::ContainerTooSmall { offset, needed, len: container_len });
    }
    Ok(offset..needed)
}

/// Read a record's CLUT data from container bytes.
pub fn read_record(container: &[u8], key: u32, key2: u32) -> Result<ClutRecord, BridgeError> {
    let range = record_range(container.len(), key, key2)?;
    let mut values = [0u8; CLUT_LEN];
    values.copy_from_slice(&container[range]);
    Ok(ClutRecord(values))
}

/// Overwrite a record's CLUT data in container bytes.
pub fn patch_record_bytes(
    container: &mut [u8],
    key: u32,
    key2: u32,
    record: &ClutRecord,
) -> Result<(), BridgeError> {
    let range = record_range(container.len(), key, key2)?;
    container[range].copy_from_slice(record.values());
    Ok(())
}

/// Patch a record in a container file in place.
///
/// `clut_json` is the flat 48-integer array. The file is only rewritten
/// when the JSON, the key pair and the container size all check out.
pub fn patch_record(
    container_path: &Path,
    key: u32,
    key2: u32,
    clut_json: &str,
) -> Result<(), BridgeError> {
    let record = ClutRecord::from_json(clut_json)?;
    write_record(container_path, key, key2, &record)
}

/// Write one record into a container file in place.
pub fn write_record(
    container_path: &Path,
    key: u32,
    key2: u32,
    record: &ClutRecord,
) -> Result<(), BridgeError> {
    write_records(container_path, &[((key, key2), *record)])
}

/// Write several chapter records with a single read and a single write.
///
/// Nothing is written unless every record fits the container.
pub fn patch_chapters(
    container_path: &Path,
    records: &[(Chapter, ClutRecord)],
) -> Result<(), BridgeError> {
    let keyed: Vec<((u32, u32), ClutRecord)> =
        records.iter().map(|(chapter, record)| (chapter.record_key(), *record)).collect();
    write_records(container_path, &keyed)
}

/// Put a chapter's shipped colors back into a container file.
pub fn restore_record(container_path: &Path, chapter: Chapter) -> Result<(), BridgeError> {
    patch_chapters(container_path, &[(chapter, chapter.stock_record())])
}

fn write_records(
    container_path: &Path,
    records: &[((u32, u32), ClutRecord)],
) -> Result<(), BridgeError> {
    let mut container = fs::read(container_path)?;
    for ((key, key2), record) in records {
        patch_record_bytes(&mut container, *key, *key2, record)?;
    }
    fs::write(container_path, &container)?;
    for ((key, key2), _) in records {
        log::info!(
            "patched {} Key={} Key2={} at {:#X}",
            container_path.display(),
            key,
            key2,
            record_byte_offset(*key, *key2)?
        );
    }
    Ok(())
}

/// SQL statement applying a record to the relational mirror.
pub fn update_statement(key: u32, key2: u32, record: &ClutRecord) -> String {
    format!(
        "UPDATE {} SET {} = '{}' WHERE Key = {} AND Key2 = {}",
        CLUT_TABLE,
        CLUT_COLUMN,
        record.to_json(),
        key,
        key2
    )
}

/// Converter arguments turning an NXD directory into a SQLite mirror.
pub fn nxd_to_sqlite_args(input: &Path, output: &Path) -> Vec<String> {
    converter_args("nxd-to-sqlite", input, output)
}

/// Converter arguments turning a SQLite mirror back into NXD files.
pub fn sqlite_to_nxd_args(input: &Path, output: &Path) -> Vec<String> {
    converter_args("sqlite-to-nxd", input, output)
}

fn converter_args(verb: &str, input: &Path, output: &Path) -> Vec<String> {
    vec![
        verb.to_string(),
        "-i".to_string(),
        input.display().to_string(),
        "-o".to_string(),
        output.display().to_string(),
        "-g".to_string(),
        CONVERTER_GAME.to_string(),
    ]
}
