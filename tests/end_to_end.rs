//! End-to-end tests over synthetic sprite templates
//!
//! Each test builds a template in memory (palette block plus a 40-row
//! sheet), runs it through the public API and checks observable results.

use std::collections::BTreeMap;
use std::fs;

use image::{Rgb, Rgba};
use sprtheme::bridge::{
    chapter_to_key, from_clut_record, patch_record, read_record, record_byte_offset,
    to_clut_record, update_statement, ClutRecord,
};
use sprtheme::color::{packed_to_rgb, rgb_to_packed, Hsl};
use sprtheme::palette::{read_palette, PALETTE_BLOCK_BYTES, PALETTE_SLOT_BYTES};
use sprtheme::section::SectionMapping;
use sprtheme::shades::{FixedMultiplier, Role};
use sprtheme::sprite::{
    clamp_orientation, decode_all_directions, decode_directions, Direction, SHEET_WIDTH,
    SPRITE_HEIGHT, SPRITE_WIDTH,
};
use sprtheme::store::{PaletteStore, ShadeStrategy};
use tempfile::TempDir;

/// Palette slot 0 holds a red ramp; cell `c` paints pixel (x, y) with
/// index `1 + (x + y + c) % 15`, so no two cells look alike and no row is
/// symmetric.
fn make_template() -> Vec<u8> {
    let mut data = vec![0u8; PALETTE_BLOCK_BYTES + (SHEET_WIDTH * SPRITE_HEIGHT / 2) as usize];
    for i in 0..16u16 {
        let word = i * 2; // red channel only
        data[i as usize * 2..i as usize * 2 + 2].copy_from_slice(&word.to_le_bytes());
    }
    for cell in 0..5u32 {
        for y in 0..SPRITE_HEIGHT {
            for x in 0..SPRITE_WIDTH {
                let index = 1 + ((x + y + cell) % 15) as u8;
                let pixel = (y * SHEET_WIDTH + cell * SPRITE_WIDTH + x) as usize;
                let byte = &mut data[PALETTE_BLOCK_BYTES + pixel / 2];
                if pixel % 2 == 0 {
                    *byte = (*byte & 0xF0) | index;
                } else {
                    *byte = (*byte & 0x0F) | (index << 4);
                }
            }
        }
    }
    data
}

const KNIGHT_SECTIONS: &str = r#"{
    "job": "Knight",
    "sprite": "battle_knight_m_spr.bin",
    "sections": [
        { "name": "armor", "displayName": "Armor", "indices": [3, 4, 5, 6],
          "roles": ["base", "shadow", "highlight", "accent"] },
        { "name": "trim", "displayName": "Trim", "indices": [7, 8],
          "roles": ["base", "accent_shadow"], "linkedTo": "armor" },
        { "name": "boots", "displayName": "Boots", "indices": [9, 10],
          "roles": ["shadow", "base"] }
    ]
}"#;

fn quantized(color: Rgb<u8>) -> Rgb<u8> {
    packed_to_rgb(rgb_to_packed(color))
}

// ============================================================================
// Decoding
// ============================================================================

#[test]
fn test_east_mirrors_west_pixel_for_pixel() {
    let data = make_template();
    let set = decode_directions(&data, 0).unwrap();
    let west = set.get(Direction::West);
    let east = set.get(Direction::East);
    for y in 0..SPRITE_HEIGHT {
        for x in 0..SPRITE_WIDTH {
            assert_eq!(east.get_pixel(x, y), west.get_pixel(SPRITE_WIDTH - 1 - x, y));
        }
    }
    // The same holds after the 2x preview upscale
    let scaled = decode_all_directions(&data, 0).unwrap();
    let (w, h) = scaled.get(Direction::NorthEast).dimensions();
    assert_eq!((w, h), (SPRITE_WIDTH * 2, SPRITE_HEIGHT * 2));
    for y in 0..h {
        for x in 0..w {
            assert_eq!(
                scaled.get(Direction::NorthEast).get_pixel(x, y),
                scaled.get(Direction::NorthWest).get_pixel(w - 1 - x, y)
            );
        }
    }
}

#[test]
fn test_stored_cells_feed_their_directions() {
    let data = make_template();
    let set = decode_directions(&data, 0).unwrap();
    let palette = read_palette(&data, 0).unwrap();
    // Pixel (0, 0) of cell c has index 1 + c
    let expected = [
        (Direction::West, 1),
        (Direction::SouthWest, 2),
        (Direction::South, 3),
        (Direction::NorthWest, 4),
        (Direction::North, 5),
    ];
    for (direction, index) in expected {
        assert_eq!(*set.get(direction).get_pixel(0, 0), palette.get(index), "{:?}", direction);
    }
}

#[test]
fn test_blank_slot_renders_like_slot_zero() {
    let data = make_template();
    let slot0 = decode_all_directions(&data, 0).unwrap();
    let slot9 = decode_all_directions(&data, 9).unwrap();
    assert_eq!(slot0.images(), slot9.images());
    assert!(decode_all_directions(&data, 16).is_err());
}

#[test]
fn test_orientation_clamp() {
    let data = make_template();
    let set = decode_all_directions(&data, 0).unwrap();
    assert_eq!(clamp_orientation(-3), 0);
    assert_eq!(clamp_orientation(42), 7);
    assert_eq!(set.get_clamped(99), set.get(Direction::NorthWest));
    assert_eq!(set.get_clamped(-1), set.get(Direction::North));
}

#[test]
fn test_transparent_index_zero() {
    let mut data = make_template();
    // Blank out the first row of cell 0 to index 0
    for b in &mut data[PALETTE_BLOCK_BYTES..PALETTE_BLOCK_BYTES + (SPRITE_WIDTH / 2) as usize] {
        *b = 0;
    }
    let set = decode_directions(&data, 0).unwrap();
    assert_eq!(*set.get(Direction::West).get_pixel(5, 0), Rgba([0, 0, 0, 0]));
    assert_eq!(*set.get(Direction::East).get_pixel(26, 0), Rgba([0, 0, 0, 0]));
}

// ============================================================================
// Palette editing
// ============================================================================

#[test]
fn test_fixed_theme_scenario() {
    let mapping = SectionMapping::from_json(KNIGHT_SECTIONS).unwrap();
    mapping.validate().unwrap();
    let mut store = PaletteStore::from_bytes(make_template()).unwrap();
    let base = Rgb([200, 100, 50]);

    let written = store.apply_section(&mapping, "armor", base, ShadeStrategy::Fixed).unwrap();
    // armor: base, shadow, highlight (accent skipped); trim: base (accent_shadow skipped)
    assert_eq!(written, 4);

    let fixed = FixedMultiplier;
    assert_eq!(store.get_color(3).unwrap(), quantized(base));
    assert_eq!(store.get_color(4).unwrap(), quantized(fixed.role_color(Role::Shadow, base)));
    assert_eq!(store.get_color(5).unwrap(), quantized(fixed.role_color(Role::Highlight, base)));
    assert_eq!(store.get_color(6).unwrap(), store.original_color(6).unwrap());
    assert_eq!(store.get_color(7).unwrap(), quantized(base));
    assert_eq!(store.get_color(8).unwrap(), store.original_color(8).unwrap());
    // Unrelated section untouched
    assert_eq!(store.get_color(9).unwrap(), store.original_color(9).unwrap());

    let shadow = Hsl::from_rgb(fixed.role_color(Role::Shadow, base));
    let base_hsl = Hsl::from_rgb(base);
    assert!((shadow.h - base_hsl.h).abs() < 2.0);
    assert!((shadow.l - base_hsl.l * 0.65).abs() < 0.01);
}

#[test]
fn test_relative_theme_keeps_primary() {
    let mapping = SectionMapping::from_json(KNIGHT_SECTIONS).unwrap();
    let mut store = PaletteStore::from_bytes(make_template()).unwrap();
    let base = Rgb([40, 160, 220]);

    store.apply_section(&mapping, "boots", base, ShadeStrategy::Relative).unwrap();
    // First base-role index is the anchor
    assert_eq!(store.get_color(10).unwrap(), quantized(base));
    assert_ne!(store.get_color(9).unwrap(), store.original_color(9).unwrap());

    // Applying twice gives the same result: relationships come from the original
    let first = store.data().to_vec();
    store.apply_section(&mapping, "boots", base, ShadeStrategy::Relative).unwrap();
    assert_eq!(store.data(), &first[..]);
}

#[test]
fn test_save_touches_only_palette_slot_zero() {
    let temp = TempDir::new().unwrap();
    let template_path = temp.path().join("battle_knight_m_spr.bin");
    let template = make_template();
    fs::write(&template_path, &template).unwrap();

    let mapping = SectionMapping::from_json(KNIGHT_SECTIONS).unwrap();
    let mut store = PaletteStore::load(&template_path).unwrap();
    store.apply_section(&mapping, "armor", Rgb([10, 200, 30]), ShadeStrategy::Fixed).unwrap();
    assert!(store.is_modified());

    let out = temp.path().join("themes/knight_green.bin");
    store.save(&out).unwrap();
    let saved = fs::read(&out).unwrap();
    assert_eq!(saved.len(), template.len());
    assert_ne!(saved[..PALETTE_SLOT_BYTES], template[..PALETTE_SLOT_BYTES]);
    assert_eq!(saved[PALETTE_SLOT_BYTES..], template[PALETTE_SLOT_BYTES..]);

    store.reset();
    assert!(!store.is_modified());
    assert_eq!(store.data(), &template[..]);
}

// ============================================================================
// Container bridge
// ============================================================================

#[test]
fn test_patch_chapter_one_record() {
    let temp = TempDir::new().unwrap();
    let container_path = temp.path().join("charclut.nxd");
    fs::write(&container_path, vec![0xEEu8; 0x800]).unwrap();

    let (key, key2) = chapter_to_key("Chapter1").unwrap();
    assert_eq!((key, key2), (1, 0));
    assert_eq!(record_byte_offset(key, key2).unwrap(), 0x379);

    let red = ClutRecord::filled(Rgb([255, 0, 0]));
    patch_record(&container_path, key, key2, &red.to_json()).unwrap();

    let container = fs::read(&container_path).unwrap();
    let record = read_record(&container, key, key2).unwrap();
    assert!((0..16).all(|i| record.color(i) == Rgb([255, 0, 0])));
    // Bytes around the record are untouched
    assert_eq!(container[0x378], 0xEE);
    assert_eq!(container[0x379 + 48], 0xEE);
}

#[test]
fn test_sprite_palette_through_clut_and_back() {
    let template = make_template();
    let record = to_clut_record(&template).unwrap();
    assert_eq!(from_clut_record(&record)[..], template[..PALETTE_SLOT_BYTES]);

    let sql = update_statement(1, 0, &record);
    assert!(sql.starts_with("UPDATE CharCLUT SET CLUTData = '[0,0,0,16,0,0,"));
    assert!(sql.ends_with("WHERE Key = 1 AND Key2 = 0"));
}

#[test]
fn test_store_palette_feeds_clut() {
    let mut store = PaletteStore::from_bytes(make_template()).unwrap();
    store.set_color(2, Rgb([0, 0, 255])).unwrap();
    let record = to_clut_record(store.slot_bytes()).unwrap();
    assert_eq!(record.color(2), Rgb([0, 0, 255]));

    let colors: BTreeMap<usize, Rgb<u8>> = (0..16).map(|i| (i, record.color(i))).collect();
    assert_eq!(colors[&1], packed_to_rgb(2));
}
