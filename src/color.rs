//! Color conversions for sprite palettes
//!
//! Three representations are in play:
//! - Packed-555: the 16-bit palette word stored in sprite files
//!   (bits 0-4 red, 5-9 green, 10-14 blue, bit 15 unused)
//! - 8-bit RGB as [`image::Rgb<u8>`]
//! - HSL as [`Hsl`], used by the shade generators
//!
//! Hex strings (`#RRGGBB`, `#RGB`) are also parsed here for theme recipes.

use image::Rgb;
use thiserror::Error;

/// Mask of one 5-bit channel field.
const FIELD_MASK: u16 = 0x1F;

/// Error type for color parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    /// Input string was empty
    #[error("empty color string")]
    Empty,
    /// Input string doesn't start with '#'
    #[error("color must start with '#'")]
    MissingHash,
    /// Invalid length (must be 3 or 6 hex chars after #)
    #[error("invalid color length {0}, expected 3 or 6")]
    InvalidLength(usize),
    /// Contains non-hex characters
    #[error("invalid hex character '{0}'")]
    InvalidHex(char),
}

/// Scale a 5-bit channel up to 8 bits, truncating.
fn expand_field(v5: u16) -> u8 {
    ((v5 as u32 * 255) / 31) as u8
}

/// Scale an 8-bit channel down to 5 bits, rounding to nearest.
fn compress_channel(v8: u8) -> u16 {
    ((v8 as u32 * 31 + 127) / 255) as u16
}

/// Decode a packed-555 palette word into 8-bit RGB.
///
/// The top bit is ignored.
///
/// # Examples
///
/// ```
/// use sprtheme::color::packed_to_rgb;
///
/// assert_eq!(packed_to_rgb(0x001F), image::Rgb([255, 0, 0]));
/// assert_eq!(packed_to_rgb(0x7C00), image::Rgb([0, 0, 255]));
/// ```
pub fn packed_to_rgb(value: u16) -> Rgb<u8> {
    let r = value & FIELD_MASK;
    let g = (value >> 5) & FIELD_MASK;
    let b = (value >> 10) & FIELD_MASK;
    Rgb([expand_field(r), expand_field(g), expand_field(b)])
}

/// Encode 8-bit RGB as a packed-555 palette word.
///
/// Lossy for arbitrary input (32 levels per channel), but exact for every
/// color produced by [`packed_to_rgb`].
pub fn rgb_to_packed(color: Rgb<u8>) -> u16 {
    let [r, g, b] = color.0;
    compress_channel(r) | (compress_channel(g) << 5) | (compress_channel(b) << 10)
}

/// Read a little-endian packed-555 word from two bytes.
pub fn read_packed(low: u8, high: u8) -> u16 {
    u16::from_le_bytes([low, high])
}

/// A color in hue/saturation/lightness space.
///
/// `h` is in degrees [0, 360), `s` and `l` are in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    pub fn new(h: f64, s: f64, l: f64) -> Self {
        Self { h, s, l }
    }

    /// Convert 8-bit RGB to HSL.
    pub fn from_rgb(color: Rgb<u8>) -> Self {
        let r = color.0[0] as f64 / 255.0;
        let g = color.0[1] as f64 / 255.0;
        let b = color.0[2] as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;
        let l = (max + min) / 2.0;

        if delta <= 0.0 {
            // Achromatic
            return Self::new(0.0, 0.0, l);
        }

        let s = if l < 0.5 { delta / (max + min) } else { delta / (2.0 - max - min) };

        let h = if max == r {
            (g - b) / delta + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };

        Self::new((h * 60.0) % 360.0, s, l)
    }

    /// Convert back to 8-bit RGB, rounding each channel.
    pub fn to_rgb(self) -> Rgb<u8> {
        let l = self.l.clamp(0.0, 1.0);
        let s = self.s.clamp(0.0, 1.0);

        if s == 0.0 || l == 0.0 {
            let gray = to_channel(l);
            return Rgb([gray, gray, gray]);
        }

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let h = self.h.rem_euclid(360.0) / 360.0;

        let r = hue_to_channel(p, q, h + 1.0 / 3.0);
        let g = hue_to_channel(p, q, h);
        let b = hue_to_channel(p, q, h - 1.0 / 3.0);

        Rgb([to_channel(r), to_channel(g), to_channel(b)])
    }
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = if t < 0.0 {
        t + 1.0
    } else if t > 1.0 {
        t - 1.0
    } else {
        t
    };

    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

fn to_channel(v: f64) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Convert 8-bit RGB to HSL.
pub fn rgb_to_hsl(color: Rgb<u8>) -> Hsl {
    Hsl::from_rgb(color)
}

/// Convert HSL to 8-bit RGB.
pub fn hsl_to_rgb(hsl: Hsl) -> Rgb<u8> {
    hsl.to_rgb()
}

/// Parse a hex color string (`#RGB` or `#RRGGBB`).
///
/// # Examples
///
/// ```
/// use sprtheme::color::parse_hex_color;
///
/// assert_eq!(parse_hex_color("#F00").unwrap(), image::Rgb([255, 0, 0]));
/// assert_eq!(parse_hex_color("#2050C0").unwrap(), image::Rgb([0x20, 0x50, 0xC0]));
/// ```
///
/// # Errors
///
/// Returns `ColorError` if the input is empty, lacks the leading `#`,
/// has the wrong length, or contains non-hex characters.
pub fn parse_hex_color(s: &str) -> Result<Rgb<u8>, ColorError> {
    if s.is_empty() {
        return Err(ColorError::Empty);
    }
    let hex = s.strip_prefix('#').ok_or(ColorError::MissingHash)?;

    let digits = hex.chars().map(parse_hex_digit).collect::<Result<Vec<u8>, _>>()?;

    match digits.len() {
        // #RGB -> #RRGGBB (doubled digits)
        3 => Ok(Rgb([digits[0] * 17, digits[1] * 17, digits[2] * 17])),
        6 => Ok(Rgb([
            digits[0] * 16 + digits[1],
            digits[2] * 16 + digits[3],
            digits[4] * 16 + digits[5],
        ])),
        len => Err(ColorError::InvalidLength(len)),
    }
}

/// Format a color as `#RRGGBB`.
pub fn to_hex(color: Rgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color.0[0], color.0[1], color.0[2])
}

/// Parse a single hex digit (0-9, A-F, a-f) to u8 (0-15)
fn parse_hex_digit(c: char) -> Result<u8, ColorError> {
    match c {
        '0'..='9' => Ok(c as u8 - b'0'),
        'a'..='f' => Ok(c as u8 - b'a' + 10),
        'A'..='F' => Ok(c as u8 - b'A' + 10),
        _ => Err(ColorError::InvalidHex(c)),
    }
}
