//! Shade generation from a single base color
//!
//! Two strategies produce the colors for a section's roles:
//! - [`FixedMultiplier`] scales saturation and lightness by fixed factors
//!   per role, keeping the base hue.
//! - [`RelativePreserving`] captures how each original color related to the
//!   section's primary color and replays that relationship on a new base.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use image::Rgb;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Hsl;

/// Saturation/lightness below this counts as zero when taking ratios.
const RATIO_EPSILON: f64 = 0.001;

/// Error type for shade generation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShadeError {
    /// Relative shade requested for an index that was never captured
    #[error("palette index {0} was not among the captured original colors")]
    UnknownIndex(u8),
    /// Primary index missing from the original colors at construction
    #[error("primary index {0} not found in original colors")]
    MissingPrimary(u8),
}

/// Semantic tag of a palette index within a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Base,
    Shadow,
    Highlight,
    Accent,
    AccentShadow,
}

impl Role {
    pub const ALL: [Role; 5] =
        [Role::Base, Role::Shadow, Role::Highlight, Role::Accent, Role::AccentShadow];

    /// Decorative trim roles, which keep their template color when a
    /// section is recolored.
    pub fn is_accent(self) -> bool {
        matches!(self, Role::Accent | Role::AccentShadow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Base => "base",
            Role::Shadow => "shadow",
            Role::Highlight => "highlight",
            Role::Accent => "accent",
            Role::AccentShadow => "accent_shadow",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Common contract of the shade strategies.
///
/// Strategies may key on the role, the palette index, or both.
pub trait ShadeGenerator {
    fn shade(&self, index: u8, role: Role, base: Rgb<u8>) -> Result<Rgb<u8>, ShadeError>;
}

/// Fixed per-role HSL multipliers.
///
/// | Role | Saturation | Lightness |
/// |------|------------|-----------|
/// | shadow | x1.1, max 1.0 | x0.65 |
/// | highlight | x0.85 | x1.35, max 0.95 |
/// | accent | x0.7 | x1.5, max 0.90 |
/// | accent_shadow | x0.8 | x1.25, max 0.80 |
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMultiplier;

impl FixedMultiplier {
    /// Color for one role. `Role::Base` returns `base` untouched.
    pub fn role_color(&self, role: Role, base: Rgb<u8>) -> Rgb<u8> {
        let hsl = Hsl::from_rgb(base);
        let derived = match role {
            Role::Base => return base,
            Role::Shadow => Hsl::new(hsl.h, (hsl.s * 1.1).min(1.0), hsl.l * 0.65),
            Role::Highlight => Hsl::new(hsl.h, hsl.s * 0.85, (hsl.l * 1.35).min(0.95)),
            Role::Accent => Hsl::new(hsl.h, hsl.s * 0.7, (hsl.l * 1.5).min(0.90)),
            Role::AccentShadow => Hsl::new(hsl.h, hsl.s * 0.8, (hsl.l * 1.25).min(0.80)),
        };
        derived.to_rgb()
    }

    /// Colors for every role in `roles`.
    pub fn generate(&self, base: Rgb<u8>, roles: &[Role]) -> HashMap<Role, Rgb<u8>> {
        roles.iter().map(|&role| (role, self.role_color(role, base))).collect()
    }
}

impl ShadeGenerator for FixedMultiplier {
    fn shade(&self, _index: u8, role: Role, base: Rgb<u8>) -> Result<Rgb<u8>, ShadeError> {
        Ok(self.role_color(role, base))
    }
}

/// How one original color related to the primary color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorRelationship {
    pub hue_delta: f64,
    pub saturation_ratio: f64,
    pub lightness_ratio: f64,
}

/// Shade generator that replays captured HSL relationships.
///
/// Built once per editing session from the template's original colors;
/// the captured relationships never change afterwards.
#[derive(Debug, Clone)]
pub struct RelativePreserving {
    primary_index: u8,
    relationships: BTreeMap<u8, ColorRelationship>,
}

impl RelativePreserving {
    /// Capture relationships of every entry in `original` to `primary_index`.
    ///
    /// # Errors
    ///
    /// Returns `ShadeError::MissingPrimary` if the primary index is absent.
    pub fn new(original: &BTreeMap<u8, Rgb<u8>>, primary_index: u8) -> Result<Self, ShadeError> {
        let primary = original
            .get(&primary_index)
            .map(|c| Hsl::from_rgb(*c))
            .ok_or(ShadeError::MissingPrimary(primary_index))?;

        let relationships = original
            .iter()
            .map(|(&index, &color)| {
                let hsl = Hsl::from_rgb(color);
                let relationship = ColorRelationship {
                    hue_delta: hsl.h - primary.h,
                    saturation_ratio: ratio(hsl.s, primary.s),
                    lightness_ratio: ratio(hsl.l, primary.l),
                };
                (index, relationship)
            })
            .collect();

        Ok(Self { primary_index, relationships })
    }

    pub fn primary_index(&self) -> u8 {
        self.primary_index
    }

    pub fn relationship(&self, index: u8) -> Option<&ColorRelationship> {
        self.relationships.get(&index)
    }

    /// Color for `index` given a new primary color.
    ///
    /// The primary index gets `new_base` verbatim.
    pub fn generate_shade(&self, index: u8, new_base: Rgb<u8>) -> Result<Rgb<u8>, ShadeError> {
        if index == self.primary_index {
            return Ok(new_base);
        }
        let rel = self.relationships.get(&index).ok_or(ShadeError::UnknownIndex(index))?;

        let base = Hsl::from_rgb(new_base);
        let h = (base.h + rel.hue_delta).rem_euclid(360.0);
        let s = (base.s * rel.saturation_ratio).clamp(0.0, 1.0);
        let l = (base.l * rel.lightness_ratio).clamp(0.0, 1.0);

        Ok(Hsl::new(h, s, l).to_rgb())
    }
}

impl ShadeGenerator for RelativePreserving {
    fn shade(&self, index: u8, _role: Role, base: Rgb<u8>) -> Result<Rgb<u8>, ShadeError> {
        self.generate_shade(index, base)
    }
}

fn ratio(value: f64, primary: f64) -> f64 {
    if primary > RATIO_EPSILON {
        value / primary
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hue_distance(a: f64, b: f64) -> f64 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    fn close(a: Rgb<u8>, b: Rgb<u8>, tolerance: i16) -> bool {
        (0..3).all(|c| (a.0[c] as i16 - b.0[c] as i16).abs() <= tolerance)
    }

    #[test]
    fn test_fixed_base_is_identity() {
        for base in [Rgb([200, 100, 50]), Rgb([0, 0, 0]), Rgb([255, 255, 255]), Rgb([13, 77, 201])] {
            assert_eq!(FixedMultiplier.role_color(Role::Base, base), base);
        }
    }

    #[test]
    fn test_fixed_orders_lightness() {
        let base = Rgb([200, 100, 50]);
        let shades = FixedMultiplier.generate(base, &[Role::Base, Role::Shadow, Role::Highlight]);
        assert_eq!(shades.len(), 3);

        let base_hsl = Hsl::from_rgb(shades[&Role::Base]);
        let shadow = Hsl::from_rgb(shades[&Role::Shadow]);
        let highlight = Hsl::from_rgb(shades[&Role::Highlight]);

        assert!(shadow.l < base_hsl.l);
        assert!(base_hsl.l < highlight.l);
        assert!(hue_distance(shadow.h, base_hsl.h) < 2.0);
        assert!(hue_distance(highlight.h, base_hsl.h) < 2.0);
    }

    #[test]
    fn test_fixed_keeps_hue_across_roles() {
        for hue in (0..360).step_by(30) {
            let base = Hsl::new(hue as f64, 0.7, 0.45).to_rgb();
            let base_h = Hsl::from_rgb(base).h;
            for role in [Role::Shadow, Role::Highlight, Role::Accent, Role::AccentShadow] {
                let h = Hsl::from_rgb(FixedMultiplier.role_color(role, base)).h;
                assert!(hue_distance(h, base_h) < 3.0, "hue {} role {}", hue, role);
            }
        }
    }

    #[test]
    fn test_fixed_clamps_lightness() {
        let near_white = Rgb([250, 240, 240]);
        let highlight = Hsl::from_rgb(FixedMultiplier.role_color(Role::Highlight, near_white));
        assert!(highlight.l <= 0.95 + 0.005);
        let accent = Hsl::from_rgb(FixedMultiplier.role_color(Role::Accent, near_white));
        assert!(accent.l <= 0.90 + 0.005);
        let accent_shadow =
            Hsl::from_rgb(FixedMultiplier.role_color(Role::AccentShadow, near_white));
        assert!(accent_shadow.l <= 0.80 + 0.005);
    }

    fn originals() -> BTreeMap<u8, Rgb<u8>> {
        BTreeMap::from([
            (3, Rgb([40, 56, 72])),
            (4, Rgb([48, 72, 104])),
            (5, Rgb([56, 96, 128])),
            (6, Rgb([80, 128, 184])),
        ])
    }

    #[test]
    fn test_relative_primary_passthrough() {
        let gen = RelativePreserving::new(&originals(), 4).unwrap();
        for color in [Rgb([1, 2, 3]), Rgb([255, 0, 0]), Rgb([128, 128, 128])] {
            assert_eq!(gen.generate_shade(4, color).unwrap(), color);
        }
    }

    #[test]
    fn test_relative_reproduces_originals() {
        let colors = originals();
        let gen = RelativePreserving::new(&colors, 4).unwrap();
        for (&index, &color) in &colors {
            let regenerated = gen.generate_shade(index, colors[&4]).unwrap();
            for c in 0..3 {
                let diff = (regenerated.0[c] as i16 - color.0[c] as i16).abs();
                assert!(diff <= 1, "index {}: {:?} vs {:?}", index, regenerated, color);
            }
        }
    }

    #[test]
    fn test_relative_keeps_ordering_on_new_base() {
        let gen = RelativePreserving::new(&originals(), 4).unwrap();
        let base = Rgb([180, 40, 40]);
        let darker = Hsl::from_rgb(gen.generate_shade(3, base).unwrap());
        let lighter = Hsl::from_rgb(gen.generate_shade(6, base).unwrap());
        let b = Hsl::from_rgb(base);
        assert!(darker.l < b.l);
        assert!(lighter.l > b.l);
    }

    #[test]
    fn test_relative_unknown_index() {
        let gen = RelativePreserving::new(&originals(), 4).unwrap();
        assert_eq!(gen.generate_shade(9, Rgb([0, 0, 0])), Err(ShadeError::UnknownIndex(9)));
    }

    #[test]
    fn test_relative_missing_primary() {
        assert_eq!(
            RelativePreserving::new(&originals(), 12).unwrap_err(),
            ShadeError::MissingPrimary(12)
        );
    }

    #[test]
    fn test_relative_gray_primary_uses_unit_saturation_ratio() {
        let colors = BTreeMap::from([(1, Rgb([128, 128, 128])), (2, Rgb([200, 50, 50]))]);
        let gen = RelativePreserving::new(&colors, 1).unwrap();
        assert_eq!(gen.relationship(2).unwrap().saturation_ratio, 1.0);
    }

    #[test]
    fn test_relative_black_primary_keeps_new_base_lightness() {
        let colors = BTreeMap::from([(1, Rgb([0, 0, 0])), (2, Rgb([10, 200, 10]))]);
        let gen = RelativePreserving::new(&colors, 1).unwrap();
        let rel = gen.relationship(2).unwrap();
        assert_eq!(rel.lightness_ratio, 1.0);
        assert_eq!(rel.saturation_ratio, 1.0);

        let base = Rgb([200, 10, 10]);
        let shade = gen.generate_shade(2, base).unwrap();
        assert!(close(shade, Rgb([10, 200, 10]), 1), "got {:?}", shade);
        let (shade_l, base_l) = (Hsl::from_rgb(shade).l, Hsl::from_rgb(base).l);
        assert!((shade_l - base_l).abs() < 0.01);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("accent_shadow".parse::<Role>(), Ok(Role::AccentShadow));
        assert!("glow".parse::<Role>().is_err());
        assert!(Role::Accent.is_accent());
        assert!(!Role::Highlight.is_accent());
        let json = serde_json::to_string(&Role::AccentShadow).unwrap();
        assert_eq!(json, "\"accent_shadow\"");
    }

    #[test]
    fn test_trait_dispatch() {
        let gen: Box<dyn ShadeGenerator> = Box::new(FixedMultiplier);
        assert_eq!(gen.shade(7, Role::Base, Rgb([9, 9, 9])).unwrap(), Rgb([9, 9, 9]));
    }
}
