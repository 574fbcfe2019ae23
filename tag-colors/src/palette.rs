//! Palette generation: parametric adaptive palettes and user-supplied hex lists.

use std::ops::Index;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::color::{ColorParseError, Lch};

pub const DEFAULT_CUSTOM_PALETTE: &str = "e12729-f37324-f8cc1b-72b043-007f4e";

const ADAPTIVE_PALETTE_SIZE: usize = 8;
const ADAPTIVE_HUE_OFFSET: f64 = 35.0;
const SOFT_PRESET: (f64, f64) = (16.0, 87.0);
const BRIGHT_PRESET: (f64, f64) = (85.0, 75.0);
const DARK_CHROMA_FACTOR: f64 = 1.8;
const DARK_LIGHTNESS_DIVISOR: f64 = 2.5;
const MAX_COMPONENT: f64 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaletteKind {
    #[default]
    AdaptiveSoft,
    AdaptiveBright,
    Custom,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub selected: PaletteKind,
    /// Dash-separated six digit hex colors, e.g. `ff0000-00ff00`.
    pub custom: String,
    /// Rotation applied to the finished palette.
    pub seed: usize,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            selected: PaletteKind::default(),
            custom: DEFAULT_CUSTOM_PALETTE.to_string(),
            seed: 0,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("custom palette is empty")]
    Empty,
    #[error("invalid custom palette entry `{0}`")]
    InvalidEntry(String),
    #[error(transparent)]
    Color(#[from] ColorParseError),
}

/// An ordered, immutable list of colors tags are picked from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(Vec<Lch>);

impl Palette {
    pub fn new(colors: Vec<Lch>) -> Self {
        Self(colors)
    }

    /// Parse any mix of supported color notations.
    pub fn parse<I, S>(colors: I) -> Result<Self, ColorParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        colors
            .into_iter()
            .map(|color| color.as_ref().parse::<Lch>().map(Lch::canonical))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Lch> {
        self.0.get(index).copied()
    }

    pub fn colors(&self) -> &[Lch] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Lch> + '_ {
        self.0.iter().copied()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(Lch::to_string).collect()
    }

    /// Move the last `seed` colors to the front. A seed of zero, or one that
    /// covers the whole palette, leaves the order untouched.
    pub fn rotated(&self, seed: usize) -> Self {
        let mut colors = self.0.clone();
        if seed > 0 && seed < colors.len() {
            colors.rotate_right(seed);
        }
        Self(colors)
    }
}

impl FromIterator<Lch> for Palette {
    fn from_iter<T: IntoIterator<Item = Lch>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Index<usize> for Palette {
    type Output = Lch;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// The light and dark theme palettes of one configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Palettes {
    pub light: Palette,
    pub dark: Palette,
}

/// Whether any entry of either theme differs between `previous` and `next`.
pub fn palettes_changed(previous: &Palettes, next: &Palettes) -> bool {
    previous != next
}

/// Recipe for [`generate_adaptive_palette`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdaptivePalette {
    pub is_dark_theme: bool,
    pub palette_size: usize,
    pub base_chroma: f64,
    pub base_lightness: f64,
    pub hue_offset: f64,
    pub seed: usize,
    pub shuffle: bool,
}

impl AdaptivePalette {
    fn preset(kind: PaletteKind, is_dark_theme: bool, seed: usize) -> Self {
        let (base_chroma, base_lightness) = match kind {
            PaletteKind::AdaptiveBright => BRIGHT_PRESET,
            PaletteKind::AdaptiveSoft | PaletteKind::Custom => SOFT_PRESET,
        };

        Self {
            is_dark_theme,
            palette_size: ADAPTIVE_PALETTE_SIZE,
            base_chroma,
            base_lightness,
            hue_offset: ADAPTIVE_HUE_OFFSET,
            seed,
            shuffle: true,
        }
    }
}

/// Evenly spaced hues at a fixed chroma and lightness.
///
/// Dark themes get more chroma and far less lightness so the same hue still
/// reads as saturated against a dark background.
pub fn generate_adaptive_palette(recipe: &AdaptivePalette) -> Palette {
    let (chroma, lightness) = if recipe.is_dark_theme {
        (
            (recipe.base_chroma * DARK_CHROMA_FACTOR)
                .round()
                .min(MAX_COMPONENT),
            (recipe.base_lightness / DARK_LIGHTNESS_DIVISOR)
                .round()
                .min(MAX_COMPONENT),
        )
    } else {
        (recipe.base_chroma, recipe.base_lightness)
    };

    let hue_step = 360.0 / recipe.palette_size as f64;
    let colors: Vec<Lch> = (0..recipe.palette_size)
        .map(|step| {
            let hue = (step as f64 * hue_step + recipe.hue_offset).rem_euclid(360.0);
            Lch::new(lightness, chroma, hue).canonical()
        })
        .collect();

    let colors = if recipe.shuffle {
        spread_hues(colors)
    } else {
        colors
    };

    debug!(
        size = recipe.palette_size,
        dark = recipe.is_dark_theme,
        shuffled = recipe.shuffle,
        seed = recipe.seed,
        "generated adaptive palette"
    );

    Palette(colors).rotated(recipe.seed)
}

/// Deterministic traversal that keeps neighbouring entries far apart on the
/// hue circle: take the current entry, then jump a third of what remains.
fn spread_hues<T>(mut available: Vec<T>) -> Vec<T> {
    let mut result = Vec::with_capacity(available.len());
    let mut next = 0;

    while !available.is_empty() {
        result.push(available.remove(next));
        if available.is_empty() {
            break;
        }
        let remaining = available.len();
        next = (next as f64 + remaining as f64 / 3.0).round() as usize % remaining;
    }

    result
}

/// Convert a user-picked list of hex colors, keeping the user's order.
pub fn parse_custom_palette<S: AsRef<str>>(
    hex_list: &[S],
    seed: usize,
) -> Result<Palette, ColorParseError> {
    Ok(Palette::parse(hex_list)?.rotated(seed))
}

/// Split and validate a `rrggbb-rrggbb-...` palette string.
pub fn validate_custom_palette(custom: &str) -> Result<Vec<String>, PaletteError> {
    if custom.is_empty() {
        return Err(PaletteError::Empty);
    }

    custom
        .split('-')
        .map(|entry| {
            if entry.len() == 6 && entry.chars().all(|ch| ch.is_ascii_hexdigit()) {
                Ok(format!("#{entry}"))
            } else {
                Err(PaletteError::InvalidEntry(entry.to_string()))
            }
        })
        .collect()
}

fn custom_palettes(config: &PaletteConfig) -> Result<Palettes, PaletteError> {
    let hex_list = validate_custom_palette(&config.custom)?;
    // Custom colors are picked to work as-is, so both themes share them.
    let light = parse_custom_palette(&hex_list, config.seed)?;
    let dark = light.clone();
    Ok(Palettes { light, dark })
}

/// Build the light and dark palettes a configuration describes.
pub fn generate_palettes(config: &PaletteConfig) -> Palettes {
    if config.selected == PaletteKind::Custom {
        match custom_palettes(config) {
            Ok(palettes) => return palettes,
            Err(err) => warn!(?err, "custom palette unusable, falling back to adaptive"),
        }
    }

    Palettes {
        light: generate_adaptive_palette(&AdaptivePalette::preset(
            config.selected,
            false,
            config.seed,
        )),
        dark: generate_adaptive_palette(&AdaptivePalette::preset(
            config.selected,
            true,
            config.seed,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adaptive(kind: PaletteKind, seed: usize) -> Palettes {
        generate_palettes(&PaletteConfig {
            selected: kind,
            seed,
            ..PaletteConfig::default()
        })
    }

    fn custom(colors: &str, seed: usize) -> Palettes {
        generate_palettes(&PaletteConfig {
            selected: PaletteKind::Custom,
            custom: colors.to_string(),
            seed,
        })
    }

    #[test]
    fn spread_hues_follows_fixed_traversal() {
        let order = spread_hues((0..8).collect());
        assert_eq!(order, vec![0, 3, 6, 2, 5, 1, 7, 4]);

        assert_eq!(spread_hues(vec![0, 1, 2]), vec![0, 2, 1]);
        assert_eq!(spread_hues(vec![0, 1, 2, 3, 4]), vec![0, 2, 4, 3, 1]);
        assert!(spread_hues(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn soft_palette_matches_pinned_output() {
        let palettes = adaptive(PaletteKind::AdaptiveSoft, 0);
        assert_eq!(
            palettes.light.to_strings(),
            vec![
                "lch(87% 16 35)",
                "lch(87% 16 170)",
                "lch(87% 16 305)",
                "lch(87% 16 125)",
                "lch(87% 16 260)",
                "lch(87% 16 80)",
                "lch(87% 16 350)",
                "lch(87% 16 215)",
            ]
        );
        assert_eq!(
            palettes.dark.to_strings(),
            vec![
                "lch(35% 29 35)",
                "lch(35% 29 170)",
                "lch(35% 29 305)",
                "lch(35% 29 125)",
                "lch(35% 29 260)",
                "lch(35% 29 80)",
                "lch(35% 29 350)",
                "lch(35% 29 215)",
            ]
        );
    }

    #[test]
    fn bright_dark_palette_clamps_chroma() {
        let palettes = adaptive(PaletteKind::AdaptiveBright, 0);
        assert_eq!(palettes.light[0], Lch::new(75.0, 85.0, 35.0));
        assert_eq!(palettes.dark[0], Lch::new(30.0, 100.0, 35.0));
        assert_ne!(palettes.light, adaptive(PaletteKind::AdaptiveSoft, 0).light);
    }

    #[test]
    fn unshuffled_palette_keeps_hue_order() {
        let palette = generate_adaptive_palette(&AdaptivePalette {
            is_dark_theme: false,
            palette_size: 4,
            base_chroma: 40.0,
            base_lightness: 60.0,
            hue_offset: 300.0,
            seed: 0,
            shuffle: false,
        });
        let hues: Vec<f64> = palette.iter().map(|color| color.hue).collect();
        assert_eq!(hues, vec![300.0, 30.0, 120.0, 210.0]);
    }

    #[test]
    fn seed_rotates_adaptive_palette_right() {
        let base = adaptive(PaletteKind::AdaptiveSoft, 0);
        let shifted = adaptive(PaletteKind::AdaptiveSoft, 3);
        assert_eq!(shifted.light[0], base.light[5]);
        assert_eq!(shifted.light[3], base.light[0]);
        assert_eq!(shifted.dark, base.dark.rotated(3));
    }

    #[test]
    fn seed_covering_whole_palette_is_noop() {
        let base = adaptive(PaletteKind::AdaptiveSoft, 0);
        assert_eq!(adaptive(PaletteKind::AdaptiveSoft, 8), base);
        assert_eq!(adaptive(PaletteKind::AdaptiveSoft, 20), base);
    }

    #[test]
    fn custom_palette_is_parsed_and_rotated() {
        let base = custom("ff0000-00ff00-0000ff", 0);
        assert_eq!(base.light.len(), 3);
        assert_eq!(base.light, base.dark);
        for color in base.light.to_strings() {
            assert!(color.starts_with("lch("), "{color}");
            assert!(color.parse::<Lch>().is_ok());
        }

        let rotated = custom("ff0000-00ff00-0000ff", 1);
        assert_eq!(rotated.light[0], base.light[2]);
        assert_eq!(rotated.light[1], base.light[0]);
    }

    #[test]
    fn invalid_custom_palette_falls_back_to_soft() {
        let soft = adaptive(PaletteKind::AdaptiveSoft, 0);
        assert_eq!(custom("", 0), soft);
        assert_eq!(custom("ff0000-nothex", 0), soft);
    }

    #[test]
    fn validate_custom_palette_enforces_pattern() {
        assert_eq!(
            validate_custom_palette("A1b2C3-000000"),
            Ok(vec!["#A1b2C3".to_string(), "#000000".to_string()])
        );
        assert_eq!(validate_custom_palette(""), Err(PaletteError::Empty));
        assert_eq!(
            validate_custom_palette("ff0000-"),
            Err(PaletteError::InvalidEntry(String::new()))
        );
        assert_eq!(
            validate_custom_palette("ff00"),
            Err(PaletteError::InvalidEntry("ff00".to_string()))
        );
    }

    #[test]
    fn palette_serializes_as_color_strings() {
        let palette = Palette::parse(["lch(50% 10 20)"]).expect("parse palette");
        let json = serde_json::to_string(&palette).expect("serialize palette");
        assert_eq!(json, r#"["lch(50% 10 20)"]"#);
    }

    #[test]
    fn palette_kind_uses_kebab_case() {
        let json = serde_json::to_string(&PaletteKind::AdaptiveBright).expect("serialize kind");
        assert_eq!(json, r#""adaptive-bright""#);
    }

    #[test]
    fn palette_changes_are_detected_per_theme() {
        let soft = adaptive(PaletteKind::AdaptiveSoft, 0);
        assert!(!palettes_changed(&soft, &adaptive(PaletteKind::AdaptiveSoft, 0)));
        assert!(palettes_changed(&soft, &adaptive(PaletteKind::AdaptiveSoft, 1)));
        assert!(palettes_changed(&soft, &adaptive(PaletteKind::AdaptiveBright, 0)));

        let mut dark_only = soft.clone();
        dark_only.dark = dark_only.dark.rotated(2);
        assert!(palettes_changed(&soft, &dark_only));
    }
}
