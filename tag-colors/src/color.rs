//! CIE LCH color values and the math the engine runs on them.
//!
//! Every color that crosses a module boundary is an [`Lch`] value. Blending,
//! distance and contrast all work from here, so the rest of the crate never
//! touches sRGB or XYZ directly. Conversions go through `palette`; only the
//! APCA formula and the `lch()` text form live in this file.

use std::fmt;
use std::str::FromStr;

use palette::chromatic_adaptation::AdaptFrom;
use palette::color_difference::{Ciede2000, Wcag21RelativeContrast};
use palette::convert::FromColorUnclamped;
use palette::white_point::{D50, D65};
use palette::{LinLuma, LinSrgb, Srgb};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

type CieLab = palette::Lab<D50, f64>;
type CieLch = palette::Lch<D50, f64>;
type XyzD50 = palette::Xyz<D50, f64>;
type XyzD65 = palette::Xyz<D65, f64>;

/// Significant digits kept when a color is serialized.
const PRECISION: i32 = 5;

/// Chroma below which a color has no meaningful hue.
const ACHROMATIC_CHROMA: f64 = 0.02;

// APCA constants.
const APCA_NORM_BG: f64 = 0.56;
const APCA_NORM_TXT: f64 = 0.57;
const APCA_REV_TXT: f64 = 0.62;
const APCA_REV_BG: f64 = 0.65;
const APCA_BLACK_THRESHOLD: f64 = 0.022;
const APCA_BLACK_CLAMP: f64 = 1.414;
const APCA_LOW_CLIP: f64 = 0.1;
const APCA_DELTA_Y_MIN: f64 = 0.0005;
const APCA_SCALE: f64 = 1.14;
const APCA_LOW_OFFSET: f64 = 0.027;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("invalid hex color: {0}")]
    InvalidHex(String),
    #[error("invalid lch() color: {0}")]
    InvalidLch(String),
    #[error("unsupported color notation: {0}")]
    Unsupported(String),
}

/// A color in the cylindrical CIE LCH space (D50 white point).
///
/// Lightness runs from 0 to 100, chroma from 0 upwards (roughly 0..150 for
/// displayable colors), hue is in degrees. Values are plain copies; every
/// adjustment returns a new color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lch {
    pub lightness: f64,
    pub chroma: f64,
    pub hue: f64,
}

impl Lch {
    pub const WHITE: Self = Self::new(100.0, 0.0, 0.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(lightness: f64, chroma: f64, hue: f64) -> Self {
        Self {
            lightness,
            chroma,
            hue,
        }
    }

    /// Build a color from gamma-encoded sRGB channels in `0.0..=1.0`.
    pub fn from_srgb(rgb: [f64; 3]) -> Self {
        let [red, green, blue] = rgb;
        let linear: LinSrgb<f64> = Srgb::new(red, green, blue).into_linear();
        let xyz = XyzD65::from_color_unclamped(linear);
        Self::from_lab(CieLab::from_color_unclamped(d65_to_d50(xyz)))
    }

    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        let [red, green, blue] = rgb;
        let encoded: Srgb<f64> = Srgb::new(red, green, blue).into_format();
        Self::from_srgb([encoded.red, encoded.green, encoded.blue])
    }

    fn from_lab(lab: CieLab) -> Self {
        let lch = CieLch::from_color_unclamped(lab);
        let hue = if lab.a.abs() < ACHROMATIC_CHROMA && lab.b.abs() < ACHROMATIC_CHROMA {
            0.0
        } else {
            normalize_hue(lch.hue.into_positive_degrees())
        };
        Self::new(lch.l, lch.chroma, hue)
    }

    fn to_lab(self) -> CieLab {
        CieLab::from_color_unclamped(CieLch::new(self.lightness, self.chroma, self.hue))
    }

    fn to_xyz_d65(self) -> XyzD65 {
        d50_to_d65(XyzD50::from_color_unclamped(self.to_lab()))
    }

    /// Gamma-encoded sRGB channels, unclamped. Negative linear channels are
    /// encoded as the mirror image of their magnitude.
    pub fn to_srgb(self) -> [f64; 3] {
        let linear = LinSrgb::<f64>::from_color_unclamped(self.to_xyz_d65());
        [linear.red, linear.green, linear.blue].map(linear_to_srgb)
    }

    /// `#rrggbb`, clamped into the sRGB gamut.
    pub fn to_hex(self) -> String {
        let [red, green, blue] = self.to_srgb().map(|channel| channel.clamp(0.0, 1.0));
        let rgb: Srgb<u8> = Srgb::new(red, green, blue).into_format();
        format!("#{:02x}{:02x}{:02x}", rgb.red, rgb.green, rgb.blue)
    }

    /// CIE Y of the color, the luminance the WCAG ratio is built on.
    pub fn luminance(self) -> f64 {
        self.to_xyz_d65().y
    }

    pub fn is_achromatic(self) -> bool {
        self.chroma < ACHROMATIC_CHROMA
    }

    pub fn with_chroma(self, chroma: f64) -> Self {
        Self { chroma, ..self }
    }

    pub fn with_lightness(self, lightness: f64) -> Self {
        Self { lightness, ..self }
    }

    /// The color exactly as its serialized form reads back.
    pub fn canonical(self) -> Self {
        Self::new(
            round_significant(self.lightness),
            round_significant(self.chroma),
            normalize_hue(round_significant(self.hue)),
        )
    }

    /// Interpolate towards `other` in LCH, taking the shorter way around the
    /// hue circle. `t = 0` is `self`, `t = 1` is `other`.
    pub fn mix(self, other: Self, t: f64) -> Self {
        let (mut from_hue, mut to_hue) = (self.hue, other.hue);
        if self.is_achromatic() {
            from_hue = to_hue;
        } else if other.is_achromatic() {
            to_hue = from_hue;
        }

        let delta = to_hue - from_hue;
        if delta > 180.0 {
            from_hue += 360.0;
        } else if delta < -180.0 {
            to_hue += 360.0;
        }

        Self::new(
            lerp(self.lightness, other.lightness, t),
            lerp(self.chroma, other.chroma, t),
            normalize_hue(lerp(from_hue, to_hue, t)),
        )
    }

    /// CIEDE2000 color difference. Values under ~2 are hard to tell apart.
    pub fn delta_e_2000(self, other: Self) -> f64 {
        self.to_lab().difference(other.to_lab())
    }
}

/// APCA-style lightness contrast of `foreground` text on `background`.
///
/// Positive for dark text on a light background, negative for light text on
/// a dark one. Magnitudes of 60 and above read comfortably as body text.
pub fn contrast_apca(background: Lch, foreground: Lch) -> f64 {
    let text_y = soft_clamp_black(apca_luminance(foreground));
    let background_y = soft_clamp_black(apca_luminance(background));

    if (background_y - text_y).abs() < APCA_DELTA_Y_MIN {
        return 0.0;
    }

    let raw = if background_y > text_y {
        (background_y.powf(APCA_NORM_BG) - text_y.powf(APCA_NORM_TXT)) * APCA_SCALE
    } else {
        (background_y.powf(APCA_REV_BG) - text_y.powf(APCA_REV_TXT)) * APCA_SCALE
    };

    let clipped = if raw.abs() < APCA_LOW_CLIP {
        0.0
    } else if raw > 0.0 {
        raw - APCA_LOW_OFFSET
    } else {
        raw + APCA_LOW_OFFSET
    };

    clipped * 100.0
}

/// WCAG 2.1 contrast ratio, from 1 (identical luminance) to 21.
pub fn contrast_wcag21(first: Lch, second: Lch) -> f64 {
    let relative = |color: Lch| LinLuma::<D65, f64>::new(color.luminance().max(0.0));
    relative(first).relative_contrast(relative(second))
}

fn apca_luminance(color: Lch) -> f64 {
    let [r, g, b] = color.to_srgb().map(|channel| channel.signum() * channel.abs().powf(2.4));
    r * 0.212_672_9 + g * 0.715_152_2 + b * 0.072_175
}

fn soft_clamp_black(y: f64) -> f64 {
    if y >= APCA_BLACK_THRESHOLD {
        y
    } else {
        y + (APCA_BLACK_THRESHOLD - y).powf(APCA_BLACK_CLAMP)
    }
}

fn d65_to_d50(xyz: XyzD65) -> XyzD50 {
    <XyzD50 as AdaptFrom<XyzD65, D65, D50, f64>>::adapt_from(xyz)
}

fn d50_to_d65(xyz: XyzD50) -> XyzD65 {
    <XyzD65 as AdaptFrom<XyzD50, D50, D65, f64>>::adapt_from(xyz)
}

fn normalize_hue(hue: f64) -> f64 {
    let wrapped = hue.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

// APCA reads the sign of out-of-gamut channels, so the curve is mirrored
// around zero instead of going linear for negative values.
fn linear_to_srgb(channel: f64) -> f64 {
    let abs = channel.abs();
    if abs > 0.003_130_8 {
        channel.signum() * (1.055 * abs.powf(1.0 / 2.4) - 0.055)
    } else {
        12.92 * channel
    }
}

fn round_significant(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return 0.0;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(PRECISION - 1 - magnitude);
    // adding zero folds -0.0 into 0.0
    (value * factor).round() / factor + 0.0
}

impl fmt::Display for Lch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let canonical = self.canonical();
        write!(
            f,
            "lch({}% {} {})",
            canonical.lightness, canonical.chroma, canonical.hue
        )
    }
}

impl FromStr for Lch {
    type Err = ColorParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ColorParseError::Empty);
        }

        let lower = trimmed.to_ascii_lowercase();
        match lower.as_str() {
            "white" => return Ok(Self::WHITE),
            "black" => return Ok(Self::BLACK),
            _ => {}
        }

        if let Some(args) = lower
            .strip_prefix("lch(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_lch_args(args).ok_or_else(|| ColorParseError::InvalidLch(input.into()));
        }

        let hex = lower.strip_prefix('#').unwrap_or(&lower);
        if hex.chars().all(|ch| ch.is_ascii_alphanumeric()) {
            return hex
                .parse::<Srgb<u8>>()
                .map(|rgb| Self::from_rgb8([rgb.red, rgb.green, rgb.blue]))
                .map_err(|_| ColorParseError::InvalidHex(input.into()));
        }

        Err(ColorParseError::Unsupported(input.into()))
    }
}

fn parse_lch_args(args: &str) -> Option<Lch> {
    // Alpha after a slash is accepted and ignored.
    let channels = args.split('/').next()?;
    let mut parts = channels.split_whitespace();
    let lightness = parts.next()?;
    let chroma = parts.next()?;
    let hue = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let lightness = lightness.strip_suffix('%').unwrap_or(lightness).parse().ok()?;
    let chroma = chroma.parse().ok()?;
    let hue = match hue {
        "none" => 0.0,
        value => value.strip_suffix("deg").unwrap_or(value).parse().ok()?,
    };

    Some(Lch::new(lightness, chroma, normalize_hue(hue)))
}

impl Serialize for Lch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Lch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
