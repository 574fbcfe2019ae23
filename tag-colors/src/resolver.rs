//! Per-tag color resolution: palette picks per path segment, blending into
//! the root color, and the gradient that shows nesting.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};

use crate::color::Lch;
use crate::contrast::ContrastResolver;
use crate::palette::Palette;
use crate::tags::{normalize_palette_index, normalize_tag_name};

const MIX_LEVEL: f64 = 0.4;
const TRANSITION_MIX_LEVEL: f64 = 0.5;
const MIX_LEVEL_BUMP: f64 = 0.1;
/// Blends closer than this to the root color get pushed further.
const MIN_VISIBLE_DELTA_E: f64 = 10.0;
const TRANSITION_GAP: f64 = 50.0;

/// User-pinned palette indices keyed by normalized tag path.
pub type TagColorOverrides = BTreeMap<String, i64>;

/// Read-only access to the sibling order of a tag path.
pub trait SiblingOrders {
    fn order_of(&self, tag_path: &str) -> Option<u32>;
}

impl<S: BuildHasher> SiblingOrders for HashMap<String, u32, S> {
    fn order_of(&self, tag_path: &str) -> Option<u32> {
        self.get(tag_path).copied()
    }
}

impl SiblingOrders for BTreeMap<String, u32> {
    fn order_of(&self, tag_path: &str) -> Option<u32> {
        self.get(tag_path).copied()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorOptions {
    /// Blend nested segments into the root color.
    pub is_mixing: bool,
    /// Softer blends and visible gaps between gradient stops.
    pub is_transition: bool,
    /// Pure white or black text instead of a tinted shade.
    pub high_text_contrast: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorResult {
    pub background: String,
    pub color: String,
    pub linear_gradient: Vec<String>,
}

/// One segment's color and the span it covers, in percent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GradientStop {
    pub color: Lch,
    pub start: f64,
    pub end: f64,
}

impl fmt::Display for GradientStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}% max(2em, {}%)", self.color, self.start, self.end)
    }
}

/// Lay `colors` out left to right across 100%.
///
/// Without transitions the stops butt against each other; with them a gap
/// proportional to the stop count separates neighbours.
pub fn gradient_stops(colors: &[Lch], is_transition: bool) -> Vec<GradientStop> {
    let count = colors.len() as f64;
    let default_gap = if is_transition { TRANSITION_GAP } else { 0.0 };
    let gap = default_gap / count * 2.0;
    let element_size = (100.0 - gap * (count - 1.0)) / count;

    colors
        .iter()
        .enumerate()
        .map(|(index, color)| {
            let start = index as f64 * (element_size + gap);
            GradientStop {
                color: *color,
                start,
                end: start + element_size,
            }
        })
        .collect()
}

/// Resolves `{background, color, gradient}` for tag paths.
#[derive(Clone, Debug, Default)]
pub struct TagColorResolver {
    contrast: ContrastResolver,
}

impl TagColorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contrast(&self) -> &ContrastResolver {
        &self.contrast
    }

    /// Forget every cached text color.
    pub fn reset(&mut self) {
        self.contrast.clear();
    }

    /// Colors for `tag_path` drawn from `palette`.
    ///
    /// The background is always the root segment's color; deeper segments
    /// only show up in the gradient. Returns `None` when the path normalizes
    /// to nothing or the palette is empty.
    pub fn get_colors<O>(
        &mut self,
        tag_path: &str,
        palette: &Palette,
        orders: &O,
        options: ColorOptions,
        overrides: Option<&TagColorOverrides>,
    ) -> Option<ColorResult>
    where
        O: SiblingOrders + ?Sized,
    {
        let tag_path = normalize_tag_name(tag_path)?;
        let colors = segment_colors(&tag_path, palette, orders, options, overrides)?;
        let anchor = *colors.first()?;

        let linear_gradient = gradient_stops(&colors, options.is_transition)
            .iter()
            .map(GradientStop::to_string)
            .collect();

        Some(ColorResult {
            background: anchor.to_string(),
            color: self
                .contrast
                .resolve_text_color(anchor, options.high_text_contrast),
            linear_gradient,
        })
    }
}

/// The rendered color of every segment of a normalized tag path, root first.
pub fn segment_colors<O>(
    tag_path: &str,
    palette: &Palette,
    orders: &O,
    options: ColorOptions,
    overrides: Option<&TagColorOverrides>,
) -> Option<Vec<Lch>>
where
    O: SiblingOrders + ?Sized,
{
    if palette.is_empty() {
        return None;
    }

    let mut colors = Vec::new();
    let mut anchor: Option<Lch> = None;
    let mut previous_pick: Option<Lch> = None;
    let mut key = String::with_capacity(tag_path.len());

    for segment in tag_path.split('/').filter(|segment| !segment.is_empty()) {
        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(segment);

        let order = orders
            .order_of(&key)
            .filter(|order| *order > 0)
            .unwrap_or(1);
        let pinned = overrides.and_then(|map| map.get(&key)).copied();

        let candidates = candidate_colors(palette, previous_pick, pinned.is_some());
        let index_source = pinned.unwrap_or(i64::from(order) - 1);
        let picked = candidates[normalize_palette_index(index_source, candidates.len())];
        previous_pick = Some(picked);

        let rendered = match anchor {
            Some(base) if options.is_mixing => blend(base, picked, options.is_transition),
            _ => picked,
        }
        .canonical();

        anchor.get_or_insert(rendered);
        colors.push(rendered);
    }

    if colors.is_empty() {
        None
    } else {
        Some(colors)
    }
}

/// The palette minus the color the previous segment used, unless a pin
/// applies or nothing would be left.
fn candidate_colors(palette: &Palette, previous: Option<Lch>, pinned: bool) -> Cow<'_, [Lch]> {
    let Some(previous) = previous else {
        return Cow::Borrowed(palette.colors());
    };
    if pinned || palette.len() <= 1 {
        return Cow::Borrowed(palette.colors());
    }

    let filtered: Vec<Lch> = palette.iter().filter(|color| *color != previous).collect();
    if filtered.is_empty() {
        Cow::Borrowed(palette.colors())
    } else {
        Cow::Owned(filtered)
    }
}

fn blend(base: Lch, next: Lch, is_transition: bool) -> Lch {
    let level = if is_transition {
        TRANSITION_MIX_LEVEL
    } else {
        MIX_LEVEL
    };

    let mixed = base.mix(next, level);
    if mixed.delta_e_2000(base) < MIN_VISIBLE_DELTA_E {
        base.mix(next, level + MIX_LEVEL_BUMP)
    } else {
        mixed
    }
}
