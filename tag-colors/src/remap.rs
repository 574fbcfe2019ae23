//! Carry pinned tag colors across palette changes.

use tracing::debug;

use crate::color::Lch;
use crate::palette::Palette;
use crate::resolver::TagColorOverrides;
use crate::tags::{normalize_palette_index, normalize_tag_name};

/// Index of the palette entry perceptually closest to `color`. The first of
/// equally close entries wins; an empty palette yields 0.
pub fn find_closest_color_index(color: Lch, palette: &Palette) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;

    for (index, candidate) in palette.iter().enumerate() {
        let distance = color.delta_e_2000(candidate);
        if distance < best_distance {
            best = index;
            best_distance = distance;
        }
    }

    best
}

/// Re-point every override at the entry of `new_palette` closest to the color
/// it showed under `old_palette`.
pub fn remap(
    old_palette: &Palette,
    new_palette: &Palette,
    overrides: &TagColorOverrides,
) -> TagColorOverrides {
    if old_palette.is_empty() || new_palette.is_empty() {
        return overrides.clone();
    }

    let remapped: TagColorOverrides = overrides
        .iter()
        .filter_map(|(tag, index)| {
            let tag = normalize_tag_name(tag)?;
            let shown = old_palette[normalize_palette_index(*index, old_palette.len())];
            Some((tag, find_closest_color_index(shown, new_palette) as i64))
        })
        .collect();

    debug!(
        overrides = remapped.len(),
        from = old_palette.len(),
        to = new_palette.len(),
        "remapped tag color overrides"
    );
    remapped
}
