//! Text color selection that keeps tag labels legible on their background.

use std::collections::HashMap;

use tracing::trace;

use crate::color::{contrast_apca, contrast_wcag21, Lch};

pub const WHITE_TEXT: &str = "white";
pub const BLACK_TEXT: &str = "black";
/// Returned when no candidate passes both thresholds.
pub const FALLBACK_TEXT: &str = WHITE_TEXT;

const MIN_APCA_CONTRAST: f64 = 60.0;
const MIN_WCAG_CONTRAST: f64 = 4.5;
const MAX_STEPS: usize = 100;
const LIGHT_TEXT_CHROMA_BOOST: f64 = 3.0;
const DARK_TEXT_CHROMA_BOOST: f64 = 20.0;
const MAX_CHROMA: f64 = 100.0;

/// Whether light `text` passes both thresholds on `background`.
pub fn is_legible_light_text(background: Lch, text: Lch) -> bool {
    contrast_apca(background, text) <= -MIN_APCA_CONTRAST
        && contrast_wcag21(text, background) >= MIN_WCAG_CONTRAST
}

/// Whether dark `text` passes both thresholds on `background`.
pub fn is_legible_dark_text(background: Lch, text: Lch) -> bool {
    contrast_apca(background, text) >= MIN_APCA_CONTRAST
        && contrast_wcag21(text, background) >= MIN_WCAG_CONTRAST
}

/// Picks text colors for tag backgrounds and remembers what it picked.
///
/// The soft mode walks a tinted light and a tinted dark candidate away from
/// the background one lightness step at a time until one of them clears both
/// the APCA and the WCAG 2.1 threshold. Results are cached by the
/// background's serialized form for the lifetime of the resolver.
#[derive(Clone, Debug, Default)]
pub struct ContrastResolver {
    darkened: HashMap<String, String>,
}

impl ContrastResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_text_color(&mut self, background: Lch, high_contrast: bool) -> String {
        if high_contrast {
            high_contrast_color(background).to_string()
        } else {
            self.darkened_color(background)
        }
    }

    pub fn darkened_color(&mut self, background: Lch) -> String {
        let key = background.to_string();
        if let Some(cached) = self.darkened.get(&key) {
            trace!(background = %key, "text color cache hit");
            return cached.clone();
        }

        let text = search_text_color(background.canonical())
            .map(|color| color.to_string())
            .unwrap_or_else(|| FALLBACK_TEXT.to_string());

        self.darkened.insert(key, text.clone());
        text
    }

    pub fn cache_len(&self) -> usize {
        self.darkened.len()
    }

    pub fn clear(&mut self) {
        self.darkened.clear();
    }
}

/// Pure white or pure black, whichever has the larger APCA magnitude.
/// White wins ties.
pub fn high_contrast_color(background: Lch) -> &'static str {
    let on_white = contrast_apca(background, Lch::WHITE).abs();
    let on_black = contrast_apca(background, Lch::BLACK).abs();

    if on_white >= on_black {
        WHITE_TEXT
    } else {
        BLACK_TEXT
    }
}

fn search_text_color(background: Lch) -> Option<Lch> {
    let mut light = background.with_chroma((background.chroma + LIGHT_TEXT_CHROMA_BOOST).min(MAX_CHROMA));
    let mut dark = background.with_chroma((background.chroma + DARK_TEXT_CHROMA_BOOST).min(MAX_CHROMA));

    for _ in 0..MAX_STEPS {
        // Check what will be serialized, so the returned string passes too.
        let light_text = light.canonical();
        if is_legible_light_text(background, light_text) {
            return Some(light_text);
        }
        let dark_text = dark.canonical();
        if is_legible_dark_text(background, dark_text) {
            return Some(dark_text);
        }

        light.lightness += 1.0;
        dark.lightness -= 1.0;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lch(input: &str) -> Lch {
        input.parse().expect("parse color")
    }

    #[test]
    fn high_contrast_prefers_white_on_dark() {
        assert_eq!(high_contrast_color(Lch::BLACK), WHITE_TEXT);
        assert_eq!(high_contrast_color(lch("#123456")), WHITE_TEXT);
    }

    #[test]
    fn high_contrast_prefers_black_on_light() {
        assert_eq!(high_contrast_color(Lch::WHITE), BLACK_TEXT);
        assert_eq!(high_contrast_color(lch("lch(87% 16 35)")), BLACK_TEXT);
    }

    #[test]
    fn soft_mode_darkens_text_on_light_background() {
        let background = lch("lch(87% 16 35)");
        let mut resolver = ContrastResolver::new();
        let text = lch(&resolver.resolve_text_color(background, false));

        assert!(text.lightness < background.lightness);
        assert_eq!(text.hue, background.hue);
        assert_eq!(text.chroma, 36.0);
        assert!(is_legible_dark_text(background, text));
    }

    #[test]
    fn soft_mode_lightens_text_on_dark_background() {
        let background = lch("lch(20% 29 260)");
        let mut resolver = ContrastResolver::new();
        let text = lch(&resolver.resolve_text_color(background, false));

        assert!(text.lightness > background.lightness);
        assert_eq!(text.chroma, 32.0);
        assert!(is_legible_light_text(background, text));
    }

    #[test]
    fn mid_gray_still_finds_a_candidate() {
        let background = lch("lch(55% 0 0)");
        let mut resolver = ContrastResolver::new();
        let text = resolver.resolve_text_color(background, false);

        assert_ne!(text, FALLBACK_TEXT);
        let text = lch(&text);
        assert!(
            is_legible_light_text(background, text) || is_legible_dark_text(background, text)
        );
    }

    #[test]
    fn memoizes_by_background_string() {
        let background = lch("lch(87% 16 170)");
        let mut resolver = ContrastResolver::new();

        let first = resolver.resolve_text_color(background, false);
        let size = resolver.cache_len();
        let second = resolver.resolve_text_color(background, false);

        assert_eq!(first, second);
        assert_eq!(size, 1);
        assert_eq!(resolver.cache_len(), size);

        resolver.clear();
        assert_eq!(resolver.cache_len(), 0);
    }

    #[test]
    fn high_contrast_mode_is_not_cached() {
        let mut resolver = ContrastResolver::new();
        assert_eq!(resolver.resolve_text_color(Lch::BLACK, true), WHITE_TEXT);
        assert_eq!(resolver.cache_len(), 0);
    }
}
