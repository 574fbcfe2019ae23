//! Deterministic, theme-aware colors for hierarchical tags.
//!
//! A tag path such as `project/alpha` is mapped to a background, a legible
//! text color and a gradient that shows its nesting, for a light and a dark
//! theme. [`TagStyler`] turns those colors into stylesheet rules.

pub mod color;
pub mod contrast;
pub mod css;
pub mod palette;
pub mod remap;
pub mod resolver;
pub mod settings;
pub mod styler;
pub mod tags;

pub use color::{contrast_apca, contrast_wcag21, ColorParseError, Lch};
pub use contrast::ContrastResolver;
pub use palette::{generate_palettes, Palette, PaletteConfig, PaletteKind, Palettes};
pub use resolver::{ColorOptions, ColorResult, SiblingOrders, TagColorOverrides, TagColorResolver};
pub use settings::{Settings, SettingsError};
pub use styler::TagStyler;
pub use tags::{normalize_tag_name, TagRegistry};
