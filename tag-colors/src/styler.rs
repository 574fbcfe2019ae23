//! Keeps the generated stylesheet in step with known tags and settings.

use tracing::{debug, info};

use crate::css::{tag_rules, StyleBuffer};
use crate::palette::{generate_palettes, palettes_changed, Palettes};
use crate::remap::remap;
use crate::resolver::{ColorResult, TagColorOverrides, TagColorResolver};
use crate::settings::Settings;
use crate::tags::{normalize_tag_name, TagRegistry};

/// Owns everything needed to turn tag paths into theme-aware CSS rules.
///
/// Every tag is styled at most once between reloads; rules accumulate in a
/// [`StyleBuffer`] and leave through [`TagStyler::flush`].
#[derive(Debug)]
pub struct TagStyler {
    settings: Settings,
    palettes: Palettes,
    registry: TagRegistry,
    resolver: TagColorResolver,
    overrides: TagColorOverrides,
    buffer: StyleBuffer,
}

impl TagStyler {
    pub fn new(mut settings: Settings) -> Self {
        let registry = TagRegistry::from_known_tags(std::mem::take(&mut settings.known_tags));
        settings.known_tags = registry.export_known_tags();
        let palettes = generate_palettes(&settings.palette);
        let overrides = settings.normalized_tag_colors();

        Self {
            settings,
            palettes,
            registry,
            resolver: TagColorResolver::new(),
            overrides,
            buffer: StyleBuffer::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn palettes(&self) -> &Palettes {
        &self.palettes
    }

    pub fn registry(&self) -> &TagRegistry {
        &self.registry
    }

    pub fn overrides(&self) -> &TagColorOverrides {
        &self.overrides
    }

    /// Register tags seen in the vault. Newly learned orders are copied into
    /// the settings so they survive a save.
    pub fn observe_tags<I, S>(&mut self, tags: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let changed = self.registry.update_known_tags(tags);
        if changed {
            self.settings.known_tags = self.registry.export_known_tags();
        }
        changed
    }

    /// Drop all generated styles and start over, optionally with
    /// precomputed palettes.
    pub fn reload(&mut self, palettes: Option<Palettes>) {
        self.buffer.clear();
        self.registry.clear_rendered();
        self.resolver.reset();
        self.palettes = palettes.unwrap_or_else(|| generate_palettes(&self.settings.palette));
        self.overrides = self.settings.normalized_tag_colors();
        self.update();
    }

    /// Style every known tag that has not been styled since the last reload.
    pub fn update(&mut self) {
        let pending: Vec<String> = self
            .registry
            .iter()
            .map(|(tag, _)| tag)
            .filter(|tag| !self.registry.is_rendered(tag))
            .map(str::to_string)
            .collect();

        for tag in &pending {
            self.registry.mark_rendered(tag);
            self.colorize_tag(tag);
        }

        if !pending.is_empty() {
            debug!(count = pending.len(), "styled new tags");
        }
    }

    /// Light and dark theme colors for one tag.
    pub fn colors_for(&mut self, tag: &str) -> Option<(ColorResult, ColorResult)> {
        let options = self.settings.color_options();
        let overrides = Some(&self.overrides);

        let light = self.resolver.get_colors(
            tag,
            &self.palettes.light,
            &self.registry,
            options,
            overrides,
        )?;
        let dark = self.resolver.get_colors(
            tag,
            &self.palettes.dark,
            &self.registry,
            options,
            overrides,
        )?;
        Some((light, dark))
    }

    /// Queue the rules for `tag`. Returns `false` when the tag resolves to
    /// nothing.
    pub fn colorize_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag_name(tag) else {
            return false;
        };
        let Some((light, dark)) = self.colors_for(&tag) else {
            return false;
        };

        self.buffer
            .append(format!("\n{}\n", tag_rules(&tag, &light, &dark)));
        true
    }

    /// Swap in new settings. When the palettes change, pinned colors move
    /// to their closest match in the new light palette first.
    pub fn apply_settings(&mut self, mut settings: Settings) {
        let next = generate_palettes(&settings.palette);
        if palettes_changed(&self.palettes, &next) {
            settings.tag_colors = remap(&self.palettes.light, &next.light, &settings.tag_colors);
            info!(
                overrides = settings.tag_colors.len(),
                "palette changed, remapped tag colors"
            );
        }

        settings.known_tags = self.registry.export_known_tags();
        self.settings = settings;
        self.reload(Some(next));
    }

    /// The batched stylesheet text, if anything was queued.
    pub fn flush(&mut self) -> Option<String> {
        self.buffer.flush()
    }

    /// Remove every generated rule without forgetting what tags exist.
    pub fn remove_all(&mut self) {
        self.buffer.clear();
        self.registry.clear_rendered();
    }
}
