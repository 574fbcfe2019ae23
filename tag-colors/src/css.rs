//! Stylesheet text for colored tags and the buffer that batches it.

use crate::resolver::ColorResult;

const TAGS_PROPERTY: &str = r#".metadata-property[data-property-key="tags" i]"#;
const EDITOR_LINE: &str = ".cm-s-obsidian .cm-line";
const LIGHT_SCOPE: &str = "body";
const DARK_SCOPE: &str = "body.theme-dark";

fn escape_slashes(tag: &str) -> String {
    tag.replace('/', "\\/")
}

/// Selectors that match every place `tag` is displayed.
pub fn tag_selectors(tag: &str) -> Vec<String> {
    let href = escape_slashes(tag);
    let lower = escape_slashes(&tag.to_lowercase());

    let mut selectors = vec![
        format!(r##"a.tag[href="#{href}" i]"##),
        format!("a.tag.colored-tag-{lower}"),
        format!("{EDITOR_LINE} span.cm-hashtag.colored-tag-{lower}"),
        format!("{TAGS_PROPERTY} .multi-select-pill.colored-tag-{lower}"),
    ];

    let flat: String = tag
        .to_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '-')
        .collect();
    if !flat.is_empty() && !tag.contains('/') {
        selectors.push(format!("{EDITOR_LINE} span.cm-tag-{flat}.cm-hashtag"));
    }

    selectors
}

/// Selectors for the remove button inside a property pill.
pub fn remove_button_selectors(tag: &str) -> Vec<String> {
    if tag.is_empty() {
        return Vec::new();
    }
    let lower = escape_slashes(&tag.to_lowercase());
    vec![format!(
        "{TAGS_PROPERTY} .multi-select-pill-remove-button.colored-tag-{lower}"
    )]
}

fn scoped(scope: &str, selectors: &[String]) -> String {
    selectors
        .iter()
        .map(|selector| format!("{scope} {selector}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Light and dark theme rules for `tag`.
pub fn tag_rules(tag: &str, light: &ColorResult, dark: &ColorResult) -> String {
    let selectors = tag_selectors(tag);
    let buttons = remove_button_selectors(tag);

    [(LIGHT_SCOPE, light), (DARK_SCOPE, dark)]
        .into_iter()
        .map(|(scope, colors)| {
            let mut rules = vec![format!(
                "{} {{\n\tbackground-color: {};\n\tcolor: {};\n\tbackground-image: linear-gradient(108deg, {});\n\t}}",
                scoped(scope, &selectors),
                colors.background,
                colors.color,
                colors.linear_gradient.join(", "),
            )];
            if !buttons.is_empty() {
                rules.push(format!(
                    "{} {{\n\tcolor: {};\n\tstroke: {};\n\t}}",
                    scoped(scope, &buttons),
                    colors.color,
                    colors.color,
                ));
            }
            rules.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collects stylesheet chunks and hands them out as one write.
#[derive(Clone, Debug, Default)]
pub struct StyleBuffer {
    chunks: Vec<String>,
    pending: bool,
}

impl StyleBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `css`. Returns `true` when this append is the one that
    /// scheduled the next flush.
    pub fn append(&mut self, css: impl Into<String>) -> bool {
        self.chunks.push(css.into());
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Everything appended since the last flush, joined with newlines.
    pub fn flush(&mut self) -> Option<String> {
        self.pending = false;
        if self.chunks.is_empty() {
            return None;
        }
        let css = self.chunks.join("\n");
        self.chunks.clear();
        Some(css)
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(background: &str, color: &str) -> ColorResult {
        ColorResult {
            background: background.to_string(),
            color: color.to_string(),
            linear_gradient: vec![
                format!("{background} 0% max(2em, 50%)"),
                format!("{background} 50% max(2em, 100%)"),
            ],
        }
    }

    #[test]
    fn flat_tags_get_editor_class_variants() {
        let selectors = tag_selectors("excalidraw");
        assert_eq!(selectors.len(), 5);
        assert_eq!(selectors[0], r##"a.tag[href="#excalidraw" i]"##);
        assert_eq!(
            selectors[4],
            ".cm-s-obsidian .cm-line span.cm-tag-excalidraw.cm-hashtag"
        );
    }

    #[test]
    fn display_case_tags_get_one_lowercase_editor_class() {
        let selectors = tag_selectors("Excalidraw");
        assert_eq!(selectors.len(), 5);
        assert_eq!(
            selectors[4],
            ".cm-s-obsidian .cm-line span.cm-tag-excalidraw.cm-hashtag"
        );
    }

    #[test]
    fn nested_tags_escape_slashes() {
        let selectors = tag_selectors("project/alpha");
        assert_eq!(selectors.len(), 4);
        assert_eq!(selectors[0], r##"a.tag[href="#project\/alpha" i]"##);
        assert_eq!(selectors[1], r"a.tag.colored-tag-project\/alpha");
    }

    #[test]
    fn flat_variant_drops_unsupported_characters() {
        let selectors = tag_selectors("to_do");
        assert!(selectors.contains(&".cm-s-obsidian .cm-line span.cm-tag-todo.cm-hashtag".to_string()));

        let selectors = tag_selectors("日本");
        assert_eq!(selectors.len(), 4);
    }

    #[test]
    fn rules_cover_both_themes_and_the_remove_button() {
        let css = tag_rules(
            "excalidraw",
            &result("lch(87% 16 35)", "lch(40% 36 35)"),
            &result("lch(35% 29 35)", "lch(76% 32 35)"),
        );

        assert!(css.contains(
            r#"body .metadata-property[data-property-key="tags" i] .multi-select-pill.colored-tag-excalidraw"#
        ));
        assert!(css.contains(
            r#"body .metadata-property[data-property-key="tags" i] .multi-select-pill-remove-button.colored-tag-excalidraw"#
        ));
        assert!(css.contains("body.theme-dark a.tag.colored-tag-excalidraw"));
        assert!(css.contains("\tbackground-color: lch(87% 16 35);\n\tcolor: lch(40% 36 35);\n"));
        assert!(css.contains(
            "background-image: linear-gradient(108deg, lch(35% 29 35) 0% max(2em, 50%), lch(35% 29 35) 50% max(2em, 100%));"
        ));
        assert!(css.contains("\tcolor: lch(76% 32 35);\n\tstroke: lch(76% 32 35);\n\t}"));
        assert_eq!(css.matches(" {\n").count(), 4);
    }

    #[test]
    fn buffer_schedules_once_per_batch() {
        let mut buffer = StyleBuffer::new();
        assert_eq!(buffer.flush(), None);

        assert!(buffer.append("a {}"));
        assert!(!buffer.append("b {}"));
        assert!(buffer.is_pending());
        assert_eq!(buffer.flush().as_deref(), Some("a {}\nb {}"));
        assert!(!buffer.is_pending());

        assert!(buffer.append("c {}"));
        buffer.clear();
        assert_eq!(buffer.flush(), None);
    }
}
