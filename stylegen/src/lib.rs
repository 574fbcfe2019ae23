use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tag_colors::{Settings, TagStyler};
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "stylegen",
    author,
    version,
    about = "Generate the colored tag stylesheet for a Markdown vault",
    long_about = None
)]
pub struct Cli {
    /// Path to the vault whose notes are scanned for #tags
    #[arg(long, value_name = "VAULT_DIR")]
    pub vault: PathBuf,

    /// Settings file to use instead of the one in the config directory
    #[arg(long, value_name = "SETTINGS_FILE")]
    pub settings: Option<PathBuf>,

    /// Where to write the stylesheet; stdout when omitted
    #[arg(long, value_name = "OUTPUT_FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(cli: Cli) -> Result<()> {
    let vault = ensure_directory(&cli.vault)
        .with_context(|| format!("vault directory '{}' is invalid", cli.vault.display()))?;

    let settings = match &cli.settings {
        Some(path) => Settings::load_from_path(path)
            .with_context(|| format!("failed to load settings from '{}'", path.display()))?,
        None => Settings::load().context("failed to load settings")?,
    };

    let notes = collect_notes(vault)?;
    let mut tags = BTreeSet::new();
    for note in &notes {
        let text = fs::read_to_string(note)
            .with_context(|| format!("failed to read note '{}'", note.display()))?;
        tags.extend(extract_tags(&text));
    }
    debug!(notes = notes.len(), tags = tags.len(), "scanned vault");

    let mut styler = TagStyler::new(settings);
    styler.observe_tags(&tags);
    styler.update();
    let css = styler.flush().unwrap_or_default();

    match &cli.output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!(
                            "failed to create output parent directory '{}'",
                            parent.display()
                        )
                    })?;
                }
            }
            fs::write(output, &css)
                .with_context(|| format!("failed to write stylesheet to '{}'", output.display()))?;
        }
        None => io::stdout()
            .lock()
            .write_all(css.as_bytes())
            .context("failed to write stylesheet to stdout")?,
    }

    info!(
        target: "colored_tags::stylegen",
        vault = %vault.display(),
        notes = notes.len(),
        tags = styler.registry().len(),
        bytes = css.len(),
        "stylesheet generated"
    );

    Ok(())
}

/// Every `#tag` token in `text`, without the leading `#`.
///
/// A tag starts at the beginning of the text or after whitespace and runs
/// over letters, digits, `_`, `-` and `/`. Purely numeric tokens such as
/// issue references are not tags.
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut previous: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((index, ch)) = chars.next() {
        let at_boundary = previous.is_none_or(char::is_whitespace);
        previous = Some(ch);
        if ch != '#' || !at_boundary {
            continue;
        }

        let start = index + ch.len_utf8();
        let mut end = start;
        while let Some(&(next_index, next)) = chars.peek() {
            if !is_tag_char(next) {
                break;
            }
            end = next_index + next.len_utf8();
            previous = Some(next);
            chars.next();
        }

        let body = &text[start..end];
        if body.chars().any(|ch| !ch.is_ascii_digit() && ch != '/') {
            tags.push(body.to_string());
        }
    }

    tags
}

fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '/')
}

fn collect_notes(vault: &Path) -> Result<Vec<PathBuf>> {
    let mut notes = Vec::new();
    for entry in WalkDir::new(vault) {
        let entry = entry
            .with_context(|| format!("failed to walk vault directory '{}'", vault.display()))?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if is_markdown(&path) {
            notes.push(path);
        }
    }

    notes.sort();
    Ok(notes)
}

fn ensure_directory(path: &Path) -> Result<&Path> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to read metadata for '{}'", path.display()))?;

    if !metadata.is_dir() {
        anyhow::bail!("'{}' is not a directory", path.display());
    }

    Ok(path)
}

fn is_markdown(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .map(|ext| ext.eq_ignore_ascii_case("md"))
        .unwrap_or(false)
}
