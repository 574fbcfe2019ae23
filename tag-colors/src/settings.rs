//! Stored plugin settings: the on-disk model, version migrations and where
//! the file lives.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::config_dir;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::palette::{PaletteConfig, PaletteKind};
use crate::resolver::{ColorOptions, TagColorOverrides};
use crate::tags::normalize_tag_name;

pub const SETTINGS_PATH_ENV: &str = "COLORED_TAGS_SETTINGS";
pub const CURRENT_VERSION: u32 = 4;

/// Legacy palette id stored by version 1 settings.
const LEGACY_PALETTE_ID: u64 = 16;
const LEGACY_SOFT_CHROMA: f64 = 16.0;
const LEGACY_SOFT_LIGHTNESS: f64 = 87.0;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("config directory unavailable")]
    MissingConfigDir,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error("settings must be a JSON object, found {0}")]
    InvalidShape(&'static str),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Accessibility {
    pub high_text_contrast: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub palette: PaletteConfig,
    pub mix_colors: bool,
    pub transition: bool,
    pub accessibility: Accessibility,
    pub known_tags: BTreeMap<String, u32>,
    pub tag_colors: TagColorOverrides,
    #[serde(rename = "_version")]
    pub version: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            palette: PaletteConfig::default(),
            mix_colors: true,
            transition: true,
            accessibility: Accessibility::default(),
            known_tags: BTreeMap::new(),
            tag_colors: TagColorOverrides::new(),
            version: CURRENT_VERSION,
        }
    }
}

impl Settings {
    /// Bring stored settings of any version up to date. The flag reports
    /// whether a migration ran and the result should be written back.
    pub fn migrate(stored: Value) -> Result<(Self, bool), SettingsError> {
        let mut data = match stored {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(SettingsError::InvalidShape(json_kind(&other))),
        };

        let from = data
            .get("_version")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mut version = from;

        for (target, apply) in MIGRATIONS {
            if version < target {
                apply(&mut data);
                version = target;
                data.insert("_version".into(), json!(target));
            }
        }

        let migrated = version != from;
        if migrated {
            warn!(from, to = version, "migrated stored settings");
        }

        let settings = serde_json::from_value(Value::Object(data))?;
        Ok((settings, migrated))
    }

    pub fn load() -> Result<Self, SettingsError> {
        let path = get_settings_path()?;
        Self::load_from_path(path)
    }

    /// Read and migrate the settings file. A missing file yields defaults.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let stored: Value = serde_json::from_str(&contents)?;
                let (settings, migrated) = Self::migrate(stored)?;
                info!(path = %path.display(), migrated, "loaded settings");
                Ok(settings)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn color_options(&self) -> ColorOptions {
        ColorOptions {
            is_mixing: self.mix_colors,
            is_transition: self.transition,
            high_text_contrast: self.accessibility.high_text_contrast,
        }
    }

    /// Overrides keyed by normalized tag path; keys that normalize to
    /// nothing are dropped.
    pub fn normalized_tag_colors(&self) -> TagColorOverrides {
        self.tag_colors
            .iter()
            .filter_map(|(tag, index)| normalize_tag_name(tag).map(|tag| (tag, *index)))
            .collect()
    }
}

type Migration = fn(&mut Map<String, Value>);

/// Stored version reached after each step, oldest first.
const MIGRATIONS: [(u64, Migration); 3] = [
    (2, store_legacy_palette_id),
    (3, fold_legacy_palette),
    (4, default_tag_colors),
];

fn store_legacy_palette_id(data: &mut Map<String, Value>) {
    data.insert("palette".into(), json!(LEGACY_PALETTE_ID));
}

fn fold_legacy_palette(data: &mut Map<String, Value>) {
    let seed = data.remove("seed").map(|seed| legacy_seed(&seed)).unwrap_or(0);
    let chroma = data.remove("chroma").and_then(|value| value.as_f64());
    let lightness = data.remove("lightness").and_then(|value| value.as_f64());

    let bright = chroma.is_some_and(|chroma| chroma > LEGACY_SOFT_CHROMA)
        || lightness.is_some_and(|lightness| lightness > LEGACY_SOFT_LIGHTNESS);
    let palette = PaletteConfig {
        selected: if bright {
            PaletteKind::AdaptiveBright
        } else {
            PaletteKind::AdaptiveSoft
        },
        seed,
        ..PaletteConfig::default()
    };

    data.insert("palette".into(), json!(palette));
}

fn default_tag_colors(data: &mut Map<String, Value>) {
    let tag_colors = data.remove("tagColors").filter(|value| !value.is_null());
    data.insert("tagColors".into(), tag_colors.unwrap_or_else(|| json!({})));
}

fn legacy_seed(value: &Value) -> usize {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|seed| *seed > 0.0).map(|seed| seed as u64))
        .unwrap_or(0) as usize
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn get_settings_path() -> Result<PathBuf, SettingsError> {
    if let Ok(custom) = env::var(SETTINGS_PATH_ENV) {
        return Ok(PathBuf::from(custom));
    }
    let base = config_dir().ok_or(SettingsError::MissingConfigDir)?;
    Ok(base.join("colored-tags").join("settings.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::tempdir;

    static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_MUTEX.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn empty_store_migrates_to_defaults() {
        let (settings, migrated) = Settings::migrate(Value::Null).expect("migrate");
        assert!(migrated);
        assert_eq!(settings, Settings::default());
        assert!(settings.mix_colors);
        assert!(settings.transition);
        assert_eq!(settings.palette.custom, "e12729-f37324-f8cc1b-72b043-007f4e");
    }

    #[test]
    fn legacy_bright_values_select_bright_palette() {
        let stored = json!({ "seed": 3, "chroma": 32, "lightness": 80, "mixColors": false });
        let (settings, migrated) = Settings::migrate(stored).expect("migrate");

        assert!(migrated);
        assert_eq!(settings.palette.selected, PaletteKind::AdaptiveBright);
        assert_eq!(settings.palette.seed, 3);
        assert!(!settings.mix_colors);
        assert!(settings.tag_colors.is_empty());
        assert_eq!(settings.version, CURRENT_VERSION);
    }

    #[test]
    fn legacy_soft_values_keep_soft_palette() {
        let stored = json!({ "_version": 2, "palette": 16, "chroma": 16, "lightness": 87 });
        let (settings, _) = Settings::migrate(stored).expect("migrate");
        assert_eq!(settings.palette.selected, PaletteKind::AdaptiveSoft);
        assert_eq!(settings.palette.seed, 0);
    }

    #[test]
    fn version_three_only_gains_tag_colors() {
        let stored = json!({
            "_version": 3,
            "palette": { "selected": "custom", "custom": "ff0000-00ff00", "seed": 1 },
            "knownTags": { "todo": 1 },
        });
        let (settings, migrated) = Settings::migrate(stored).expect("migrate");

        assert!(migrated);
        assert_eq!(settings.palette.selected, PaletteKind::Custom);
        assert_eq!(settings.palette.custom, "ff0000-00ff00");
        assert_eq!(settings.known_tags["todo"], 1);
        assert!(settings.tag_colors.is_empty());
    }

    #[test]
    fn current_settings_are_left_alone() {
        let stored = json!({ "_version": 4, "tagColors": { "work": -2 }, "transition": false });
        let (settings, migrated) = Settings::migrate(stored).expect("migrate");

        assert!(!migrated);
        assert_eq!(settings.tag_colors["work"], -2);
        assert!(!settings.transition);
    }

    #[test]
    fn rejects_non_object_settings() {
        let err = Settings::migrate(json!([1, 2])).expect_err("array is not settings");
        assert_eq!(err.to_string(), "settings must be a JSON object, found an array");
    }

    #[test]
    fn serializes_with_stored_field_names() {
        let value = serde_json::to_value(Settings::default()).expect("serialize");
        assert_eq!(value["_version"], json!(4));
        assert_eq!(value["palette"]["selected"], json!("adaptive-soft"));
        assert_eq!(value["accessibility"]["highTextContrast"], json!(false));
        assert!(value.get("mixColors").is_some());
        assert!(value.get("knownTags").is_some());
    }

    #[test]
    fn color_options_mirror_toggles() {
        let mut settings = Settings::default();
        settings.mix_colors = false;
        settings.accessibility.high_text_contrast = true;

        let options = settings.color_options();
        assert!(!options.is_mixing);
        assert!(options.is_transition);
        assert!(options.high_text_contrast);
    }

    #[test]
    fn normalizes_override_keys() {
        let mut settings = Settings::default();
        settings.tag_colors = TagColorOverrides::from([
            ("#Tag/".to_string(), -1),
            (" other ".to_string(), 2),
            ("#".to_string(), 0),
        ]);

        assert_eq!(
            settings.normalized_tag_colors(),
            TagColorOverrides::from([("tag".to_string(), -1), ("other".to_string(), 2)])
        );
    }

    #[test]
    fn load_missing_file_returns_default() {
        let dir = tempdir().expect("tempdir");
        let loaded = Settings::load_from_path(dir.path().join("settings.json")).expect("load");
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn load_from_path_migrates_stored_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"seed": 5, "knownTags": {"a": 1}}"#).expect("write settings");

        let loaded = Settings::load_from_path(&path).expect("load");
        assert_eq!(loaded.palette.seed, 5);
        assert_eq!(loaded.known_tags["a"], 1);
    }

    #[test]
    fn load_reports_malformed_json() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").expect("write settings");

        let err = Settings::load_from_path(&path).expect_err("malformed");
        assert!(matches!(err, SettingsError::Serde(_)));
    }

    #[test]
    fn load_uses_env_path() {
        let _guard = env_lock().lock().expect("lock env mutex");
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"_version": 4, "mixColors": false}"#).expect("write settings");

        env::set_var(SETTINGS_PATH_ENV, &path);
        struct Reset;
        impl Drop for Reset {
            fn drop(&mut self) {
                env::remove_var(SETTINGS_PATH_ENV);
            }
        }
        let _reset = Reset;

        assert_eq!(get_settings_path().expect("path"), path);
        let loaded = Settings::load().expect("load");
        assert!(!loaded.mix_colors);
    }

    #[test]
    fn missing_config_dir_error_message() {
        let message = SettingsError::MissingConfigDir.to_string();
        assert_eq!(message, "config directory unavailable");
    }
}
