//! # Configuration
//!
//! Two files live in the data directory:
//!
//! | File | Written by | Contents |
//! |------|------------|----------|
//! | `config.json` | `notenet config <key> <value>` | [`NotenetConfig`] |
//! | `model.json` | `notenet provision` | [`ModelAliases`] |
//!
//! The data directory is resolved in [`crate::init`]: `NOTENET_HOME` when set,
//! otherwise the OS data directory (via the `directories` crate).
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `placeholder-text` | `Note contents...` | Shown for an empty note when no placeholder tile is provisioned |
//! | `log-filter` | `warn` | `tracing` filter used when `RUST_LOG` is unset |

use crate::error::{NotesError, Result};
use crate::model::DocId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILENAME: &str = "config.json";
pub const MODEL_FILENAME: &str = "model.json";
pub const DEFAULT_PLACEHOLDER_TEXT: &str = "Note contents...";
const DEFAULT_LOG_FILTER: &str = "warn";

pub const KEYS: &[&str] = &["placeholder-text", "log-filter"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotenetConfig {
    #[serde(default = "default_placeholder_text")]
    pub placeholder_text: String,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_placeholder_text() -> String {
    DEFAULT_PLACEHOLDER_TEXT.to_string()
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for NotenetConfig {
    fn default() -> Self {
        Self {
            placeholder_text: default_placeholder_text(),
            log_filter: default_log_filter(),
        }
    }
}

impl NotenetConfig {
    /// Load config from the given directory, or return defaults if not found
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path).map_err(NotesError::Io)?;
        let config: NotenetConfig =
            serde_json::from_str(&content).map_err(NotesError::Serialization)?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, config_dir: P) -> Result<()> {
        let config_dir = config_dir.as_ref();
        fs::create_dir_all(config_dir).map_err(NotesError::Io)?;

        let content = serde_json::to_string_pretty(self).map_err(NotesError::Serialization)?;
        fs::write(config_dir.join(CONFIG_FILENAME), content).map_err(NotesError::Io)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "placeholder-text" => Some(self.placeholder_text.clone()),
            "log-filter" => Some(self.log_filter.clone()),
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> std::result::Result<(), String> {
        match key {
            "placeholder-text" => {
                if value.trim().is_empty() {
                    return Err("placeholder-text cannot be empty".to_string());
                }
                self.placeholder_text = value.to_string();
            }
            "log-filter" => {
                tracing_subscriber::EnvFilter::try_new(value)
                    .map_err(|e| format!("Invalid log filter '{}': {}", value, e))?;
                self.log_filter = value.to_string();
            }
            other => return Err(format!("Unknown config key: {}", other)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definitions {
    pub notes: DocId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schemas {
    #[serde(rename = "Note")]
    pub note: DocId,
    #[serde(rename = "NotesList")]
    pub notes_list: DocId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tiles {
    #[serde(
        rename = "placeholderNote",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub placeholder_note: Option<DocId>,
}

/// Ids of the schemas, definition and tiles a provisioning run published.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelAliases {
    pub definitions: Definitions,
    pub schemas: Schemas,
    #[serde(default)]
    pub tiles: Tiles,
}

impl ModelAliases {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(NotesError::Config(format!(
                "No model aliases at {} (run `notenet provision` first)",
                path.display()
            )));
        }
        let content = fs::read_to_string(path).map_err(NotesError::Io)?;
        serde_json::from_str(&content).map_err(NotesError::Serialization)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(NotesError::Io)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(NotesError::Serialization)?;
        fs::write(path, content).map_err(NotesError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn aliases() -> ModelAliases {
        ModelAliases {
            definitions: Definitions {
                notes: "def".parse().unwrap(),
            },
            schemas: Schemas {
                note: "note".parse().unwrap(),
                notes_list: "list".parse().unwrap(),
            },
            tiles: Tiles::default(),
        }
    }

    #[test]
    fn test_default_config() {
        let config = NotenetConfig::default();
        assert_eq!(config.placeholder_text, "Note contents...");
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempdir().unwrap();
        let config = NotenetConfig::load(dir.path()).unwrap();
        assert_eq!(config, NotenetConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let mut config = NotenetConfig::default();
        config.set("placeholder-text", "Write here").unwrap();
        config.save(dir.path()).unwrap();

        let loaded = NotenetConfig::load(dir.path()).unwrap();
        assert_eq!(loaded.placeholder_text, "Write here");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), r#"{"log_filter":"debug"}"#).unwrap();
        let config = NotenetConfig::load(dir.path()).unwrap();
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.placeholder_text, DEFAULT_PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_set_rejects_unknown_key() {
        let mut config = NotenetConfig::default();
        assert!(config.set("colour", "blue").is_err());
        assert_eq!(config.get("colour"), None);
    }

    #[test]
    fn test_set_rejects_bad_filter() {
        let mut config = NotenetConfig::default();
        assert!(config.set("log-filter", "[[[").is_err());
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_aliases_use_network_key_names() {
        let json = serde_json::to_value(aliases()).unwrap();
        assert_eq!(json["definitions"]["notes"], "ceramic://def");
        assert_eq!(json["schemas"]["Note"], "ceramic://note");
        assert_eq!(json["schemas"]["NotesList"], "ceramic://list");
        assert!(json["tiles"].get("placeholderNote").is_none());
    }

    #[test]
    fn test_aliases_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MODEL_FILENAME);
        aliases().save(&path).unwrap();
        assert_eq!(ModelAliases::load(&path).unwrap(), aliases());
    }

    #[test]
    fn test_missing_aliases_is_config_error() {
        let dir = tempdir().unwrap();
        let err = ModelAliases::load(dir.path().join(MODEL_FILENAME)).unwrap_err();
        assert!(matches!(err, NotesError::Config(_)));
    }
}
