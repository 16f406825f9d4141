//! Placeholder configuration mapping
//!
//! The parser resolves `${a.b.c}` placeholders against a [`ConfigMap`] by
//! walking the dotted path one segment at a time. Tables are addressed by
//! key, arrays by decimal index.

use crate::logging::codes::{self, Code};
use serde_json::{Map, Value as JsonValue};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid TOML configuration: {0}")]
    Toml(String),

    #[error("Invalid JSON configuration: {0}")]
    Json(String),

    #[error("Configuration root must be a table, found {found}")]
    NotATable { found: String },

    #[error("Configuration value '{key}' = {value} is outside the allowed range {limit}")]
    OutOfRange {
        key: String,
        value: String,
        limit: String,
    },

    #[error("Cannot read configuration file '{path}': {message}")]
    Io { path: String, message: String },
}

impl ConfigError {
    pub fn error_code(&self) -> Code {
        match self {
            Self::Toml(_) | Self::Json(_) => codes::config::CONFIG_PARSE_ERROR,
            Self::NotATable { .. } => codes::config::CONFIG_ROOT_NOT_TABLE,
            Self::OutOfRange { .. } => codes::config::CONFIG_VALUE_OUT_OF_RANGE,
            Self::Io { .. } => codes::config::CONFIG_IO_ERROR,
        }
    }
}

/// Arbitrary-depth key/value tree used for placeholder substitution
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigMap {
    root: JsonValue,
}

impl Default for ConfigMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigMap {
    pub fn new() -> Self {
        Self {
            root: JsonValue::Object(Map::new()),
        }
    }

    pub fn from_value(root: JsonValue) -> Result<Self, ConfigError> {
        match root {
            JsonValue::Object(_) => Ok(Self { root }),
            other => Err(ConfigError::NotATable {
                found: json_kind(&other).to_string(),
            }),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(text).map_err(|e| ConfigError::Toml(e.to_string()))?;
        let root = serde_json::to_value(table).map_err(|e| ConfigError::Toml(e.to_string()))?;
        Self::from_value(root)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let root: JsonValue =
            serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))?;
        Self::from_value(root)
    }

    /// Load a `.json` file as JSON and anything else as TOML
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }

    /// Walk a dotted path (`db.primary.host`)
    pub fn lookup(&self, path: &str) -> Option<&JsonValue> {
        let segments: Vec<&str> = path.split('.').collect();
        self.lookup_segments(&segments)
    }

    pub fn lookup_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<&JsonValue> {
        let mut current = &self.root;
        for segment in segments {
            let segment = segment.as_ref();
            current = match current {
                JsonValue::Object(map) => map.get(segment)?,
                JsonValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Set a value at a dotted path, creating intermediate tables.
    /// Scalars found on the way are replaced by tables.
    pub fn insert(&mut self, path: &str, value: JsonValue) {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            if !current.is_object() {
                *current = JsonValue::Object(Map::new());
            }
            current = match current {
                JsonValue::Object(map) => map
                    .entry(segment.to_string())
                    .or_insert_with(|| JsonValue::Object(Map::new())),
                _ => return,
            };
        }

        if !current.is_object() {
            *current = JsonValue::Object(Map::new());
        }
        if let JsonValue::Object(map) = current {
            map.insert(last.to_string(), value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root.as_object().map(|m| m.is_empty()).unwrap_or(true)
    }

    pub fn as_json(&self) -> &JsonValue {
        &self.root
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_lookup_nested_toml() {
        let config = ConfigMap::from_toml_str(
            r#"
            [db]
            host = "localhost"
            port = 5432

            [[servers]]
            name = "alpha"
            "#,
        )
        .unwrap();

        assert_eq!(config.lookup("db.host"), Some(&json!("localhost")));
        assert_eq!(config.lookup("db.port"), Some(&json!(5432)));
        assert_eq!(config.lookup("servers.0.name"), Some(&json!("alpha")));
        assert_eq!(config.lookup("db.missing"), None);
        assert_eq!(config.lookup("db.host.deeper"), None);
    }

    #[test]
    fn test_json_root_must_be_object() {
        assert_matches!(
            ConfigMap::from_json_str("[1, 2]"),
            Err(ConfigError::NotATable { ref found }) if found == "array"
        );
    }

    #[test]
    fn test_insert_creates_tables() {
        let mut config = ConfigMap::new();
        assert!(config.is_empty());

        config.insert("app.cache.dir", json!("/tmp/cache"));
        config.insert("app.name", json!("shop"));

        assert_eq!(config.lookup("app.cache.dir"), Some(&json!("/tmp/cache")));
        assert_eq!(config.lookup("app.name"), Some(&json!("shop")));
        assert!(!config.is_empty());
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("settings.json");
        let toml_path = dir.path().join("settings.toml");
        std::fs::write(&json_path, r#"{"db": {"host": "json-host"}}"#).unwrap();
        std::fs::write(&toml_path, "[db]\nhost = \"toml-host\"\n").unwrap();

        let from_json = ConfigMap::from_file(&json_path).unwrap();
        let from_toml = ConfigMap::from_file(&toml_path).unwrap();
        assert_eq!(from_json.lookup("db.host"), Some(&json!("json-host")));
        assert_eq!(from_toml.lookup("db.host"), Some(&json!("toml-host")));

        assert_matches!(
            ConfigMap::from_file(&dir.path().join("absent.toml")),
            Err(ConfigError::Io { .. })
        );
    }
}
