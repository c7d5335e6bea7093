//! Configuration management.
//!
//! This module resolves the database path and the import defaults that the
//! CLI falls back on when a flag is not given.
//!
//! # Layout
//!
//! - **Config**: `~/.lifeline/config.json` (optional; a missing file means defaults)
//! - **Database**: `~/.lifeline/data/lifeline.db` unless overridden

use crate::error::{Error, Result};
use crate::model::Layer;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent user configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Owner applied to imported events when `--user` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_user_id: Option<String>,

    /// Layer for CSV rows and calendar entries that don't name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_layer: Option<Layer>,

    /// Event type for CSV rows that don't name one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_event_type: Option<String>,

    /// Database location overriding the global default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl Config {
    /// Load the config from `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Load the config from the global location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid.
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Write the config to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Get the global Lifeline directory location (`~/.lifeline/`).
#[must_use]
pub fn global_lifeline_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".lifeline"))
}

/// Path of the global config file.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    global_lifeline_dir().map(|dir| dir.join("config.json"))
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `LIFELINE_DB` environment variable
/// 3. `db_path` from the config file
/// 4. Global location: `~/.lifeline/data/lifeline.db`
///
/// # Returns
///
/// Returns the path to the database file, or `None` if no location found.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>, config: &Config) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Some(db_path) = env_value("LIFELINE_DB") {
        return Some(PathBuf::from(db_path));
    }

    if let Some(path) = &config.db_path {
        return Some(path.clone());
    }

    global_lifeline_dir().map(|dir| dir.join("data").join("lifeline.db"))
}

/// Resolve the user id applied to imported events.
///
/// Priority:
/// 1. Explicit `--user` flag
/// 2. `LIFELINE_USER` environment variable
/// 3. `default_user_id` from the config file
#[must_use]
pub fn resolve_user_id(explicit_user: Option<&str>, config: &Config) -> Option<String> {
    if let Some(user) = explicit_user {
        return Some(user.to_string());
    }
    env_value("LIFELINE_USER").or_else(|| config.default_user_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_db_path_with_explicit() {
        let explicit = PathBuf::from("/custom/path/db.sqlite");
        let config = Config {
            db_path: Some(PathBuf::from("/from/config.db")),
            ..Config::default()
        };
        let result = resolve_db_path(Some(&explicit), &config);
        assert_eq!(result, Some(explicit));
    }

    #[test]
    fn test_resolve_db_path_default_location() {
        if std::env::var("LIFELINE_DB").is_ok() {
            return;
        }
        let path = resolve_db_path(None, &Config::default()).unwrap();
        assert!(path.ends_with("data/lifeline.db"));
    }

    #[test]
    fn test_resolve_db_path_from_config() {
        if std::env::var("LIFELINE_DB").is_ok() {
            return;
        }
        let config = Config {
            db_path: Some(PathBuf::from("/from/config.db")),
            ..Config::default()
        };
        assert_eq!(
            resolve_db_path(None, &config),
            Some(PathBuf::from("/from/config.db"))
        );
    }

    #[test]
    fn test_resolve_user_id_prefers_flag() {
        let config = Config {
            default_user_id: Some("from_config".into()),
            ..Config::default()
        };
        assert_eq!(
            resolve_user_id(Some("flag_user"), &config).as_deref(),
            Some("flag_user")
        );
    }

    #[test]
    fn test_config_roundtrip_and_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/config.json");

        assert_eq!(Config::load_from(&path).unwrap(), Config::default());

        let config = Config {
            default_user_id: Some("u1".into()),
            default_layer: Some(Layer::Travel),
            default_event_type: Some("memory".into()),
            db_path: None,
        };
        config.save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"travel\""));
        assert!(!raw.contains("db_path"));
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_config_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert_eq!(err.exit_code(), 7);
    }
}
