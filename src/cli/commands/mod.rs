//! Command implementations.

pub mod completions;
pub mod events;
pub mod import;
pub mod stats;
pub mod version;

use crate::config::{resolve_db_path, Config};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use std::path::PathBuf;
use tracing::debug;

/// Resolve the database path and open it, creating the file if needed.
pub(crate) fn open_storage(db_path: Option<&PathBuf>, config: &Config) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path()), config)
        .ok_or_else(|| Error::Config("Could not determine a database location".to_string()))?;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    debug!(path = %db_path.display(), "Opening database");
    SqliteStorage::open(&db_path)
}

/// Truncate a string for table display.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
