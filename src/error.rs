//! Error types for the Lifeline CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers
//!
//! Record-level import problems never surface here: they are collected in the
//! [`ImportReport`](crate::model::ImportReport). Only failures of the command
//! itself become an `Error`.

use thiserror::Error;

use crate::import::ImportFailure;

/// Result type alias for Lifeline operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or on the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    DatabaseError,

    // Not Found (exit 3)
    EventNotFound,
    InputNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidMapping,

    // Import (exit 6)
    ImportFailed,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::EventNotFound => "EVENT_NOT_FOUND",
            Self::InputNotFound => "INPUT_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidMapping => "INVALID_MAPPING",
            Self::ImportFailed => "IMPORT_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::DatabaseError => 2,
            Self::EventNotFound | Self::InputNotFound => 3,
            Self::InvalidArgument | Self::InvalidMapping => 4,
            Self::ImportFailed => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying with corrected input can succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument | Self::InvalidMapping | Self::InputNotFound | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in Lifeline CLI operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Event not found: {id}")]
    EventNotFound { id: String },

    #[error("Invalid mapping '{assignment}': {reason}")]
    InvalidMapping { assignment: String, reason: String },

    #[error("Import failed: {fatal} fatal error(s), first: {first}")]
    ImportFailed { fatal: usize, first: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Import error: {0}")]
    Import(#[from] ImportFailure),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::EventNotFound { .. } => ErrorCode::EventNotFound,
            Self::Import(ImportFailure::NotFound(_)) => ErrorCode::InputNotFound,
            Self::InvalidMapping { .. } | Self::Import(ImportFailure::MissingColumn { .. }) => {
                ErrorCode::InvalidMapping
            }
            Self::ImportFailed { .. } => ErrorCode::ImportFailed,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Io(_) | Self::Import(ImportFailure::Io(_)) => ErrorCode::IoError,
            Self::Json(_) | Self::Import(ImportFailure::Json(_)) => ErrorCode::JsonError,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::EventNotFound { id } => Some(format!(
                "No event with ID '{id}'. Use `lifeline events` to see stored events."
            )),

            Self::Import(ImportFailure::NotFound(path)) => Some(format!(
                "Check that '{path}' exists. Pass the unzipped export folder or individual files."
            )),

            Self::InvalidMapping { .. } => Some(format!(
                "Use --map field=Column. Fields: {}",
                crate::import::parsers::generic_csv::MAPPABLE_FIELDS.join(", ")
            )),
            Self::Import(ImportFailure::MissingColumn { .. }) => Some(
                "Column names are matched case-insensitively. Check the CSV header row.".to_string(),
            ),

            Self::ImportFailed { .. } => Some(
                "Events gathered before the failure were kept. Rerun with -v for details."
                    .to_string(),
            ),

            Self::InvalidArgument(msg) => {
                if msg.contains("layer") {
                    Some(
                        "Valid layers: economics, education, work, health, relationships, travel, media"
                            .to_string(),
                    )
                } else if msg.contains("source") {
                    Some("Valid sources: auto, linkedin, google, facebook, csv, ical".to_string())
                } else {
                    None
                }
            }

            Self::Config(_) => Some("Check ~/.lifeline/config.json for invalid JSON".to_string()),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Import(ImportFailure::Io(_) | ImportFailure::Json(_))
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_failures_map_to_codes() {
        let missing = Error::from(ImportFailure::MissingColumn {
            file: "a.csv".into(),
            column: "Headline".into(),
        });
        assert_eq!(missing.error_code(), ErrorCode::InvalidMapping);
        assert_eq!(missing.exit_code(), 4);

        let not_found = Error::from(ImportFailure::NotFound("/x".into()));
        assert_eq!(not_found.exit_code(), 3);
        assert!(not_found.hint().is_some());
    }

    #[test]
    fn test_structured_json() {
        let err = Error::InvalidArgument("unknown layer: hobbies".into());
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "INVALID_ARGUMENT");
        assert_eq!(json["error"]["exit_code"], 4);
        assert_eq!(json["error"]["retryable"], true);
        assert!(json["error"]["hint"].as_str().unwrap().contains("relationships"));
    }

    #[test]
    fn test_import_failed_exit_code() {
        let err = Error::ImportFailed {
            fatal: 1,
            first: "Column 'X' not found in a.csv".into(),
        };
        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("Column 'X'"));
    }
}
