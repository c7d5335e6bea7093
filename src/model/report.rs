//! Import report types.
//!
//! Every import call returns one `ImportReport`, even when a parser fails
//! halfway through: errors are collected, never propagated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::event::{Layer, TimelineEvent};

/// A problem encountered while importing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    pub message: String,
    /// Path of the file the problem relates to, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// True when the failure aborted the parser for the rest of the batch.
    #[serde(default)]
    pub fatal: bool,
}

impl ImportError {
    /// A record-level problem; the batch continues.
    pub fn skipped(message: impl Into<String>, file: Option<&str>) -> Self {
        Self {
            message: message.into(),
            file: file.map(String::from),
            fatal: false,
        }
    }

    /// A parser-level failure; results gathered so far are kept.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            fatal: true,
        }
    }
}

/// Statistics for an import operation.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStats {
    /// Number of files handed to the importer.
    pub total_files: usize,
    /// Number of files a parser recognised and read.
    pub processed_files: usize,
    /// Number of accepted events.
    pub total_events: usize,
    /// Accepted events per layer.
    pub events_by_layer: BTreeMap<Layer, usize>,
    /// Number of records dropped.
    pub skipped: usize,
}

impl ImportStats {
    /// Recompute the event counters from the final event list.
    pub fn count_events(&mut self, events: &[TimelineEvent]) {
        self.total_events = events.len();
        self.events_by_layer.clear();
        for event in events {
            *self.events_by_layer.entry(event.layer).or_insert(0) += 1;
        }
    }
}

/// Result of one import run.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub events: Vec<TimelineEvent>,
    pub errors: Vec<ImportError>,
    pub stats: ImportStats,
    /// Set when the run stopped early on an abort request.
    #[serde(default)]
    pub cancelled: bool,
}

impl ImportReport {
    /// Number of fatal errors in the report.
    #[must_use]
    pub fn fatal_errors(&self) -> usize {
        self.errors.iter().filter(|e| e.fatal).count()
    }

    /// Returns true if nothing was imported and nothing went wrong.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.errors.is_empty()
    }
}
