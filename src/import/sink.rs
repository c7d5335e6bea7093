//! Event sinks: where an import's accepted events end up.

use std::path::PathBuf;

use crate::error::Result;
use crate::model::TimelineEvent;

use super::file::write_jsonl;

/// Destination for imported events.
pub trait EventSink {
    /// Store a batch and return the events as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch cannot be written. Nothing from a
    /// failed batch is kept.
    fn add_batch(&mut self, events: Vec<TimelineEvent>) -> Result<Vec<TimelineEvent>>;
}

/// Writes events to a JSONL file.
///
/// Each batch rewrites the whole file atomically with everything added so far.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    events: Vec<TimelineEvent>,
}

impl JsonlSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            events: Vec::new(),
        }
    }

    /// Number of events written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for JsonlSink {
    fn add_batch(&mut self, events: Vec<TimelineEvent>) -> Result<Vec<TimelineEvent>> {
        let mut all = self.events.clone();
        all.extend(events.iter().cloned());
        write_jsonl(&self.path, &all)?;
        self.events = all;
        Ok(events)
    }
}
