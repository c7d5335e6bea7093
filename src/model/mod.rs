//! Data models for Lifeline.
//!
//! This module contains the canonical output of the import pipeline:
//! - TimelineEvent (with Layer, Source, Location, MediaAttachment)
//! - ImportReport (with ImportError, ImportStats)

pub mod event;
pub mod report;

pub use event::{Layer, Location, MediaAttachment, MediaKind, Source, TimelineEvent};
pub use report::{ImportError, ImportReport, ImportStats};
