//! Life-data import pipeline.
//!
//! Turns raw export files into canonical [`TimelineEvent`](crate::model::TimelineEvent)s:
//!
//! - **Parsers**: LinkedIn, Google Takeout, Facebook, generic CSV, iCalendar
//! - **Date resolution**: epoch fields, date strings, file and folder names
//! - **Geo resolution**: first usable coordinate block, `(0, 0)` ignored
//! - **Classification**: record → layer, event type, title
//! - **Orchestration**: one [`ImportReport`](crate::model::ImportReport) per run,
//!   with non-fatal errors collected instead of raised
//!
//! # Example
//!
//! ```ignore
//! use lifeline::import::{ImportOptions, ImportSource, Importer, RawFile};
//!
//! let files = vec![RawFile::from_text("Positions.csv", csv_text)];
//! let report = Importer::new(ImportOptions::default()).import(ImportSource::LinkedIn, &files);
//! println!("{} events, {} errors", report.events.len(), report.errors.len());
//! ```

pub mod classify;
pub mod csv;
pub mod date;
mod file;
pub mod geo;
mod hash;
mod orchestrator;
pub mod parsers;
pub mod record;
mod sink;
mod types;

pub use file::{LoadedInput, atomic_write, load_files, read_jsonl, write_jsonl};
pub use hash::{content_hash, fingerprint};
pub use orchestrator::Importer;
pub use parsers::{FieldMapping, SourceParser};
pub use sink::{EventSink, JsonlSink};
pub use types::{
    AbortSignal, ImportFailure, ImportOptions, ImportResult, ImportSource, RawFile,
    PHOTO_EXTENSIONS, VIDEO_EXTENSIONS, extension_of, is_media_extension, is_video_extension,
};
