//! Per-source parsers.
//!
//! Each parser reads its export layout into [`RawRecord`](super::record::RawRecord)s,
//! resolves dates and locations, classifies, and pushes canonical events into
//! a [`ParseContext`]. Bad records are skipped with a non-fatal error; only
//! a failure of the parser's own control flow is returned as `Err`.

pub mod facebook;
pub mod generic_csv;
pub mod google;
pub mod ical;
pub mod linkedin;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::model::{ImportError, ImportStats, Source, TimelineEvent};

use super::classify::{Classification, Defaults};
use super::date::ResolvedDate;
use super::hash::fingerprint;
use super::types::{ImportOptions, ImportResult, ImportSource, RawFile};

pub use facebook::FacebookParser;
pub use generic_csv::{CsvParser, FieldMapping};
pub use google::GoogleParser;
pub use ical::IcalParser;
pub use linkedin::LinkedInParser;

/// A parser for one export source.
pub trait SourceParser {
    /// Source this parser handles.
    fn source(&self) -> ImportSource;

    /// Parse a batch of files into `ctx`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the batch cannot continue. Events already
    /// pushed into `ctx` are kept by the caller.
    fn parse(&self, files: &[RawFile], ctx: &mut ParseContext<'_>) -> ImportResult<()>;
}

/// Get the parser for a source.
#[must_use]
pub fn parser_for(source: ImportSource) -> Box<dyn SourceParser> {
    match source {
        ImportSource::LinkedIn => Box::new(LinkedInParser),
        ImportSource::Google => Box::new(GoogleParser),
        ImportSource::Facebook => Box::new(FacebookParser),
        ImportSource::Csv => Box::new(CsvParser),
        ImportSource::Ical => Box::new(IcalParser),
    }
}

/// Per-call accumulator shared by all parsers.
#[derive(Debug)]
pub struct ParseContext<'a> {
    pub options: &'a ImportOptions,
    pub events: Vec<TimelineEvent>,
    pub errors: Vec<ImportError>,
    pub stats: ImportStats,
    occurrences: HashMap<String, usize>,
}

impl<'a> ParseContext<'a> {
    #[must_use]
    pub fn new(options: &'a ImportOptions) -> Self {
        Self {
            options,
            events: Vec::new(),
            errors: Vec::new(),
            stats: ImportStats::default(),
            occurrences: HashMap::new(),
        }
    }

    /// Whether the caller asked to stop.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.options.abort.is_aborted()
    }

    /// Classifier fallbacks from the import options.
    #[must_use]
    pub fn defaults(&self) -> Defaults<'a> {
        Defaults {
            layer: self.options.default_layer,
            event_type: &self.options.default_event_type,
        }
    }

    /// Count a file as recognised and read.
    pub fn file_processed(&mut self) {
        self.stats.processed_files += 1;
    }

    /// Record a dropped record.
    pub fn skip(&mut self, message: impl Into<String>, file: &str) {
        let message = message.into();
        debug!(file, reason = %message, "Skipped record");
        self.errors.push(ImportError::skipped(message, Some(file)));
        self.stats.skipped += 1;
    }

    /// Add an event. A source id already used in this batch (compared
    /// case-insensitively) gets a `#n` occurrence suffix, so duplicate rows
    /// and repeated file objects stay separate events.
    pub fn push(&mut self, mut event: TimelineEvent) {
        if let Some(source_id) = event.source_id.take() {
            let count = self.occurrences.entry(source_id.to_lowercase()).or_insert(0);
            *count += 1;
            event = if *count == 1 {
                event.with_source_id(source_id)
            } else {
                event.with_source_id(format!("{source_id}#{count}"))
            };
        }
        self.events.push(event);
    }
}

/// Build an event from a classification and a resolved start date.
///
/// The winning date signal is recorded under `dateSource`.
#[must_use]
pub fn build_event(classification: Classification, start: &ResolvedDate, source: Source) -> TimelineEvent {
    event_at(classification, start.value, source).with_metadata("dateSource", start.origin.as_str())
}

/// Build an event from a classification and a start date.
#[must_use]
pub fn event_at(classification: Classification, start: DateTime<Utc>, source: Source) -> TimelineEvent {
    let Classification {
        layer,
        event_type,
        title,
        description,
    } = classification;
    TimelineEvent::new(title, start, layer, event_type, source).with_description(description)
}

/// Deterministic source id for records without a native one.
#[must_use]
pub fn record_id(kind: &str, parts: &[&str]) -> String {
    format!("{kind}:{}", fingerprint(&parts.join("\u{1f}")))
}

/// Case-insensitive lookup of the first non-empty column among `names`.
#[must_use]
pub fn column<'r>(row: &'r super::csv::CsvRow, names: &[&str]) -> Option<&'r str> {
    names.iter().find_map(|name| {
        row.iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
    })
}
