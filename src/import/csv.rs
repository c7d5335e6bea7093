//! CSV tokenizer for export files.
//!
//! Wraps the `csv` reader for what LinkedIn and spreadsheet exports produce:
//! comma delimiters, double-quoted fields with embedded commas and newlines,
//! `""` escapes, and `\n` / `\r\n` / `\r` line endings. Every field is
//! trimmed, rows may be ragged, and blank lines are skipped. There is no
//! delimiter detection.

use std::collections::BTreeMap;

use ::csv::{ReaderBuilder, Trim};
use tracing::debug;

/// One data row keyed by header.
pub type CsvRow = BTreeMap<String, String>;

/// Header plus data records of a CSV document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Rows as header→value maps. Short rows are padded with empty values;
    /// surplus fields are dropped.
    #[must_use]
    pub fn records(&self) -> Vec<CsvRow> {
        self.rows
            .iter()
            .map(|fields| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| (header.clone(), fields.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn find_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }
}

/// Parse CSV text into header→value rows.
///
/// Empty input and header-only input both yield no rows.
#[must_use]
pub fn parse(text: &str) -> Vec<CsvRow> {
    parse_table(text).records()
}

/// Parse CSV text, taking the first record as the header.
#[must_use]
pub fn parse_table(text: &str) -> CsvTable {
    parse_table_from(text, |_| true)
}

/// Parse CSV text, skipping records until one satisfies `is_header`.
///
/// Used for exports that put free-text notes above the real header.
/// Returns an empty table when no record qualifies.
#[must_use]
pub fn parse_table_from(text: &str, is_header: impl Fn(&[String]) -> bool) -> CsvTable {
    let mut records = tokenize(text).into_iter();

    for record in records.by_ref() {
        if is_header(&record) {
            return CsvTable {
                headers: record,
                rows: records.collect(),
            };
        }
    }

    CsvTable::default()
}

/// Split CSV text into records of trimmed fields.
///
/// Records whose fields are all empty are dropped. A record the reader
/// cannot decode is logged and skipped.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => {
                let fields: Vec<String> = record.iter().map(String::from).collect();
                if fields.iter().any(|f| !f.is_empty()) {
                    records.push(fields);
                }
            }
            Err(e) => debug!(error = %e, "Skipped undecodable CSV record"),
        }
    }
    records
}
