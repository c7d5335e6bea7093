//! Generic CSV parser.
//!
//! Columns are mapped to event fields either explicitly by the caller or by
//! matching header names against known synonyms. Columns that map to no
//! field are kept in the event metadata under their header name.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::import::classify::classify;
use crate::import::csv::{self, CsvRow, CsvTable};
use crate::import::date::{DateSignal, parse_epoch_str, parse_text, resolve};
use crate::import::geo::{GeoBlock, resolve_location};
use crate::import::hash::content_hash;
use crate::import::record::{CsvRecord, RawRecord};
use crate::import::types::{ImportFailure, ImportResult, ImportSource, RawFile};

use super::{ParseContext, SourceParser, build_event};

/// Event field → CSV header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub layer: Option<String>,
    pub event_type: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub location: Option<String>,
    pub id: Option<String>,
}

/// Field names accepted by [`FieldMapping::set`].
pub const MAPPABLE_FIELDS: &[&str] = &[
    "title",
    "description",
    "startDate",
    "endDate",
    "layer",
    "eventType",
    "latitude",
    "longitude",
    "location",
    "id",
];

/// Header synonyms per field, in normalized form.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("title", &["title", "name", "event", "summary", "subject", "event_name"]),
    ("description", &["description", "notes", "note", "details", "body", "comment"]),
    (
        "startDate",
        &["start_date", "startdate", "date", "start", "started", "started_on", "timestamp", "when"],
    ),
    ("endDate", &["end_date", "enddate", "end", "finished", "finished_on"]),
    ("layer", &["layer", "category", "domain"]),
    ("eventType", &["event_type", "eventtype", "type", "kind"]),
    ("latitude", &["latitude", "lat"]),
    ("longitude", &["longitude", "lon", "lng", "long"]),
    ("location", &["location", "place", "venue", "address"]),
    ("id", &["id", "uid", "source_id", "sourceid"]),
];

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

impl FieldMapping {
    /// Detect a mapping from header names. The first matching header wins
    /// for each field.
    #[must_use]
    pub fn detect(headers: &[String]) -> Self {
        let mut mapping = Self::default();
        for (field, synonyms) in SYNONYMS {
            let found = synonyms.iter().find_map(|synonym| {
                headers
                    .iter()
                    .find(|header| normalize_header(header) == *synonym)
            });
            if let (Some(header), Some(slot)) = (found, mapping.slot_mut(field)) {
                *slot = Some(header.clone());
            }
        }
        mapping
    }

    /// Map `field` to `column`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the accepted fields when `field` is unknown.
    pub fn set(&mut self, field: &str, column: &str) -> Result<(), String> {
        let column = column.trim();
        if column.is_empty() {
            return Err(format!("Empty column name for field '{field}'"));
        }
        let slot = self.slot_mut(field).ok_or_else(|| {
            format!(
                "Unknown field '{field}'. Expected one of: {}",
                MAPPABLE_FIELDS.join(", ")
            )
        })?;
        *slot = Some(column.to_string());
        Ok(())
    }

    /// Parse `field=Column` and apply it.
    ///
    /// # Errors
    ///
    /// Returns an error for a malformed assignment or an unknown field.
    pub fn apply(&mut self, assignment: &str) -> Result<(), String> {
        let (field, column) = assignment
            .split_once('=')
            .ok_or_else(|| format!("Invalid mapping '{assignment}', expected field=Column"))?;
        self.set(field.trim(), column)
    }

    /// Fields set in `self` replace those in `base`.
    #[must_use]
    pub fn over(&self, base: &Self) -> Self {
        let pick = |a: &Option<String>, b: &Option<String>| a.clone().or_else(|| b.clone());
        Self {
            title: pick(&self.title, &base.title),
            description: pick(&self.description, &base.description),
            start_date: pick(&self.start_date, &base.start_date),
            end_date: pick(&self.end_date, &base.end_date),
            layer: pick(&self.layer, &base.layer),
            event_type: pick(&self.event_type, &base.event_type),
            latitude: pick(&self.latitude, &base.latitude),
            longitude: pick(&self.longitude, &base.longitude),
            location: pick(&self.location, &base.location),
            id: pick(&self.id, &base.id),
        }
    }

    /// All mapped columns.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        [
            &self.title,
            &self.description,
            &self.start_date,
            &self.end_date,
            &self.layer,
            &self.event_type,
            &self.latitude,
            &self.longitude,
            &self.location,
            &self.id,
        ]
        .into_iter()
        .filter_map(|column| column.as_deref())
    }

    fn slot_mut(&mut self, field: &str) -> Option<&mut Option<String>> {
        let field = field.trim().to_lowercase().replace(['_', '-', ' '], "");
        Some(match field.as_str() {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "startdate" | "start" | "date" => &mut self.start_date,
            "enddate" | "end" => &mut self.end_date,
            "layer" => &mut self.layer,
            "eventtype" | "type" => &mut self.event_type,
            "latitude" | "lat" => &mut self.latitude,
            "longitude" | "lon" | "lng" => &mut self.longitude,
            "location" | "place" => &mut self.location,
            "id" | "sourceid" => &mut self.id,
            _ => return None,
        })
    }
}

/// Generic CSV parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvParser;

impl SourceParser for CsvParser {
    fn source(&self) -> ImportSource {
        ImportSource::Csv
    }

    fn parse(&self, files: &[RawFile], ctx: &mut ParseContext<'_>) -> ImportResult<()> {
        for file in files {
            if ctx.is_aborted() {
                break;
            }
            if file.extension().as_deref() != Some("csv") {
                continue;
            }

            let table = csv::parse_table(&file.text());
            ctx.file_processed();
            let mapping = resolve_mapping(&table, ctx.options.mapping.as_ref(), file)?;
            debug!(file = %file.path, rows = table.rows.len(), ?mapping, "Parsing CSV");

            if table.rows.is_empty() {
                continue;
            }
            if mapping.title.is_none() || mapping.start_date.is_none() {
                ctx.skip(
                    format!("Skipped {}: no title or date column", file.name()),
                    &file.path,
                );
                continue;
            }

            for (line, row) in table.records().iter().enumerate() {
                parse_row(row, line + 2, &mapping, file, ctx);
            }
        }
        Ok(())
    }
}

/// Merge an explicit mapping over the detected one.
///
/// Every explicitly named column must exist in the file.
fn resolve_mapping(
    table: &CsvTable,
    explicit: Option<&FieldMapping>,
    file: &RawFile,
) -> ImportResult<FieldMapping> {
    let detected = FieldMapping::detect(&table.headers);
    let Some(explicit) = explicit else {
        return Ok(detected);
    };

    let mut resolved = explicit.clone();
    for slot in [
        &mut resolved.title,
        &mut resolved.description,
        &mut resolved.start_date,
        &mut resolved.end_date,
        &mut resolved.layer,
        &mut resolved.event_type,
        &mut resolved.latitude,
        &mut resolved.longitude,
        &mut resolved.location,
        &mut resolved.id,
    ] {
        if let Some(column) = slot.as_deref() {
            let header = table.find_header(column).ok_or_else(|| ImportFailure::MissingColumn {
                file: file.path.clone(),
                column: column.to_string(),
            })?;
            *slot = Some(header.to_string());
        }
    }
    Ok(resolved.over(&detected))
}

fn cell<'r>(row: &'r CsvRow, column: Option<&String>) -> Option<&'r str> {
    column
        .and_then(|column| row.get(column))
        .map(String::as_str)
        .filter(|value| !value.is_empty())
}

fn parse_row(row: &CsvRow, line: usize, mapping: &FieldMapping, file: &RawFile, ctx: &mut ParseContext<'_>) {
    let record = CsvRecord {
        title: cell(row, mapping.title.as_ref()).unwrap_or_default().to_string(),
        description: cell(row, mapping.description.as_ref()).map(String::from),
        layer: cell(row, mapping.layer.as_ref()).map(String::from),
        event_type: cell(row, mapping.event_type.as_ref()).map(String::from),
    };

    let Some(classification) = classify(&RawRecord::Csv(record), None, ctx.defaults()) else {
        ctx.skip(format!("Skipped row {line}: missing title"), &file.path);
        return;
    };
    let start_text = cell(row, mapping.start_date.as_ref()).unwrap_or_default();
    let Some(start) = resolve(&[DateSignal::Text(start_text), DateSignal::EpochText(start_text)]) else {
        ctx.skip(
            format!("Skipped row {line} \"{}\": missing date", classification.title),
            &file.path,
        );
        return;
    };
    let end = cell(row, mapping.end_date.as_ref())
        .and_then(|text| parse_text(text).or_else(|| parse_epoch_str(text)));

    let geo = GeoBlock {
        latitude: cell(row, mapping.latitude.as_ref()).and_then(|v| v.parse().ok()),
        longitude: cell(row, mapping.longitude.as_ref()).and_then(|v| v.parse().ok()),
        altitude: None,
    };
    let place = cell(row, mapping.location.as_ref()).map(String::from);
    let location = resolve_location(&[Some(&geo)]).map(|location| location.with_name(place.clone()));

    let source_id = match cell(row, mapping.id.as_ref()) {
        Some(id) => id.to_string(),
        None => format!("row:{}", &content_hash(row)[..16]),
    };

    let mut event = build_event(classification, &start, ctx.options.csv_source)
        .with_end_date(end)
        .with_source_id(source_id)
        .with_metadata("file", file.path.clone());
    if location.is_none() {
        event = event.with_metadata("place", place);
    }
    event = event.with_location(location);

    let mapped: Vec<&str> = mapping.columns().collect();
    for (header, value) in row {
        if !value.is_empty() && !mapped.contains(&header.as_str()) {
            event = event.with_metadata(header, Value::String(value.clone()));
        }
    }
    ctx.push(event);
}
