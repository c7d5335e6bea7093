//! LinkedIn data export parser.
//!
//! Reads `Positions.csv`, `Education.csv` and `Connections.csv` (matched
//! case-insensitively, anywhere in the tree). Other files are ignored.

use tracing::debug;

use crate::import::classify::classify;
use crate::import::csv::{self, CsvRow, CsvTable};
use crate::import::date::{DateSignal, parse_text, resolve};
use crate::import::record::{ConnectionRecord, EducationRecord, PositionRecord, RawRecord};
use crate::import::types::{ImportResult, ImportSource, RawFile};
use crate::model::Source;

use super::{ParseContext, SourceParser, build_event, column, record_id};

/// LinkedIn CSV export parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedInParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFile {
    Positions,
    Education,
    Connections,
}

impl ExportFile {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "positions.csv" => Some(Self::Positions),
            "education.csv" => Some(Self::Education),
            "connections.csv" => Some(Self::Connections),
            _ => None,
        }
    }

    /// `Connections.csv` starts with a free-text notes block.
    fn table(self, text: &str) -> CsvTable {
        match self {
            Self::Connections => csv::parse_table_from(text, |fields| {
                fields.iter().any(|f| f.eq_ignore_ascii_case("First Name"))
            }),
            Self::Positions | Self::Education => csv::parse_table(text),
        }
    }
}

impl SourceParser for LinkedInParser {
    fn source(&self) -> ImportSource {
        ImportSource::LinkedIn
    }

    fn parse(&self, files: &[RawFile], ctx: &mut ParseContext<'_>) -> ImportResult<()> {
        for file in files {
            if ctx.is_aborted() {
                break;
            }
            let Some(kind) = ExportFile::from_name(file.name()) else {
                continue;
            };

            let table = kind.table(&file.text());
            ctx.file_processed();
            debug!(file = %file.path, rows = table.rows.len(), "Parsing LinkedIn export");

            for row in table.records() {
                match kind {
                    ExportFile::Positions => parse_position(&row, &file.path, ctx),
                    ExportFile::Education => parse_education(&row, &file.path, ctx),
                    ExportFile::Connections => parse_connection(&row, &file.path, ctx),
                }
            }
        }
        Ok(())
    }
}

fn text(row: &CsvRow, names: &[&str]) -> String {
    column(row, names).unwrap_or_default().to_string()
}

fn parse_position(row: &CsvRow, path: &str, ctx: &mut ParseContext<'_>) {
    let record = PositionRecord {
        company: text(row, &["Company Name", "Company"]),
        title: text(row, &["Title"]),
        description: text(row, &["Description"]),
        location: text(row, &["Location"]),
    };
    let started = column(row, &["Started On", "Start Date"]);
    let finished = column(row, &["Finished On", "End Date"]);

    let Some(classification) = classify(&RawRecord::LinkedInPosition(record.clone()), None, ctx.defaults())
    else {
        ctx.skip("Skipped position: missing company name", path);
        return;
    };
    let Some(start) = resolve(&[DateSignal::Text(started.unwrap_or_default())]) else {
        ctx.skip(
            format!("Skipped position at {}: missing start date", record.company),
            path,
        );
        return;
    };

    let source_id = record_id(
        "position",
        &[&record.company, &record.title, started.unwrap_or_default()],
    );
    let event = build_event(classification, &start, Source::Linkedin)
        .with_end_date(finished.and_then(parse_text))
        .with_source_id(source_id)
        .with_metadata("company", record.company)
        .with_metadata("location", non_blank(record.location));
    ctx.push(event);
}

fn parse_education(row: &CsvRow, path: &str, ctx: &mut ParseContext<'_>) {
    let record = EducationRecord {
        school: text(row, &["School Name", "School"]),
        degree: text(row, &["Degree Name", "Degree"]),
        notes: text(row, &["Notes"]),
        activities: text(row, &["Activities"]),
    };
    let started = column(row, &["Start Date", "Started On"]);
    let finished = column(row, &["End Date", "Finished On"]);

    let Some(classification) = classify(&RawRecord::LinkedInEducation(record.clone()), None, ctx.defaults())
    else {
        ctx.skip("Skipped education: missing school name", path);
        return;
    };
    let Some(start) = resolve(&[DateSignal::Text(started.unwrap_or_default())]) else {
        ctx.skip(
            format!("Skipped education at {}: missing start date", record.school),
            path,
        );
        return;
    };

    let source_id = record_id(
        "education",
        &[&record.school, &record.degree, started.unwrap_or_default()],
    );
    let event = build_event(classification, &start, Source::Linkedin)
        .with_end_date(finished.and_then(parse_text))
        .with_source_id(source_id)
        .with_metadata("school", record.school)
        .with_metadata("activities", non_blank(record.activities));
    ctx.push(event);
}

fn parse_connection(row: &CsvRow, path: &str, ctx: &mut ParseContext<'_>) {
    let record = ConnectionRecord {
        first_name: text(row, &["First Name"]),
        last_name: text(row, &["Last Name"]),
        company: text(row, &["Company"]),
        position: text(row, &["Position"]),
    };
    let connected = column(row, &["Connected On"]);

    let Some(classification) =
        classify(&RawRecord::LinkedInConnection(record.clone()), None, ctx.defaults())
    else {
        ctx.skip("Skipped connection: missing first name", path);
        return;
    };
    let Some(start) = resolve(&[DateSignal::Text(connected.unwrap_or_default())]) else {
        ctx.skip(
            format!("Skipped connection with {}: missing date", record.first_name),
            path,
        );
        return;
    };

    let url = column(row, &["URL", "Profile URL"]);
    let source_id = match url {
        Some(url) => format!("connection:{url}"),
        None => record_id(
            "connection",
            &[&record.first_name, &record.last_name, connected.unwrap_or_default()],
        ),
    };
    let event = build_event(classification, &start, Source::Linkedin)
        .with_source_id(source_id)
        .with_metadata("profileUrl", url)
        .with_metadata("company", non_blank(record.company));
    ctx.push(event);
}

fn non_blank(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}
