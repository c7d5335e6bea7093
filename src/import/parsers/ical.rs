//! iCalendar (`.ics`) parser.
//!
//! Reads `VEVENT` blocks. Recurrence rules are kept in metadata, not
//! expanded. `TZID` parameters are ignored and local times are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::import::classify::classify;
use crate::import::date::parse_text;
use crate::import::geo::{parse_geo_pair, resolve_location};
use crate::import::record::{CalendarRecord, RawRecord};
use crate::import::types::{ImportResult, ImportSource, RawFile};
use crate::model::Source;

use super::{ParseContext, SourceParser, event_at, record_id};

/// iCalendar parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct IcalParser;

/// One content line: `NAME;PARAM=VALUE:value`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentLine {
    name: String,
    params: Vec<(String, String)>,
    value: String,
}

impl ContentLine {
    fn parse(line: &str) -> Option<Self> {
        let colon = value_separator(line)?;
        let (head, value) = (&line[..colon], &line[colon + 1..]);
        let mut parts = head.split(';');
        let name = parts.next()?.trim().to_uppercase();
        if name.is_empty() {
            return None;
        }
        let params = parts
            .filter_map(|param| param.split_once('='))
            .map(|(k, v)| (k.trim().to_uppercase(), v.trim_matches('"').to_string()))
            .collect();
        Some(Self {
            name,
            params,
            value: value.to_string(),
        })
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Index of the first `:` outside a quoted parameter value.
fn value_separator(line: &str) -> Option<usize> {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ':' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

/// Join folded lines (continuations start with a space or tab).
fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.lines() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match (raw.strip_prefix([' ', '\t']), lines.last_mut()) {
            (Some(rest), Some(previous)) => previous.push_str(rest),
            _ if raw.trim().is_empty() => {}
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Undo TEXT escaping (`\n`, `\,`, `\;`, `\\`).
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.trim().to_string()
}

/// Decode a `DATE` or `DATE-TIME` value. Returns the instant and whether it
/// was a whole-day date.
fn parse_ical_datetime(value: &str) -> Option<(DateTime<Utc>, bool)> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        return Some((Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?), true));
    }
    let naive = value.strip_suffix('Z').unwrap_or(value);
    if let Ok(datetime) = NaiveDateTime::parse_from_str(naive, "%Y%m%dT%H%M%S") {
        return Some((Utc.from_utc_datetime(&datetime), false));
    }
    parse_text(value).map(|datetime| (datetime, false))
}

/// Properties of one `VEVENT`.
#[derive(Debug, Default)]
struct VEvent {
    lines: Vec<ContentLine>,
}

impl VEvent {
    fn get(&self, name: &str) -> Option<&ContentLine> {
        self.lines.iter().find(|line| line.name == name)
    }

    fn text(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|line| unescape(&line.value))
            .filter(|value| !value.is_empty())
    }

    fn categories(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter(|line| line.name == "CATEGORIES")
            .flat_map(|line| line.value.split(','))
            .map(unescape)
            .filter(|c| !c.is_empty())
            .collect()
    }
}

/// Split a calendar into its events.
fn vevents(text: &str) -> Vec<VEvent> {
    let mut events = Vec::new();
    let mut current: Option<VEvent> = None;
    let mut nested = 0usize;

    for line in unfold(text).iter().filter_map(|line| ContentLine::parse(line)) {
        let name = line.name.clone();
        let component = line.value.trim().to_uppercase();
        match (name.as_str(), component.as_str()) {
            ("BEGIN", "VEVENT") => current = Some(VEvent::default()),
            ("END", "VEVENT") => events.extend(current.take()),
            // VALARM and friends nest inside VEVENT; skip their properties.
            ("BEGIN", _) if current.is_some() => nested += 1,
            ("END", _) if nested > 0 => nested -= 1,
            _ if nested > 0 => {}
            _ => {
                if let Some(event) = current.as_mut() {
                    event.lines.push(line);
                }
            }
        }
    }
    events
}

impl SourceParser for IcalParser {
    fn source(&self) -> ImportSource {
        ImportSource::Ical
    }

    fn parse(&self, files: &[RawFile], ctx: &mut ParseContext<'_>) -> ImportResult<()> {
        for file in files {
            if ctx.is_aborted() {
                break;
            }
            if file.extension().as_deref() != Some("ics") {
                continue;
            }

            let entries = vevents(&file.text());
            ctx.file_processed();
            debug!(file = %file.path, count = entries.len(), "Parsing calendar");

            for entry in &entries {
                parse_vevent(entry, file, ctx);
            }
        }
        Ok(())
    }
}

fn parse_vevent(entry: &VEvent, file: &RawFile, ctx: &mut ParseContext<'_>) {
    let record = CalendarRecord {
        summary: entry.text("SUMMARY").unwrap_or_default(),
        description: entry.text("DESCRIPTION"),
        location: entry.text("LOCATION"),
        categories: entry.categories(),
    };

    let Some(classification) = classify(&RawRecord::Calendar(record.clone()), None, ctx.defaults()) else {
        ctx.skip("Skipped calendar entry: missing summary", &file.path);
        return;
    };
    let dtstart = entry.get("DTSTART");
    let Some((start, all_day)) = dtstart.and_then(|line| parse_ical_datetime(&line.value)) else {
        ctx.skip(
            format!("Skipped calendar entry \"{}\": missing date", record.summary),
            &file.path,
        );
        return;
    };
    let end = entry
        .get("DTEND")
        .and_then(|line| parse_ical_datetime(&line.value))
        .map(|(end, _)| end);

    let geo = entry.get("GEO").and_then(|line| parse_geo_pair(&line.value));
    let location = resolve_location(&[geo.as_ref()]).map(|location| location.with_name(record.location.clone()));

    let source_id = entry.text("UID").unwrap_or_else(|| {
        let raw_start = dtstart.map(|line| line.value.as_str()).unwrap_or_default();
        record_id("vevent", &[&record.summary, raw_start])
    });

    let mut event = event_at(classification, start, Source::Ical)
        .with_end_date(end)
        .with_source_id(source_id)
        .with_metadata("allDay", all_day)
        .with_metadata("timezone", dtstart.and_then(|line| line.param("TZID")))
        .with_metadata("rrule", entry.text("RRULE"))
        .with_metadata("status", entry.text("STATUS"));
    if location.is_none() {
        event = event.with_metadata("place", record.location);
    }
    event = event.with_location(location);
    ctx.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::types::ImportOptions;
    use crate::model::Layer;
    use chrono::{Datelike, Timelike};

    const CALENDAR: &str = "BEGIN:VCALENDAR\r\n\
        VERSION:2.0\r\n\
        BEGIN:VEVENT\r\n\
        UID:abc-123@example.com\r\n\
        SUMMARY:Annual check\\, dentist\r\n\
        DESCRIPTION:Bring the insurance card and the\r\n  referral letter\r\n\
        DTSTART;TZID=\"Europe/Berlin\":20230314T093000\r\n\
        DTEND:20230314T103000Z\r\n\
        CATEGORIES:Appointments,Health\r\n\
        GEO:52.52;13.405\r\n\
        LOCATION:Praxis Mitte\r\n\
        BEGIN:VALARM\r\n\
        SUMMARY:Alarm text\r\n\
        END:VALARM\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        SUMMARY:Holiday\r\n\
        DTSTART;VALUE=DATE:20230801\r\n\
        RRULE:FREQ=YEARLY\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        DTSTART:20230101T000000Z\r\n\
        END:VEVENT\r\n\
        BEGIN:VEVENT\r\n\
        SUMMARY:No date\r\n\
        END:VEVENT\r\n\
        END:VCALENDAR\r\n";

    #[test]
    fn test_unfold_and_unescape() {
        let lines = unfold("A:one\r\n two\r\n\tthree\r\nB:x\r\n");
        assert_eq!(lines, vec!["A:onetwothree".to_string(), "B:x".to_string()]);
        assert_eq!(unescape(r"a\, b\; c\\d\ne"), "a, b; c\\d\ne");
    }

    #[test]
    fn test_content_line_params() {
        let line = ContentLine::parse("DTSTART;TZID=\"America/New_York\":20230101T090000").unwrap();
        assert_eq!(line.name, "DTSTART");
        assert_eq!(line.param("TZID"), Some("America/New_York"));
        assert_eq!(line.value, "20230101T090000");
        assert!(ContentLine::parse("no colon here").is_none());
    }

    #[test]
    fn test_parse_datetimes() {
        let (day, all_day) = parse_ical_datetime("20230801").unwrap();
        assert!(all_day);
        assert_eq!((day.month(), day.day()), (8, 1));

        let (instant, all_day) = parse_ical_datetime("20230314T093000Z").unwrap();
        assert!(!all_day);
        assert_eq!(instant.hour(), 9);

        assert!(parse_ical_datetime("garbage").is_none());
    }

    #[test]
    fn test_calendar_events() {
        let options = ImportOptions::default();
        let mut ctx = ParseContext::new(&options);
        IcalParser
            .parse(&[RawFile::from_text("calendar.ics", CALENDAR)], &mut ctx)
            .unwrap();

        assert_eq!(ctx.events.len(), 2);
        let dentist = &ctx.events[0];
        assert_eq!(dentist.title, "Annual check, dentist");
        assert_eq!(
            dentist.description.as_deref(),
            Some("Bring the insurance card and the referral letter")
        );
        assert_eq!(dentist.layer, Layer::Health);
        assert_eq!(dentist.event_type, "calendar");
        assert_eq!(dentist.source_id.as_deref(), Some("abc-123@example.com"));
        assert_eq!(dentist.start_date.hour(), 9);
        assert!(dentist.end_date.is_some());
        assert_eq!(
            dentist.location.as_ref().and_then(|l| l.name.as_deref()),
            Some("Praxis Mitte")
        );
        assert_eq!(dentist.metadata["timezone"], "Europe/Berlin");

        let holiday = &ctx.events[1];
        assert_eq!(holiday.layer, Layer::Media);
        assert_eq!(holiday.metadata["allDay"], true);
        assert_eq!(holiday.metadata["rrule"], "FREQ=YEARLY");
        assert!(holiday.source_id.as_deref().unwrap().starts_with("vevent:"));

        assert_eq!(ctx.errors.len(), 2);
        assert!(ctx.errors.iter().all(|e| !e.fatal));
    }
}
