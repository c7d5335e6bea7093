//! Date resolution from competing signals.
//!
//! Exports rarely agree on where a record's date lives. A caller lists the
//! signals it has, most trusted first, and [`resolve`] returns the first one
//! that decodes:
//!
//! 1. Epoch timestamps (seconds or milliseconds), sanity-checked to years
//!    1970..=3000. Zero and negative values are rejected.
//! 2. Human-readable strings, tried against a fixed format cascade.
//! 3. Dates embedded in file names, tried against an ordered list of
//!    camera/messaging-app patterns.
//! 4. Folder names of the form `Photos from YYYY`.
//!
//! Only the epoch step applies a magnitude check; a string or file name that
//! decodes to a valid calendar date is trusted.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;

/// Epoch values at or above this are milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Accepted year range for epoch timestamps.
const EPOCH_YEARS: std::ops::RangeInclusive<i32> = 1970..=3000;

/// Accepted year range for dates found in file names.
const FILENAME_YEARS: std::ops::RangeInclusive<i32> = 1900..=2100;

/// Date-time layouts tried before plain dates.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Plain date layouts, in cascade order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

/// One candidate source for a record's date.
#[derive(Debug, Clone, Copy)]
pub enum DateSignal<'a> {
    /// Epoch timestamp as found in JSON (number or numeric string).
    Timestamp(&'a Value),
    /// Epoch timestamp already decoded to an integer.
    Epoch(i64),
    /// Epoch timestamp held in a text field.
    EpochText(&'a str),
    /// Human-readable date string.
    Text(&'a str),
    /// File name that may embed a date.
    FileName(&'a str),
    /// Folder name that may embed a year.
    Folder(&'a str),
}

/// Which kind of signal produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateOrigin {
    Timestamp,
    Text,
    FileName,
    Folder,
}

impl DateOrigin {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timestamp => "timestamp",
            Self::Text => "text",
            Self::FileName => "filename",
            Self::Folder => "folder",
        }
    }
}

/// A successfully resolved date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub value: DateTime<Utc>,
    pub origin: DateOrigin,
    /// Position of the winning signal in the caller's list.
    pub signal: usize,
}

impl DateSignal<'_> {
    /// Try to decode this signal on its own.
    #[must_use]
    pub fn decode(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(value) => parse_epoch_value(value),
            Self::Epoch(raw) => parse_epoch(*raw),
            Self::EpochText(text) => parse_epoch_str(text),
            Self::Text(text) => parse_text(text),
            Self::FileName(name) => parse_filename(name),
            Self::Folder(folder) => parse_folder(folder),
        }
    }

    const fn origin(&self) -> DateOrigin {
        match self {
            Self::Timestamp(_) | Self::Epoch(_) | Self::EpochText(_) => DateOrigin::Timestamp,
            Self::Text(_) => DateOrigin::Text,
            Self::FileName(_) => DateOrigin::FileName,
            Self::Folder(_) => DateOrigin::Folder,
        }
    }
}

/// Return the first signal that decodes to a date.
#[must_use]
pub fn resolve(signals: &[DateSignal<'_>]) -> Option<ResolvedDate> {
    signals.iter().enumerate().find_map(|(signal, candidate)| {
        candidate.decode().map(|value| ResolvedDate {
            value,
            origin: candidate.origin(),
            signal,
        })
    })
}

/// Decode an epoch timestamp in seconds or milliseconds.
#[must_use]
pub fn parse_epoch(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }

    let value = if raw >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)?
    } else {
        DateTime::from_timestamp(raw, 0)?
    };

    EPOCH_YEARS.contains(&value.year()).then_some(value)
}

/// Decode an epoch timestamp from a JSON number or numeric string.
#[must_use]
pub fn parse_epoch_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(float_to_epoch))
            .and_then(parse_epoch),
        Value::String(s) => parse_epoch_str(s),
        _ => None,
    }
}

/// Decode an epoch timestamp from a string. Non-numeric strings fail.
#[must_use]
pub fn parse_epoch_str(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(float_to_epoch))
        .and_then(parse_epoch)
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_epoch(value: f64) -> Option<i64> {
    (value.is_finite() && value.abs() < 9.0e15).then_some(value as i64)
}

/// Decode a human-readable date string.
///
/// Tries RFC 3339, then naive date-times, then [`DATE_FORMATS`], then
/// `Mon YYYY`, then a bare four-digit year.
#[must_use]
pub fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Some(value.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&value));
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(midnight(date));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&format!("1 {text}"), "%d %B %Y") {
        return Some(midnight(date));
    }

    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        let year = text.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1).map(midnight);
    }

    None
}

/// A file-name date layout.
struct FilenamePattern {
    name: &'static str,
    regex: Regex,
}

/// File-name layouts in priority order. Named groups `y`, `m`, `d` are
/// required; `H`, `M`, `S` are optional time components.
static FILENAME_PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
    [
        (
            "compact_datetime",
            r"(?:^|\D)(?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2})[_\- ]?(?P<H>\d{2})(?P<M>\d{2})(?P<S>\d{2})",
        ),
        (
            "dashed_datetime",
            r"(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})[ _T\-]+(?:at )?(?P<H>\d{2})[.:\-](?P<M>\d{2})[.:\-](?P<S>\d{2})",
        ),
        (
            "whatsapp",
            r"(?i)(?:IMG|VID|AUD|PTT|STK|DOC)-(?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2})-WA\d+",
        ),
        (
            "camera_date",
            r"(?i)(?:IMG|VID|PXL|MVIMG|PANO|BURST)[_\-](?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2})",
        ),
        (
            "dashed_date",
            r"(?:^|\D)(?P<y>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})(?:\D|$)",
        ),
        (
            "compact_date",
            r"(?:^|\D)(?P<y>\d{4})(?P<m>\d{2})(?P<d>\d{2})(?:\D|$)",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| FilenamePattern {
        name,
        regex: Regex::new(pattern).expect("valid filename date regex"),
    })
    .collect()
});

static FOLDER_YEAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*Photos from (?P<y>\d{4})\s*$").expect("valid folder year regex")
});

/// Decode a date embedded in a file name.
#[must_use]
pub fn parse_filename(name: &str) -> Option<DateTime<Utc>> {
    filename_match(name).map(|(_, value)| value)
}

/// Like [`parse_filename`], also naming the pattern that matched.
#[must_use]
pub fn filename_match(name: &str) -> Option<(&'static str, DateTime<Utc>)> {
    FILENAME_PATTERNS.iter().find_map(|pattern| {
        pattern
            .regex
            .captures_iter(name)
            .find_map(|caps| date_from_captures(&caps))
            .map(|value| (pattern.name, value))
    })
}

/// Decode a `Photos from YYYY` folder name to 1 January of that year.
#[must_use]
pub fn parse_folder(folder: &str) -> Option<DateTime<Utc>> {
    let caps = FOLDER_YEAR_RE.captures(folder)?;
    let year: i32 = caps["y"].parse().ok()?;
    if !FILENAME_YEARS.contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 1, 1).map(midnight)
}

fn date_from_captures(caps: &Captures<'_>) -> Option<DateTime<Utc>> {
    let year: i32 = caps.name("y")?.as_str().parse().ok()?;
    let month: u32 = caps.name("m")?.as_str().parse().ok()?;
    let day: u32 = caps.name("d")?.as_str().parse().ok()?;

    if !FILENAME_YEARS.contains(&year) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let component = |name: &str| -> Option<u32> { caps.name(name)?.as_str().parse().ok() };
    let time = match (component("H"), component("M"), component("S")) {
        (Some(h), Some(m), Some(s)) => NaiveTime::from_hms_opt(h, m, s),
        _ => None,
    };

    Some(match time {
        Some(time) => Utc.from_utc_datetime(&date.and_time(time)),
        None => midnight(date),
    })
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use serde_json::json;

    fn ymd(value: DateTime<Utc>) -> (i32, u32, u32) {
        (value.year(), value.month(), value.day())
    }

    #[test]
    fn test_epoch_seconds_and_millis() {
        assert_eq!(ymd(parse_epoch(1_609_459_200).unwrap()), (2021, 1, 1));
        assert_eq!(ymd(parse_epoch(1_609_459_200_000).unwrap()), (2021, 1, 1));
    }

    #[test]
    fn test_epoch_rejects_zero_negative_and_garbage() {
        assert!(parse_epoch(0).is_none());
        assert!(parse_epoch(-86_400).is_none());
        assert!(parse_epoch_str("0").is_none());
        assert!(parse_epoch_str("-1").is_none());
        assert!(parse_epoch_str("not a number").is_none());
        assert!(parse_epoch_str("").is_none());
        assert!(parse_epoch_value(&json!(null)).is_none());
        assert!(parse_epoch_value(&json!({"timestamp": 5})).is_none());
    }

    #[test]
    fn test_epoch_far_future_bounds() {
        // 3000-01-01T00:00:00Z
        let year_3000 = parse_epoch_str("32503680000").unwrap();
        assert_eq!(year_3000.year(), 3000);
        assert_eq!(parse_epoch(32_503_680_000_000).unwrap().year(), 3000);

        // 3001-01-01T00:00:00Z
        assert!(parse_epoch(32_535_216_000).is_none());
    }

    #[test]
    fn test_epoch_value_number_and_string() {
        assert!(parse_epoch_value(&json!(1_609_459_200)).is_some());
        assert!(parse_epoch_value(&json!("1609459200")).is_some());
        assert!(parse_epoch_value(&json!(1_609_459_200.5)).is_some());
    }

    #[test]
    fn test_text_cascade() {
        assert_eq!(ymd(parse_text("2020-03-15").unwrap()), (2020, 3, 15));
        assert_eq!(ymd(parse_text("2020/03/15").unwrap()), (2020, 3, 15));
        assert_eq!(ymd(parse_text("03/15/2020").unwrap()), (2020, 3, 15));
        assert_eq!(ymd(parse_text("15 Mar 2020").unwrap()), (2020, 3, 15));
        assert_eq!(ymd(parse_text("15 March 2020").unwrap()), (2020, 3, 15));
        assert_eq!(ymd(parse_text("Mar 15, 2020").unwrap()), (2020, 3, 15));
        assert_eq!(ymd(parse_text("Mar 2020").unwrap()), (2020, 3, 1));
        assert_eq!(ymd(parse_text("September 2018").unwrap()), (2018, 9, 1));
        assert_eq!(ymd(parse_text("2015").unwrap()), (2015, 1, 1));
        assert_eq!(ymd(parse_text("2020-03-15T10:20:30Z").unwrap()), (2020, 3, 15));
        assert_eq!(parse_text("2020-03-15 10:20:30").unwrap().hour(), 10);
    }

    #[test]
    fn test_text_rejects_nonsense() {
        assert!(parse_text("").is_none());
        assert!(parse_text("   ").is_none());
        assert!(parse_text("Present").is_none());
        assert!(parse_text("2020-13-01").is_none());
        assert!(parse_text("20201").is_none());
    }

    #[test]
    fn test_filename_compact_datetime() {
        let value = parse_filename("IMG_20231225_143022.jpg").unwrap();
        assert_eq!(ymd(value), (2023, 12, 25));
        assert_eq!((value.hour(), value.minute(), value.second()), (14, 30, 22));

        let (pattern, _) = filename_match("PXL_20230704_091500123.mp4").unwrap();
        assert_eq!(pattern, "compact_datetime");
        assert_eq!(ymd(parse_filename("Screenshot_20220101-080910.png").unwrap()), (2022, 1, 1));
        assert_eq!(ymd(parse_filename("20190817143000.jpg").unwrap()), (2019, 8, 17));
    }

    #[test]
    fn test_filename_dashed_datetime() {
        let value = parse_filename("Screenshot 2023-05-06 at 07.08.09.png").unwrap();
        assert_eq!(ymd(value), (2023, 5, 6));
        assert_eq!(value.hour(), 7);
    }

    #[test]
    fn test_filename_whatsapp_and_camera_date() {
        let (pattern, value) = filename_match("IMG-20210314-WA0007.jpg").unwrap();
        assert_eq!(pattern, "whatsapp");
        assert_eq!(ymd(value), (2021, 3, 14));
        assert_eq!(value.hour(), 0);

        let (pattern, value) = filename_match("VID_20200229.mp4").unwrap();
        assert_eq!(pattern, "camera_date");
        assert_eq!(ymd(value), (2020, 2, 29));
    }

    #[test]
    fn test_filename_plain_dates() {
        let (pattern, value) = filename_match("holiday 2018-07-01.jpg").unwrap();
        assert_eq!(pattern, "dashed_date");
        assert_eq!(ymd(value), (2018, 7, 1));

        let (pattern, value) = filename_match("scan_19991231.png").unwrap();
        assert_eq!(pattern, "compact_date");
        assert_eq!(ymd(value), (1999, 12, 31));
    }

    #[test]
    fn test_filename_rejects_invalid_dates() {
        assert!(parse_filename("photo.jpg").is_none());
        assert!(parse_filename("12345678.jpg").is_none());
        assert!(parse_filename("IMG_20231301_000000.jpg").is_none());
        assert!(parse_filename("IMG_20230230.jpg").is_none());
    }

    #[test]
    fn test_filename_bad_time_keeps_date() {
        let value = parse_filename("IMG_20231225_996622.jpg").unwrap();
        assert_eq!(ymd(value), (2023, 12, 25));
        assert_eq!(value.hour(), 0);
    }

    #[test]
    fn test_folder_year() {
        assert_eq!(ymd(parse_folder("Photos from 2016").unwrap()), (2016, 1, 1));
        assert!(parse_folder("Holiday album").is_none());
        assert!(parse_folder("Photos from 0001").is_none());
    }

    #[test]
    fn test_resolve_first_success_wins() {
        let bad = json!("0");
        let good = json!("1609459200");

        let resolved = resolve(&[
            DateSignal::Timestamp(&bad),
            DateSignal::Timestamp(&good),
            DateSignal::FileName("IMG_20231225_143022.jpg"),
        ])
        .unwrap();
        assert_eq!(resolved.signal, 1);
        assert_eq!(resolved.origin, DateOrigin::Timestamp);
        assert_eq!(resolved.value.year(), 2021);

        let resolved = resolve(&[
            DateSignal::Timestamp(&bad),
            DateSignal::FileName("photo.jpg"),
            DateSignal::Folder("Photos from 2012"),
        ])
        .unwrap();
        assert_eq!(resolved.origin, DateOrigin::Folder);
        assert_eq!(resolved.value.year(), 2012);

        assert!(resolve(&[DateSignal::Text("soon"), DateSignal::FileName("a.jpg")]).is_none());
        assert!(resolve(&[]).is_none());
    }
}
