//! Record classification.
//!
//! Maps a [`RawRecord`] to a layer, an event type and display text. Pure and
//! deterministic: the same record, location and defaults always give the same
//! answer. `None` means the record lacks the field that identifies it.

use crate::model::{Layer, Location};

use super::record::{
    CalendarRecord, ConnectionRecord, CsvRecord, EducationRecord, PhotoRecord, PositionRecord,
    PostRecord, RawRecord,
};

/// Longest title derived from free text.
const MAX_TITLE_CHARS: usize = 80;

/// Classifier output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub layer: Layer,
    pub event_type: String,
    pub title: String,
    pub description: Option<String>,
}

impl Classification {
    fn new(layer: Layer, event_type: &str, title: String) -> Self {
        Self {
            layer,
            event_type: event_type.to_string(),
            title,
            description: None,
        }
    }

    fn describe(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }
}

/// Fallbacks for records that don't carry their own layer or type.
#[derive(Debug, Clone, Copy)]
pub struct Defaults<'a> {
    pub layer: Layer,
    pub event_type: &'a str,
}

impl Default for Defaults<'_> {
    fn default() -> Self {
        Self {
            layer: Layer::Media,
            event_type: "event",
        }
    }
}

/// Classify a record.
#[must_use]
pub fn classify(
    record: &RawRecord,
    location: Option<&Location>,
    defaults: Defaults<'_>,
) -> Option<Classification> {
    match record {
        RawRecord::LinkedInPosition(position) => classify_position(position),
        RawRecord::LinkedInEducation(education) => classify_education(education),
        RawRecord::LinkedInConnection(connection) => classify_connection(connection),
        RawRecord::GooglePhoto(photo) => classify_photo(photo, location),
        RawRecord::FacebookPost(post) => classify_post(post, location),
        RawRecord::FacebookFriend { name } => non_empty(name).map(|name| {
            Classification::new(
                Layer::Relationships,
                "friend",
                format!("Became friends with {name}"),
            )
        }),
        RawRecord::FacebookEvent { name } => non_empty(name)
            .map(|name| Classification::new(Layer::Relationships, "event", name.to_string())),
        RawRecord::Csv(row) => classify_csv(row, defaults),
        RawRecord::Calendar(entry) => classify_calendar(entry, defaults),
    }
}

fn classify_position(position: &PositionRecord) -> Option<Classification> {
    let company = non_empty(&position.company)?;
    let title = match non_empty(&position.title) {
        Some(title) => format!("{title} at {company}"),
        None => format!("Worked at {company}"),
    };
    Some(
        Classification::new(Layer::Work, "job", title)
            .describe(Some(position.description.clone())),
    )
}

fn classify_education(education: &EducationRecord) -> Option<Classification> {
    let school = non_empty(&education.school)?;
    let title = match non_empty(&education.degree) {
        Some(degree) => format!("{degree} at {school}"),
        None => format!("Studied at {school}"),
    };
    Some(
        Classification::new(Layer::Education, "degree", title)
            .describe(Some(education.notes.clone())),
    )
}

fn classify_connection(connection: &ConnectionRecord) -> Option<Classification> {
    let first = non_empty(&connection.first_name)?;
    let title = match non_empty(&connection.last_name) {
        Some(last) => format!("Connected with {first} {last}"),
        None => format!("Connected with {first}"),
    };
    let description = non_empty(&connection.position)
        .zip(non_empty(&connection.company))
        .map(|(position, company)| format!("{position} at {company}"));
    Some(Classification::new(Layer::Relationships, "connection", title).describe(description))
}

fn classify_photo(photo: &PhotoRecord, location: Option<&Location>) -> Option<Classification> {
    let title = photo
        .sidecar_title
        .as_deref()
        .and_then(non_empty)
        .or_else(|| non_empty(&photo.file_name))?;
    let layer = if location.is_some() {
        Layer::Travel
    } else {
        Layer::Media
    };
    let event_type = if photo.is_video { "video" } else { "photo" };
    Some(Classification::new(layer, event_type, title.to_string()).describe(photo.description.clone()))
}

fn classify_post(post: &PostRecord, location: Option<&Location>) -> Option<Classification> {
    let text = post.text.as_deref().and_then(non_empty);
    let headline = post.title.as_deref().and_then(non_empty);
    let place = post.place.as_deref().and_then(non_empty);

    if location.is_some() {
        let title = match (place, headline, text) {
            (Some(place), _, _) => format!("Checked in at {place}"),
            (None, Some(headline), _) => headline.to_string(),
            (None, None, Some(text)) => truncate_title(text),
            (None, None, None) => "Checked in".to_string(),
        };
        return Some(
            Classification::new(Layer::Travel, "checkin", title).describe(text.map(String::from)),
        );
    }

    let title = match (text, headline) {
        (Some(text), _) => truncate_title(text),
        (None, Some(headline)) => headline.to_string(),
        (None, None) if post.media_count > 0 => "Shared media".to_string(),
        (None, None) => return None,
    };
    Some(Classification::new(Layer::Media, "post", title).describe(text.map(String::from)))
}

fn classify_csv(row: &CsvRecord, defaults: Defaults<'_>) -> Option<Classification> {
    let title = non_empty(&row.title)?;
    let layer = row
        .layer
        .as_deref()
        .and_then(|layer| layer.parse().ok())
        .unwrap_or(defaults.layer);
    let event_type = row
        .event_type
        .as_deref()
        .and_then(non_empty)
        .unwrap_or(defaults.event_type);
    Some(Classification::new(layer, event_type, title.to_string()).describe(row.description.clone()))
}

fn classify_calendar(entry: &CalendarRecord, defaults: Defaults<'_>) -> Option<Classification> {
    let summary = non_empty(&entry.summary)?;
    let layer = entry
        .categories
        .iter()
        .find_map(|category| category.parse().ok())
        .unwrap_or(defaults.layer);
    Some(
        Classification::new(layer, "calendar", summary.to_string())
            .describe(entry.description.clone()),
    )
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// First line of `text`, cut to [`MAX_TITLE_CHARS`] characters.
fn truncate_title(text: &str) -> String {
    let line = text.lines().next().unwrap_or(text).trim();
    if line.chars().count() <= MAX_TITLE_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(record: RawRecord) -> Option<Classification> {
        classify(&record, None, Defaults::default())
    }

    #[test]
    fn test_position_titles() {
        let with_title = run(RawRecord::LinkedInPosition(PositionRecord {
            company: "Acme".into(),
            title: "Engineer".into(),
            ..PositionRecord::default()
        }))
        .unwrap();
        assert_eq!(with_title.title, "Engineer at Acme");
        assert_eq!(with_title.layer, Layer::Work);
        assert_eq!(with_title.event_type, "job");

        let without_title = run(RawRecord::LinkedInPosition(PositionRecord {
            company: "Acme".into(),
            ..PositionRecord::default()
        }))
        .unwrap();
        assert_eq!(without_title.title, "Worked at Acme");
    }

    #[test]
    fn test_position_requires_company() {
        let record = RawRecord::LinkedInPosition(PositionRecord {
            company: "  ".into(),
            title: "Engineer".into(),
            ..PositionRecord::default()
        });
        assert!(run(record.clone()).is_none());
        assert!(run(record).is_none());
    }

    #[test]
    fn test_education() {
        let degree = run(RawRecord::LinkedInEducation(EducationRecord {
            school: "MIT".into(),
            degree: "BSc".into(),
            notes: "Dean's list".into(),
            ..EducationRecord::default()
        }))
        .unwrap();
        assert_eq!(degree.title, "BSc at MIT");
        assert_eq!(degree.description.as_deref(), Some("Dean's list"));

        let studied = run(RawRecord::LinkedInEducation(EducationRecord {
            school: "MIT".into(),
            ..EducationRecord::default()
        }))
        .unwrap();
        assert_eq!(studied.title, "Studied at MIT");
        assert_eq!(studied.description, None);
    }

    #[test]
    fn test_connection() {
        let full = run(RawRecord::LinkedInConnection(ConnectionRecord {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            company: "Analytical Engines".into(),
            position: "Programmer".into(),
        }))
        .unwrap();
        assert_eq!(full.title, "Connected with Ada Lovelace");
        assert_eq!(full.description.as_deref(), Some("Programmer at Analytical Engines"));
        assert_eq!(full.layer, Layer::Relationships);

        let first_only = run(RawRecord::LinkedInConnection(ConnectionRecord {
            first_name: "Ada".into(),
            position: "Programmer".into(),
            ..ConnectionRecord::default()
        }))
        .unwrap();
        assert_eq!(first_only.title, "Connected with Ada");
        assert_eq!(first_only.description, None);

        assert!(run(RawRecord::LinkedInConnection(ConnectionRecord::default())).is_none());
    }

    #[test]
    fn test_photo_layer_follows_location() {
        let photo = RawRecord::GooglePhoto(PhotoRecord {
            file_name: "IMG_1.jpg".into(),
            ..PhotoRecord::default()
        });
        let here = Location::new(48.85, 2.35).unwrap();

        let media = classify(&photo, None, Defaults::default()).unwrap();
        assert_eq!((media.layer, media.event_type.as_str()), (Layer::Media, "photo"));
        assert_eq!(media.title, "IMG_1.jpg");

        let travel = classify(&photo, Some(&here), Defaults::default()).unwrap();
        assert_eq!(travel.layer, Layer::Travel);
    }

    #[test]
    fn test_photo_title_and_video() {
        let video = run(RawRecord::GooglePhoto(PhotoRecord {
            file_name: "clip.mp4".into(),
            sidecar_title: Some("Beach day".into()),
            is_video: true,
            ..PhotoRecord::default()
        }))
        .unwrap();
        assert_eq!(video.title, "Beach day");
        assert_eq!(video.event_type, "video");
    }

    #[test]
    fn test_facebook_post_and_checkin() {
        let post = RawRecord::FacebookPost(PostRecord {
            text: Some("Hello world".into()),
            ..PostRecord::default()
        });
        let plain = classify(&post, None, Defaults::default()).unwrap();
        assert_eq!((plain.layer, plain.event_type.as_str()), (Layer::Media, "post"));
        assert_eq!(plain.title, "Hello world");

        let checkin = RawRecord::FacebookPost(PostRecord {
            place: Some("Louvre".into()),
            ..PostRecord::default()
        });
        let here = Location::new(48.86, 2.33).unwrap();
        let travel = classify(&checkin, Some(&here), Defaults::default()).unwrap();
        assert_eq!((travel.layer, travel.event_type.as_str()), (Layer::Travel, "checkin"));
        assert_eq!(travel.title, "Checked in at Louvre");

        assert!(run(RawRecord::FacebookPost(PostRecord::default())).is_none());
    }

    #[test]
    fn test_long_post_title_is_truncated() {
        let text = "x".repeat(200);
        let post = run(RawRecord::FacebookPost(PostRecord {
            text: Some(text.clone()),
            ..PostRecord::default()
        }))
        .unwrap();
        assert_eq!(post.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(post.description, Some(text));
    }

    #[test]
    fn test_friend_and_event() {
        let friend = run(RawRecord::FacebookFriend { name: "Sam".into() }).unwrap();
        assert_eq!(friend.title, "Became friends with Sam");
        assert_eq!(friend.event_type, "friend");

        let event = run(RawRecord::FacebookEvent { name: "Party".into() }).unwrap();
        assert_eq!((event.layer, event.title.as_str()), (Layer::Relationships, "Party"));

        assert!(run(RawRecord::FacebookFriend { name: String::new() }).is_none());
    }

    #[test]
    fn test_csv_layer_and_type_defaults() {
        let defaults = Defaults {
            layer: Layer::Health,
            event_type: "note",
        };
        let explicit = RawRecord::Csv(CsvRecord {
            title: "Marathon".into(),
            layer: Some("Travel".into()),
            event_type: Some("race".into()),
            ..CsvRecord::default()
        });
        let fallback = RawRecord::Csv(CsvRecord {
            title: "Checkup".into(),
            layer: Some("unknown".into()),
            event_type: Some(" ".into()),
            ..CsvRecord::default()
        });

        let a = classify(&explicit, None, defaults).unwrap();
        assert_eq!((a.layer, a.event_type.as_str()), (Layer::Travel, "race"));

        let b = classify(&fallback, None, defaults).unwrap();
        assert_eq!((b.layer, b.event_type.as_str()), (Layer::Health, "note"));

        assert!(run(RawRecord::Csv(CsvRecord::default())).is_none());
    }

    #[test]
    fn test_calendar_category_overrides_layer() {
        let entry = RawRecord::Calendar(CalendarRecord {
            summary: "Dentist".into(),
            categories: vec!["Personal".into(), "HEALTH".into()],
            ..CalendarRecord::default()
        });
        let classified = run(entry).unwrap();
        assert_eq!(classified.layer, Layer::Health);
        assert_eq!(classified.event_type, "calendar");

        let plain = run(RawRecord::Calendar(CalendarRecord {
            summary: "Standup".into(),
            ..CalendarRecord::default()
        }))
        .unwrap();
        assert_eq!(plain.layer, Layer::Media);
    }
}
