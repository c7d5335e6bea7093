//! Facebook "Download Your Information" JSON parser.
//!
//! Handles posts (`your_posts*.json`, `posts_*.json`), friends
//! (`friends.json`, `your_friends.json`) and events (`*event_responses*.json`,
//! `your_events*.json`). Each entry is decoded on its own so one odd entry
//! doesn't cost the rest of the file.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::import::classify::classify;
use crate::import::date::{DateSignal, parse_epoch_value, resolve};
use crate::import::geo::{GeoBlock, resolve_location};
use crate::import::record::{PostRecord, RawRecord};
use crate::import::types::{ImportResult, ImportSource, RawFile, extension_of, is_video_extension};
use crate::model::{MediaAttachment, MediaKind, Source};

use super::{ParseContext, SourceParser, build_event, record_id};

/// Facebook JSON export parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacebookParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportFile {
    Posts,
    Friends,
    EventResponses,
    HostedEvents,
}

impl ExportFile {
    fn from_name(name: &str) -> Option<Self> {
        let name = name.to_lowercase();
        let stem = name.strip_suffix(".json")?;

        if stem.starts_with("your_posts") || stem.starts_with("posts_") {
            Some(Self::Posts)
        } else if matches!(stem, "friends" | "your_friends" | "friends_v2") {
            Some(Self::Friends)
        } else if stem.contains("event_responses") {
            Some(Self::EventResponses)
        } else if stem.starts_with("your_events") {
            Some(Self::HostedEvents)
        } else {
            None
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Posts => "post",
            Self::Friends => "friend",
            Self::EventResponses | Self::HostedEvents => "event",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Post {
    timestamp: Option<Value>,
    title: Option<String>,
    data: Vec<PostData>,
    attachments: Vec<Attachment>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostData {
    post: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Attachment {
    data: Vec<AttachmentData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AttachmentData {
    place: Option<Place>,
    media: Option<MediaRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Place {
    name: Option<String>,
    coordinate: Option<GeoBlock>,
    address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MediaRef {
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Friend {
    name: Option<String>,
    timestamp: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Event {
    name: Option<String>,
    description: Option<String>,
    start_timestamp: Option<Value>,
    end_timestamp: Option<Value>,
    place: Option<Place>,
}

/// Undo Facebook's text encoding.
///
/// The export writes each UTF-8 byte as its own `\u00XX` code point, so
/// "café" arrives as "cafÃ©". When every char fits in a byte and those bytes
/// form valid UTF-8, the decoded text is returned; otherwise the input is
/// kept as is.
#[must_use]
pub fn repair_text(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    let bytes: Option<Vec<u8>> = text.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect();
    bytes
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| text.to_string())
}

fn repaired(text: Option<&String>) -> Option<String> {
    text.map(|t| repair_text(t.trim())).filter(|t| !t.is_empty())
}

/// Entry list of a file: the top-level array, or the first array found
/// at one of the JSON `pointers`.
fn entries<'v>(root: &'v Value, pointers: &[&str]) -> &'v [Value] {
    match root {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => pointers
            .iter()
            .find_map(|pointer| pointer_array(root, pointer))
            .unwrap_or_default(),
        _ => &[],
    }
}

fn pointer_array<'v>(root: &'v Value, pointer: &str) -> Option<&'v [Value]> {
    root.pointer(pointer)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
}

fn decode_entries<T: DeserializeOwned>(
    items: &[Value],
    file: &RawFile,
    kind: ExportFile,
    ctx: &mut ParseContext<'_>,
) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<T>(item.clone()) {
            Ok(entry) => Some(entry),
            Err(e) => {
                ctx.skip(
                    format!("Skipped {} #{}: unreadable entry ({e})", kind.label(), i + 1),
                    &file.path,
                );
                None
            }
        })
        .collect()
}

impl SourceParser for FacebookParser {
    fn source(&self) -> ImportSource {
        ImportSource::Facebook
    }

    fn parse(&self, files: &[RawFile], ctx: &mut ParseContext<'_>) -> ImportResult<()> {
        for file in files {
            if ctx.is_aborted() {
                break;
            }
            let Some(kind) = ExportFile::from_name(file.name()) else {
                continue;
            };
            let root: Value = match serde_json::from_slice(&file.bytes) {
                Ok(root) => root,
                Err(e) => {
                    ctx.skip(format!("Skipped {}: invalid JSON ({e})", file.name()), &file.path);
                    continue;
                }
            };
            ctx.file_processed();
            debug!(file = %file.path, ?kind, "Parsing Facebook export");

            match kind {
                ExportFile::Posts => {
                    let items = entries(&root, &["/status_updates_v2", "/posts_v2", "/posts"]);
                    for post in decode_entries::<Post>(items, file, kind, ctx) {
                        parse_post(&post, file, ctx);
                    }
                }
                ExportFile::Friends => {
                    let items = entries(&root, &["/friends_v2", "/friends"]);
                    for friend in decode_entries::<Friend>(items, file, kind, ctx) {
                        parse_friend(&friend, file, ctx);
                    }
                }
                ExportFile::EventResponses => {
                    let items = entries(
                        &root,
                        &["/event_responses_v2/events_joined", "/event_responses/events_joined"],
                    );
                    for event in decode_entries::<Event>(items, file, kind, ctx) {
                        parse_event(&event, file, ctx);
                    }
                }
                ExportFile::HostedEvents => {
                    let items = entries(&root, &["/your_events_v2", "/your_events"]);
                    for event in decode_entries::<Event>(items, file, kind, ctx) {
                        parse_event(&event, file, ctx);
                    }
                }
            }
        }
        Ok(())
    }
}

fn parse_post(post: &Post, file: &RawFile, ctx: &mut ParseContext<'_>) {
    let text = post.data.iter().find_map(|d| repaired(d.post.as_ref()));
    let place = post
        .attachments
        .iter()
        .flat_map(|a| &a.data)
        .find_map(|d| d.place.as_ref());
    let media: Vec<MediaAttachment> = post
        .attachments
        .iter()
        .flat_map(|a| &a.data)
        .filter_map(|d| d.media.as_ref()?.uri.as_deref())
        .map(media_attachment)
        .collect();

    let location = resolve_location(&[place.and_then(|p| p.coordinate.as_ref())]).map(|location| {
        location.with_name(place.and_then(|p| repaired(p.name.as_ref())))
    });
    let record = RawRecord::FacebookPost(PostRecord {
        text: text.clone(),
        title: repaired(post.title.as_ref()),
        place: place.and_then(|p| repaired(p.name.as_ref())),
        media_count: media.len(),
    });

    let Some(classification) = classify(&record, location.as_ref(), ctx.defaults()) else {
        ctx.skip("Skipped post: no text or media", &file.path);
        return;
    };
    let Some(start) = resolve(&post_signals(post)) else {
        ctx.skip(format!("Skipped post \"{}\": missing date", classification.title), &file.path);
        return;
    };

    let timestamp = post.timestamp.as_ref().map(Value::to_string).unwrap_or_default();
    let mut event = build_event(classification, &start, Source::Facebook)
        .with_source_id(record_id("post", &[&timestamp, text.as_deref().unwrap_or_default()]))
        .with_location(location)
        .with_metadata("address", place.and_then(|p| repaired(p.address.as_ref())));
    for attachment in media {
        event = event.with_media(attachment);
    }
    ctx.push(event);
}

fn post_signals(post: &Post) -> Vec<DateSignal<'_>> {
    post.timestamp.iter().map(DateSignal::Timestamp).collect()
}

fn media_attachment(uri: &str) -> MediaAttachment {
    let file_name = uri.rsplit('/').next().unwrap_or(uri).to_string();
    let kind = match extension_of(&file_name) {
        Some(ext) if is_video_extension(&ext) => MediaKind::Video,
        _ => MediaKind::Photo,
    };
    MediaAttachment {
        file_name,
        kind,
        mime_type: None,
    }
}

fn parse_friend(friend: &Friend, file: &RawFile, ctx: &mut ParseContext<'_>) {
    let name = repaired(friend.name.as_ref()).unwrap_or_default();
    let Some(classification) = classify(&RawRecord::FacebookFriend { name: name.clone() }, None, ctx.defaults())
    else {
        ctx.skip("Skipped friend: missing name", &file.path);
        return;
    };
    let Some(start) = friend.timestamp.as_ref().and_then(|ts| resolve(&[DateSignal::Timestamp(ts)])) else {
        ctx.skip(format!("Skipped friend {name}: missing date"), &file.path);
        return;
    };

    let timestamp = start.value.timestamp().to_string();
    let event = build_event(classification, &start, Source::Facebook)
        .with_source_id(record_id("friend", &[&name, &timestamp]))
        .with_metadata("friend", name);
    ctx.push(event);
}

fn parse_event(entry: &Event, file: &RawFile, ctx: &mut ParseContext<'_>) {
    let name = repaired(entry.name.as_ref()).unwrap_or_default();
    let Some(classification) = classify(&RawRecord::FacebookEvent { name: name.clone() }, None, ctx.defaults())
    else {
        ctx.skip("Skipped event: missing name", &file.path);
        return;
    };
    let Some(start) = entry
        .start_timestamp
        .as_ref()
        .and_then(|ts| resolve(&[DateSignal::Timestamp(ts)]))
    else {
        ctx.skip(format!("Skipped event {name}: missing date"), &file.path);
        return;
    };

    let place = entry.place.as_ref();
    let location = resolve_location(&[place.and_then(|p| p.coordinate.as_ref())])
        .map(|location| location.with_name(place.and_then(|p| repaired(p.name.as_ref()))));
    let timestamp = start.value.timestamp().to_string();
    let event = build_event(classification, &start, Source::Facebook)
        .with_description(repaired(entry.description.as_ref()))
        .with_end_date(entry.end_timestamp.as_ref().and_then(parse_epoch_value))
        .with_source_id(record_id("event", &[&name, &timestamp]))
        .with_location(location)
        .with_metadata("place", place.and_then(|p| repaired(p.name.as_ref())));
    ctx.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::types::ImportOptions;
    use crate::model::{ImportError, Layer, TimelineEvent};
    use chrono::Datelike;

    fn run(files: &[RawFile]) -> (Vec<TimelineEvent>, Vec<ImportError>) {
        let options = ImportOptions::default();
        let mut ctx = ParseContext::new(&options);
        FacebookParser.parse(files, &mut ctx).unwrap();
        (ctx.events, ctx.errors)
    }

    #[test]
    fn test_repair_text() {
        assert_eq!(repair_text("caf\u{00c3}\u{00a9}"), "café");
        assert_eq!(repair_text("plain"), "plain");
        assert_eq!(repair_text("already café"), "already café");
        assert_eq!(repair_text("emoji 😀"), "emoji 😀");
    }

    #[test]
    fn test_file_routing() {
        assert_eq!(ExportFile::from_name("your_posts_1.json"), Some(ExportFile::Posts));
        assert_eq!(ExportFile::from_name("Friends.json"), Some(ExportFile::Friends));
        assert_eq!(
            ExportFile::from_name("your_event_responses.json"),
            Some(ExportFile::EventResponses)
        );
        assert_eq!(ExportFile::from_name("removed_friends.json"), None);
        assert_eq!(ExportFile::from_name("your_posts_1.html"), None);
    }

    #[test]
    fn test_posts_and_checkins() {
        let json = r#"[
            {"timestamp": 1600000000, "data": [{"post": "Hello world"}], "title": "Ann updated her status."},
            {"timestamp": 1600086400, "title": "Ann was at Louvre.",
             "attachments": [{"data": [{"place": {"name": "Louvre", "coordinate": {"latitude": 48.86, "longitude": 2.33}}}]}]},
            {"timestamp": 1600172800,
             "attachments": [{"data": [{"media": {"uri": "photos_and_videos/album/clip.mp4"}}]}]},
            {"timestamp": 0, "data": [{"post": "lost"}]},
            {"timestamp": 1600259200}
        ]"#;
        let (events, errors) = run(&[RawFile::from_text("posts/your_posts_1.json", json)]);

        assert_eq!(events.len(), 3);
        assert_eq!((events[0].layer, events[0].event_type.as_str()), (Layer::Media, "post"));
        assert_eq!(events[0].title, "Hello world");

        assert_eq!((events[1].layer, events[1].event_type.as_str()), (Layer::Travel, "checkin"));
        assert_eq!(events[1].title, "Checked in at Louvre");
        assert_eq!(events[1].location.as_ref().unwrap().name.as_deref(), Some("Louvre"));

        assert_eq!(events[2].media[0].file_name, "clip.mp4");
        assert_eq!(events[2].media[0].kind, MediaKind::Video);

        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| !e.fatal));
    }

    #[test]
    fn test_place_without_coordinates_is_post() {
        let json = r#"[{"timestamp": 1600000000, "data": [{"post": "Lunch"}],
            "attachments": [{"data": [{"place": {"name": "Cafe", "coordinate": {"latitude": 0, "longitude": 0}}}]}]}]"#;
        let (events, _) = run(&[RawFile::from_text("your_posts_1.json", json)]);

        assert_eq!(events[0].layer, Layer::Media);
        assert!(events[0].location.is_none());
    }

    #[test]
    fn test_friends() {
        let json = r#"{"friends_v2": [
            {"name": "JosÃ©", "timestamp": 1500000000},
            {"name": "", "timestamp": 1500000000},
            {"name": "No Date"}
        ]}"#;
        let (events, errors) = run(&[RawFile::from_text("friends/friends.json", json)]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Became friends with José");
        assert_eq!(events[0].layer, Layer::Relationships);
        assert_eq!(events[0].event_type, "friend");
        assert_eq!(events[0].start_date.year(), 2017);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_event_responses() {
        let json = r#"{"event_responses_v2": {
            "events_joined": [{"name": "Launch Party", "start_timestamp": 1650000000, "end_timestamp": 1650010000}],
            "events_declined": [{"name": "Declined", "start_timestamp": 1650000000}]
        }}"#;
        let (events, errors) = run(&[RawFile::from_text("your_event_responses.json", json)]);

        assert!(errors.is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Launch Party");
        assert_eq!(events[0].event_type, "event");
        assert!(events[0].end_date.is_some());
    }

    #[test]
    fn test_invalid_json_is_skipped() {
        let (events, errors) = run(&[RawFile::from_text("your_posts_1.json", "[{")]);
        assert!(events.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].fatal);
    }

    #[test]
    fn test_reimport_gives_same_ids() {
        let json = r#"[{"timestamp": 1600000000, "data": [{"post": "Hello"}]}]"#;
        let files = [RawFile::from_text("your_posts_1.json", json)];
        let (a, _) = run(&files);
        let (b, _) = run(&files);
        assert_eq!(a[0].id, b[0].id);
    }
}
