//! Google Takeout / Google Photos parser.
//!
//! Each media file yields one event. Its JSON sidecar, when one matches,
//! contributes title, description, timestamps, geodata and people. Media
//! without a sidecar fall back to dates embedded in the file or folder name.
//! Sidecars without media are ignored.
//!
//! Sidecar names seen in the wild for `IMG_1.jpg`:
//! - `IMG_1.jpg.json`
//! - `IMG_1.jpg.supplemental-metadata.json` (and truncations of it)
//! - `IMG_1.json`
//! - `IMG_1.jpg(1).json` for the duplicate `IMG_1(1).jpg`

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::import::classify::classify;
use crate::import::date::{DateSignal, resolve};
use crate::import::geo::{GeoBlock, resolve_location};
use crate::import::record::{PhotoRecord, RawRecord};
use crate::import::types::{
    ImportResult, ImportSource, RawFile, extension_of, is_media_extension, is_video_extension,
};
use crate::model::{MediaAttachment, MediaKind, Source};

use super::{ParseContext, SourceParser, build_event};

const SUPPLEMENTAL_SUFFIX: &str = "supplemental-metadata";

/// Google Takeout media parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleParser;

/// Takeout sidecar JSON. Unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Sidecar {
    title: Option<String>,
    description: Option<String>,
    photo_taken_time: Option<TakeoutTime>,
    creation_time: Option<TakeoutTime>,
    geo_data: Option<GeoBlock>,
    geo_data_exif: Option<GeoBlock>,
    people: Vec<Person>,
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TakeoutTime {
    timestamp: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Person {
    name: Option<String>,
}

/// Media name a sidecar describes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Referent {
    /// Full file name, e.g. `img_1.jpg`.
    Name(String),
    /// Name without extension, e.g. `img_1`.
    Stem(String),
}

impl Referent {
    /// Work out which media file a sidecar name refers to (lower-cased input).
    fn from_sidecar_name(name: &str) -> Option<Self> {
        let base = name.strip_suffix(".json")?;
        let (base, counter) = split_counter(base);
        let base = strip_supplemental(base);

        match base.rsplit_once('.') {
            Some((stem, ext)) if is_media_extension(ext) => Some(Self::Name(match counter {
                Some(counter) => format!("{stem}{counter}.{ext}"),
                None => base.to_string(),
            })),
            _ if base.is_empty() => None,
            _ => Some(Self::Stem(format!("{base}{}", counter.unwrap_or_default()))),
        }
    }
}

/// Split a trailing duplicate counter: `img.jpg(1)` → (`img.jpg`, `(1)`).
fn split_counter(base: &str) -> (&str, Option<&str>) {
    if let Some(open) = base.rfind('(') {
        let counter = &base[open..];
        let digits = counter
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or_default();
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return (&base[..open], Some(counter));
        }
    }
    (base, None)
}

/// Drop a (possibly truncated) `.supplemental-metadata` suffix.
fn strip_supplemental(base: &str) -> &str {
    match base.rsplit_once('.') {
        Some((rest, suffix))
            if !suffix.is_empty()
                && SUPPLEMENTAL_SUFFIX.starts_with(suffix)
                && extension_of(rest).is_some_and(|ext| is_media_extension(&ext)) =>
        {
            rest
        }
        _ => base,
    }
}

fn parent_dir(path: &str) -> String {
    path.rsplit_once('/')
        .map(|(dir, _)| dir.to_lowercase())
        .unwrap_or_default()
}

/// Sidecars of one batch, indexed by directory and referent.
#[derive(Debug, Default)]
struct SidecarIndex {
    by_referent: HashMap<(String, Referent), usize>,
}

impl SidecarIndex {
    fn build(files: &[RawFile]) -> Self {
        let mut index = Self::default();
        for (i, file) in files.iter().enumerate() {
            let name = file.name().to_lowercase();
            if let Some(referent) = Referent::from_sidecar_name(&name) {
                index
                    .by_referent
                    .entry((parent_dir(&file.path), referent))
                    .or_insert(i);
            }
        }
        index
    }

    fn find(&self, media: &RawFile) -> Option<usize> {
        let dir = parent_dir(&media.path);
        let name = media.name().to_lowercase();
        let stem = name
            .rsplit_once('.')
            .map_or(name.as_str(), |(stem, _)| stem)
            .to_string();

        self.by_referent
            .get(&(dir.clone(), Referent::Name(name)))
            .or_else(|| self.by_referent.get(&(dir, Referent::Stem(stem))))
            .copied()
    }
}

fn mime_type(ext: &str) -> Option<&'static str> {
    Some(match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "3gp" => "video/3gpp",
        "webm" => "video/webm",
        "mpg" | "mpeg" => "video/mpeg",
        _ => return None,
    })
}

impl SourceParser for GoogleParser {
    fn source(&self) -> ImportSource {
        ImportSource::Google
    }

    fn parse(&self, files: &[RawFile], ctx: &mut ParseContext<'_>) -> ImportResult<()> {
        let index = SidecarIndex::build(files);
        debug!(
            files = files.len(),
            sidecars = index.by_referent.len(),
            "Parsing Google Takeout batch"
        );

        for file in files {
            if ctx.is_aborted() {
                break;
            }
            let Some(ext) = file.extension().filter(|ext| is_media_extension(ext)) else {
                continue;
            };
            ctx.file_processed();

            let sidecar_file = index.find(file).map(|i| &files[i]);
            let (sidecar, sidecar_error) = match sidecar_file {
                Some(sidecar_file) => match serde_json::from_slice::<Sidecar>(&sidecar_file.bytes) {
                    Ok(sidecar) => (Some(sidecar), None),
                    Err(e) => {
                        warn!(file = %sidecar_file.path, error = %e, "Unreadable sidecar, falling back to file name");
                        (None, Some(format!("unreadable sidecar {}: {e}", sidecar_file.path)))
                    }
                },
                None => (None, None),
            };
            let sidecar = sidecar.unwrap_or_default();

            let taken = sidecar.photo_taken_time.as_ref().and_then(|t| t.timestamp.as_ref());
            let created = sidecar.creation_time.as_ref().and_then(|t| t.timestamp.as_ref());
            let mut signals = Vec::with_capacity(4);
            signals.extend(taken.map(DateSignal::Timestamp));
            signals.extend(created.map(DateSignal::Timestamp));
            signals.push(DateSignal::FileName(file.name()));
            signals.extend(file.folder().map(DateSignal::Folder));

            let Some(start) = resolve(&signals) else {
                let message = match sidecar_error {
                    Some(reason) => format!("Skipped {}: missing date ({reason})", file.name()),
                    None => format!("Skipped {}: missing date", file.name()),
                };
                ctx.skip(message, &file.path);
                continue;
            };

            let location = resolve_location(&[sidecar.geo_data.as_ref(), sidecar.geo_data_exif.as_ref()]);
            let is_video = is_video_extension(&ext);
            let record = RawRecord::GooglePhoto(PhotoRecord {
                file_name: file.name().to_string(),
                sidecar_title: sidecar.title.clone(),
                description: sidecar.description.clone(),
                is_video,
            });
            let Some(classification) = classify(&record, location.as_ref(), ctx.defaults()) else {
                ctx.skip(format!("Skipped {}: no title", file.path), &file.path);
                continue;
            };

            let people: Vec<Value> = sidecar
                .people
                .iter()
                .filter_map(|p| p.name.clone())
                .filter(|name| !name.trim().is_empty())
                .map(Value::String)
                .collect();

            let event = build_event(classification, &start, Source::Google)
                .with_source_id(file.path.clone())
                .with_location(location)
                .with_media(MediaAttachment {
                    file_name: file.name().to_string(),
                    kind: if is_video { MediaKind::Video } else { MediaKind::Photo },
                    mime_type: mime_type(&ext).map(String::from),
                })
                .with_metadata("path", file.path.clone())
                .with_metadata("sidecar", sidecar_file.map(|f| f.path.clone()))
                .with_metadata("url", sidecar.url)
                .with_metadata("people", (!people.is_empty()).then_some(people));
            ctx.push(event);
        }

        Ok(())
    }
}
