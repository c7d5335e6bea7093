//! Import types shared by the loader, the parsers and the orchestrator.

use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::import::parsers::generic_csv::FieldMapping;
use crate::model::{Layer, Source};

/// Extensions recognised as photos.
pub const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "heif", "webp", "bmp", "tif", "tiff", "dng", "raw",
];

/// Extensions recognised as videos.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "3gp", "webm", "mpg", "mpeg", "wmv", "mts",
];

/// One input file, already read into memory.
///
/// `path` is the path relative to the import root (forward slashes), so the
/// parent folder name stays available for date fallbacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    /// Create a file from a path and its content.
    pub fn new(path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into().replace('\\', "/"),
            bytes: bytes.into(),
        }
    }

    /// Create a file from text content.
    pub fn from_text(path: impl Into<String>, text: &str) -> Self {
        Self::new(path, text.as_bytes().to_vec())
    }

    /// Final path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Name of the directory containing the file, if any.
    #[must_use]
    pub fn folder(&self) -> Option<&str> {
        let mut segments = self.path.rsplit('/');
        segments.next();
        segments.next().filter(|s| !s.is_empty())
    }

    /// Lower-cased extension of the file name.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        extension_of(self.name())
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Whether the file is a photo or video.
    #[must_use]
    pub fn is_media(&self) -> bool {
        self.extension().is_some_and(|ext| is_media_extension(&ext))
    }
}

/// Lower-cased extension of a file name.
#[must_use]
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// Whether an extension names a photo or video format.
#[must_use]
pub fn is_media_extension(ext: &str) -> bool {
    PHOTO_EXTENSIONS.contains(&ext) || VIDEO_EXTENSIONS.contains(&ext)
}

/// Whether an extension names a video format.
#[must_use]
pub fn is_video_extension(ext: &str) -> bool {
    VIDEO_EXTENSIONS.contains(&ext)
}

/// Which parser an import batch is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSource {
    LinkedIn,
    Google,
    Facebook,
    Csv,
    Ical,
}

impl ImportSource {
    /// Guess the source of a batch from its file names.
    ///
    /// Checks run from the most to the least specific export layout;
    /// anything unrecognised is treated as generic CSV.
    #[must_use]
    pub fn detect(files: &[RawFile]) -> Self {
        let names: Vec<String> = files.iter().map(|f| f.name().to_lowercase()).collect();

        if names
            .iter()
            .any(|n| matches!(n.as_str(), "positions.csv" | "education.csv" | "connections.csv"))
        {
            return Self::LinkedIn;
        }
        if names.iter().any(|n| n.ends_with(".ics")) {
            return Self::Ical;
        }
        if names.iter().any(|n| {
            n.ends_with(".json")
                && (n.starts_with("your_posts")
                    || n.starts_with("posts_")
                    || n.contains("friends")
                    || n.contains("event_responses"))
        }) {
            return Self::Facebook;
        }
        if files.iter().any(RawFile::is_media) {
            return Self::Google;
        }
        Self::Csv
    }

    /// Source tag stamped on events from this parser.
    #[must_use]
    pub const fn event_source(&self) -> Source {
        match self {
            Self::LinkedIn => Source::Linkedin,
            Self::Google => Source::Google,
            Self::Facebook => Source::Facebook,
            Self::Csv => Source::Other,
            Self::Ical => Source::Ical,
        }
    }
}

impl std::fmt::Display for ImportSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LinkedIn => write!(f, "linkedin"),
            Self::Google => write!(f, "google"),
            Self::Facebook => write!(f, "facebook"),
            Self::Csv => write!(f, "csv"),
            Self::Ical => write!(f, "ical"),
        }
    }
}

/// Cooperative cancellation flag.
///
/// Clones share the same flag. Long-running imports check it between
/// per-file work units and stop early, keeping what they have so far.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal(Arc<AtomicBool>);

impl AbortSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Caller-supplied settings for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Applied to every event that has no owner.
    pub user_id: Option<String>,
    /// Layer for CSV rows and calendar entries that don't name one.
    pub default_layer: Layer,
    /// Event type for CSV rows that don't name one.
    pub default_event_type: String,
    /// Source tag for generic CSV events.
    pub csv_source: Source,
    /// Explicit CSV column mapping; detected from headers when `None`.
    pub mapping: Option<FieldMapping>,
    pub abort: AbortSignal,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            user_id: None,
            default_layer: Layer::Media,
            default_event_type: "event".to_string(),
            csv_source: Source::Other,
            mapping: None,
            abort: AbortSignal::new(),
        }
    }
}

/// Parser-level failures.
///
/// These abort the current parser; the orchestrator turns them into a
/// single fatal `ImportError` and keeps the events gathered before.
#[derive(Debug, thiserror::Error)]
pub enum ImportFailure {
    /// IO error while reading input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An explicitly mapped CSV column is missing from a file.
    #[error("Column '{column}' not found in {file}")]
    MissingColumn {
        /// File the column was expected in.
        file: String,
        /// Header name from the mapping.
        column: String,
    },

    /// Input path does not exist.
    #[error("Input not found: {0}")]
    NotFound(String),
}

/// Result type for import operations.
pub type ImportResult<T> = std::result::Result<T, ImportFailure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_file_path_parts() {
        let file = RawFile::from_text("Takeout\\Photos from 2019\\IMG_1.JPG", "");

        assert_eq!(file.path, "Takeout/Photos from 2019/IMG_1.JPG");
        assert_eq!(file.name(), "IMG_1.JPG");
        assert_eq!(file.folder(), Some("Photos from 2019"));
        assert_eq!(file.extension().as_deref(), Some("jpg"));
        assert!(file.is_media());
    }

    #[test]
    fn test_raw_file_without_folder_or_extension() {
        let file = RawFile::from_text("README", "hi");
        assert_eq!(file.folder(), None);
        assert_eq!(file.extension(), None);
        assert!(!file.is_media());
        assert_eq!(file.text(), "hi");
    }

    #[test]
    fn test_detect_source() {
        let linkedin = vec![RawFile::from_text("export/Positions.csv", "")];
        let google = vec![
            RawFile::from_text("a.jpg.json", "{}"),
            RawFile::new("a.jpg", vec![0u8]),
        ];
        let facebook = vec![RawFile::from_text("posts/your_posts_1.json", "[]")];
        let ical = vec![RawFile::from_text("cal.ics", "")];
        let csv = vec![RawFile::from_text("life.csv", "")];

        assert_eq!(ImportSource::detect(&linkedin), ImportSource::LinkedIn);
        assert_eq!(ImportSource::detect(&google), ImportSource::Google);
        assert_eq!(ImportSource::detect(&facebook), ImportSource::Facebook);
        assert_eq!(ImportSource::detect(&ical), ImportSource::Ical);
        assert_eq!(ImportSource::detect(&csv), ImportSource::Csv);
    }

    #[test]
    fn test_abort_signal_shared_between_clones() {
        let signal = AbortSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_aborted());
        signal.abort();
        assert!(clone.is_aborted());
    }
}
