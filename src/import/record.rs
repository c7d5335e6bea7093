//! Source record shapes.
//!
//! Parsers read one row/object/file into a [`RawRecord`] and hand it to the
//! classifier straight away. Records are never stored.

/// A row of LinkedIn `Positions.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionRecord {
    pub company: String,
    pub title: String,
    pub description: String,
    pub location: String,
}

/// A row of LinkedIn `Education.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EducationRecord {
    pub school: String,
    pub degree: String,
    pub notes: String,
    pub activities: String,
}

/// A row of LinkedIn `Connections.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub position: String,
}

/// A Takeout media file plus whatever its sidecar contributed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoRecord {
    pub file_name: String,
    pub sidecar_title: Option<String>,
    pub description: Option<String>,
    pub is_video: bool,
}

/// An entry of a Facebook posts file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostRecord {
    pub text: Option<String>,
    /// Facebook's own headline ("Ann shared a memory.").
    pub title: Option<String>,
    pub place: Option<String>,
    pub media_count: usize,
}

/// A calendar `VEVENT`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarRecord {
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub categories: Vec<String>,
}

/// A generic CSV row after column mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvRecord {
    pub title: String,
    pub description: Option<String>,
    pub layer: Option<String>,
    pub event_type: Option<String>,
}

/// One source record, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawRecord {
    LinkedInPosition(PositionRecord),
    LinkedInEducation(EducationRecord),
    LinkedInConnection(ConnectionRecord),
    GooglePhoto(PhotoRecord),
    FacebookPost(PostRecord),
    FacebookFriend { name: String },
    FacebookEvent { name: String },
    Csv(CsvRecord),
    Calendar(CalendarRecord),
}

impl RawRecord {
    /// Short label for logs and skip messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::LinkedInPosition(_) => "position",
            Self::LinkedInEducation(_) => "education",
            Self::LinkedInConnection(_) => "connection",
            Self::GooglePhoto(_) => "media",
            Self::FacebookPost(_) => "post",
            Self::FacebookFriend { .. } => "friend",
            Self::FacebookEvent { .. } => "event",
            Self::Csv(_) => "row",
            Self::Calendar(_) => "calendar entry",
        }
    }
}
