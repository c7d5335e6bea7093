//! Timeline event model for Lifeline.
//!
//! A `TimelineEvent` is the canonical shape every import source converges on.
//! Field names serialize in camelCase to stay compatible with the web
//! client's event store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Life domain an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Economics,
    Education,
    Work,
    Health,
    Relationships,
    Travel,
    Media,
}

impl Layer {
    /// All layers, in display order.
    pub const ALL: [Self; 7] = [
        Self::Economics,
        Self::Education,
        Self::Work,
        Self::Health,
        Self::Relationships,
        Self::Travel,
        Self::Media,
    ];

    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Economics => "economics",
            Self::Education => "education",
            Self::Work => "work",
            Self::Health => "health",
            Self::Relationships => "relationships",
            Self::Travel => "travel",
            Self::Media => "media",
        }
    }
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|layer| layer.as_str() == needle)
            .ok_or_else(|| format!("Unknown layer: {s}"))
    }
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Manual,
    Facebook,
    Instagram,
    Linkedin,
    Google,
    Ical,
    Spotify,
    Apple,
    Other,
}

impl Source {
    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Facebook => "facebook",
            Self::Instagram => "instagram",
            Self::Linkedin => "linkedin",
            Self::Google => "google",
            Self::Ical => "ical",
            Self::Spotify => "spotify",
            Self::Apple => "apple",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "facebook" => Ok(Self::Facebook),
            "instagram" => Ok(Self::Instagram),
            "linkedin" => Ok(Self::Linkedin),
            "google" => Ok(Self::Google),
            "ical" => Ok(Self::Ical),
            "spotify" => Ok(Self::Spotify),
            "apple" => Ok(Self::Apple),
            "other" => Ok(Self::Other),
            _ => Err(format!("Unknown source: {s}")),
        }
    }
}

/// A validated geographic position.
///
/// Construct through [`Location::new`], which rejects out-of-range values
/// and the `(0, 0)` "missing" sentinel that exports use for absent geodata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Informational only, never validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    /// Build a location, or `None` when the coordinates are unusable.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        if latitude == 0.0 && longitude == 0.0 {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            altitude: None,
            name: None,
            city: None,
            country: None,
        })
    }

    /// Attach an altitude.
    #[must_use]
    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }

    /// Attach a place name.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name.filter(|n| !n.trim().is_empty());
        self
    }

    /// Whether the coordinates still satisfy the range invariants.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        Self::new(self.latitude, self.longitude).is_some()
    }
}

/// Kind of media attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

/// A media file referenced by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAttachment {
    pub file_name: String,
    pub kind: MediaKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A canonical life event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    /// Unique identifier (`evt_` prefix)
    pub id: String,

    /// Owner, filled from caller defaults when the source has none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub start_date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,

    pub layer: Layer,

    /// Free-form tag within the layer ("job", "photo", ...)
    pub event_type: String,

    pub source: Source,

    /// Source-native identifier used for idempotent re-import
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaAttachment>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl TimelineEvent {
    /// Create a new event with a random id.
    pub fn new(
        title: impl Into<String>,
        start_date: DateTime<Utc>,
        layer: Layer,
        event_type: impl Into<String>,
        source: Source,
    ) -> Self {
        let now = Utc::now().timestamp_millis();
        let id = format!("evt_{}", &uuid::Uuid::new_v4().simple().to_string()[..16]);

        Self {
            id,
            user_id: None,
            title: title.into(),
            description: None,
            start_date,
            end_date: None,
            layer,
            event_type: event_type.into(),
            source,
            source_id: None,
            location: None,
            media: Vec::new(),
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Override the generated id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description (blank strings are dropped).
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.filter(|d| !d.trim().is_empty());
        self
    }

    /// Set the end date. Ignored when it precedes the start date.
    #[must_use]
    pub fn with_end_date(mut self, end_date: Option<DateTime<Utc>>) -> Self {
        self.end_date = end_date.filter(|end| *end >= self.start_date);
        self
    }

    /// Set the source-native id and derive a stable event id from it.
    #[must_use]
    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        let source_id = source_id.into();
        let key = format!("{}:{source_id}", self.source);
        self.id = format!("evt_{}", crate::import::fingerprint(&key));
        self.source_id = Some(source_id);
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    #[must_use]
    pub fn with_media(mut self, attachment: MediaAttachment) -> Self {
        self.media.push(attachment);
        self
    }

    /// Add a metadata entry. `Null` values are not stored.
    #[must_use]
    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.metadata.insert(key.to_string(), value);
        }
        self
    }

    /// Check the model invariants.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err("end date precedes start date".to_string());
            }
        }
        if let Some(location) = &self.location {
            if !location.is_valid() {
                return Err(format!(
                    "invalid coordinates ({}, {})",
                    location.latitude, location.longitude
                ));
            }
        }
        Ok(())
    }
}
