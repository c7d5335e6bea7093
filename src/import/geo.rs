//! Location resolution from competing geo blocks.

use serde::{Deserialize, Serialize};

use crate::model::Location;

/// A raw geo block as found in an export (Takeout `geoData`, `geoDataExif`,
/// a Facebook place coordinate, an iCalendar `GEO` line).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeoBlock {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
}

impl GeoBlock {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude: None,
        }
    }

    /// Validate this block on its own.
    #[must_use]
    pub fn to_location(&self) -> Option<Location> {
        let location = Location::new(self.latitude?, self.longitude?)?;
        Some(location.with_altitude(self.altitude))
    }
}

/// Return the first usable location among `candidates`, most trusted first.
///
/// Absent blocks are skipped, as are blocks that fail validation, so a
/// `(0, 0)` primary falls through to the next candidate.
#[must_use]
pub fn resolve_location(candidates: &[Option<&GeoBlock>]) -> Option<Location> {
    candidates
        .iter()
        .flatten()
        .find_map(|block| block.to_location())
}

/// Parse an iCalendar `GEO` value (`lat;lon`).
#[must_use]
pub fn parse_geo_pair(value: &str) -> Option<GeoBlock> {
    let (lat, lon) = value.split_once([';', ','])?;
    Some(GeoBlock::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_no_location() {
        assert!(GeoBlock::new(0.0, 0.0).to_location().is_none());
        assert!(resolve_location(&[Some(&GeoBlock::new(0.0, 0.0))]).is_none());
    }

    #[test]
    fn test_primary_wins_over_exif() {
        let primary = GeoBlock::new(48.85, 2.35);
        let exif = GeoBlock::new(40.71, -74.0);

        let location = resolve_location(&[Some(&primary), Some(&exif)]).unwrap();
        assert!((location.latitude - 48.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sentinel_primary_falls_through() {
        let primary = GeoBlock::new(0.0, 0.0);
        let exif = GeoBlock {
            altitude: Some(35.5),
            ..GeoBlock::new(40.71, -74.0)
        };

        let location = resolve_location(&[Some(&primary), Some(&exif)]).unwrap();
        assert!((location.longitude + 74.0).abs() < f64::EPSILON);
        assert_eq!(location.altitude, Some(35.5));
    }

    #[test]
    fn test_missing_and_out_of_range() {
        let partial = GeoBlock {
            latitude: Some(10.0),
            ..GeoBlock::default()
        };
        let bad = GeoBlock::new(95.0, 10.0);

        assert!(resolve_location(&[None, Some(&partial), Some(&bad)]).is_none());
        assert!(resolve_location(&[]).is_none());
    }

    #[test]
    fn test_deserialize_takeout_block() {
        let block: GeoBlock =
            serde_json::from_str(r#"{"latitude": 1.5, "longitude": 2.5, "latitudeSpan": 0.0}"#).unwrap();
        assert_eq!(block.altitude, None);
        assert!(block.to_location().is_some());
    }

    #[test]
    fn test_parse_geo_pair() {
        let block = parse_geo_pair("37.386013;-122.082932").unwrap();
        assert_eq!(block.latitude, Some(37.386_013));
        assert!(parse_geo_pair("nowhere").is_none());
        assert!(parse_geo_pair("1.0;x").is_none());
    }
}
