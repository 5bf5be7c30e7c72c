//! Decoder for the USGS GeoJSON summary feeds
//! (`https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/*.geojson`).

mod client;
mod parser;

pub use client::{FeedClient, DEFAULT_FEED_URL};

use std::io::Read;
use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::workflows::alerts::SeismicEvent;

#[derive(Debug)]
pub enum FeedError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Http(reqwest::Error),
    Status { url: String, status: u16 },
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Io(err) => write!(f, "failed to read event feed: {}", err),
            FeedError::Json(err) => write!(f, "invalid GeoJSON event feed: {}", err),
            FeedError::Http(err) => write!(f, "failed to fetch event feed: {}", err),
            FeedError::Status { url, status } => {
                write!(f, "event feed {} answered with status {}", url, status)
            }
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Io(err) => Some(err),
            FeedError::Json(err) => Some(err),
            FeedError::Http(err) => Some(err),
            FeedError::Status { .. } => None,
        }
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

/// Events decoded from one feed snapshot, in feed order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedSnapshot {
    pub events: Vec<SeismicEvent>,
    /// Features dropped because they lacked an identifier, network or time.
    pub ignored: usize,
}

pub struct UsgsFeedReader;

impl UsgsFeedReader {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<FeedSnapshot, FeedError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<FeedSnapshot, FeedError> {
        let collection: parser::FeatureCollection = serde_json::from_reader(reader)?;
        Ok(Self::collect(collection))
    }

    pub fn from_json_str(raw: &str) -> Result<FeedSnapshot, FeedError> {
        let collection: parser::FeatureCollection = serde_json::from_str(raw)?;
        Ok(Self::collect(collection))
    }

    fn collect(collection: parser::FeatureCollection) -> FeedSnapshot {
        let mut snapshot = FeedSnapshot::default();

        for (index, feature) in collection.features.into_iter().enumerate() {
            match feature.into_event() {
                Ok(event) => snapshot.events.push(event),
                Err(defect) => {
                    warn!(feature = index, reason = defect.label(), "ignoring feed feature");
                    snapshot.ignored += 1;
                }
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::alerts::{Coordinates, EventId};
    use chrono::{TimeZone, Utc};
    use std::io::Cursor;

    const FEED: &str = r#"{
      "type": "FeatureCollection",
      "metadata": {"title": "USGS Magnitude 2.5+ Earthquakes, Past Hour"},
      "features": [
        {
          "type": "Feature",
          "id": "ci40123456",
          "properties": {
            "mag": 4.3,
            "place": "12 km SW of Ridgecrest, CA",
            "time": 1751653800000,
            "net": "ci",
            "detail": "https://earthquake.usgs.gov/earthquakes/feed/v1.0/detail/ci40123456.geojson"
          },
          "geometry": {"type": "Point", "coordinates": [-117.75, 35.55, 7.9]}
        },
        {
          "type": "Feature",
          "id": "ak0251234",
          "properties": {"mag": null, "time": 1751653900000, "net": "ak", "place": ""},
          "geometry": null
        },
        {
          "type": "Feature",
          "id": "nn00901234",
          "properties": {"mag": 2.7, "net": "nn"},
          "geometry": {"type": "Point", "coordinates": [-119.9, 38.9, 3.0]}
        }
      ]
    }"#;

    #[test]
    fn decodes_features_into_events() {
        let snapshot = UsgsFeedReader::from_reader(Cursor::new(FEED)).expect("feed parses");
        assert_eq!(snapshot.events.len(), 2);
        assert_eq!(snapshot.ignored, 1, "feature without time is ignored");

        let first = &snapshot.events[0];
        assert_eq!(first.event_id(), Some(EventId("ci40123456".to_string())));
        assert_eq!(first.agency, "ci");
        assert_eq!(first.magnitude, Some(4.3));
        assert_eq!(first.epicenter, Some(Coordinates::new(35.55, -117.75)));
        assert_eq!(first.depth_km, Some(7.9));
        assert_eq!(
            first.origin_time,
            Utc.with_ymd_and_hms(2025, 7, 4, 18, 30, 0)
                .single()
                .expect("valid time")
        );
        assert_eq!(first.place.as_deref(), Some("12 km SW of Ridgecrest, CA"));
    }

    #[test]
    fn falls_back_to_feature_id_and_keeps_missing_geometry() {
        let snapshot = UsgsFeedReader::from_json_str(FEED).expect("feed parses");
        let second = &snapshot.events[1];
        assert_eq!(second.resource_ref, "ak0251234");
        assert_eq!(second.magnitude, None);
        assert_eq!(second.epicenter, None);
        assert_eq!(second.place, None);
    }

    #[test]
    fn rejects_malformed_json() {
        match UsgsFeedReader::from_json_str("{\"features\": [") {
            Err(FeedError::Json(_)) => {}
            other => panic!("expected json error, got {other:?}"),
        }
    }

    #[test]
    fn from_path_propagates_io_errors() {
        match UsgsFeedReader::from_path("./missing-feed.geojson") {
            Err(FeedError::Io(_)) => {}
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
