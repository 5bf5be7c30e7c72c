use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dedup key for a feed event, derived from its resource reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub String);

impl EventId {
    /// Takes the last `/` segment of `resource` and drops everything from the first `.`.
    ///
    /// `https://earthquake.usgs.gov/earthquakes/feed/v1.0/detail/ci40123456.geojson`
    /// becomes `ci40123456`. Returns `None` when nothing is left.
    pub fn derive(resource: &str) -> Option<Self> {
        let segment = resource.rsplit('/').next().unwrap_or_default();
        let id = segment.split('.').next().unwrap_or_default();

        if id.is_empty() {
            None
        } else {
            Some(Self(id.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// One event as supplied by the feed decoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    /// Feed resource reference the event identifier is derived from.
    pub resource_ref: String,
    /// Contributing network code, e.g. `ci`.
    pub agency: String,
    pub origin_time: DateTime<Utc>,
    #[serde(default)]
    pub epicenter: Option<Coordinates>,
    #[serde(default)]
    pub depth_km: Option<f64>,
    #[serde(default)]
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub place: Option<String>,
}

impl SeismicEvent {
    pub fn event_id(&self) -> Option<EventId> {
        EventId::derive(&self.resource_ref)
    }
}

/// A monitored site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    pub location: Coordinates,
}

impl Facility {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            location: Coordinates::new(latitude, longitude),
        }
    }
}
