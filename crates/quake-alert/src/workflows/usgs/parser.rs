use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::workflows::alerts::{Coordinates, SeismicEvent};

#[derive(Debug, Deserialize)]
pub(crate) struct FeatureCollection {
    #[serde(default)]
    pub(crate) features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Feature {
    #[serde(default)]
    id: Option<String>,
    properties: Properties,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Properties {
    #[serde(default)]
    net: Option<String>,
    #[serde(default)]
    mag: Option<f64>,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    place: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    /// `[longitude, latitude, depth_km]`
    #[serde(default)]
    coordinates: Vec<f64>,
}

/// Why a feature could not become an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FeatureDefect {
    MissingResource,
    MissingAgency,
    MissingTime,
}

impl FeatureDefect {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            FeatureDefect::MissingResource => "no detail link or id",
            FeatureDefect::MissingAgency => "no contributing network",
            FeatureDefect::MissingTime => "no valid origin time",
        }
    }
}

impl Feature {
    /// A missing or short geometry leaves the epicenter empty; that is judged later.
    pub(crate) fn into_event(self) -> Result<SeismicEvent, FeatureDefect> {
        let Feature {
            id,
            properties,
            geometry,
        } = self;

        let resource_ref = non_blank(properties.detail)
            .or_else(|| non_blank(id))
            .or_else(|| non_blank(properties.url))
            .ok_or(FeatureDefect::MissingResource)?;
        let agency = non_blank(properties.net).ok_or(FeatureDefect::MissingAgency)?;
        let origin_time = properties
            .time
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or(FeatureDefect::MissingTime)?;

        let coordinates = geometry
            .map(|geometry| geometry.coordinates)
            .unwrap_or_default();
        let epicenter = match coordinates.as_slice() {
            [longitude, latitude, ..] => Some(Coordinates::new(*latitude, *longitude)),
            _ => None,
        };
        let depth_km = coordinates.get(2).copied();

        Ok(SeismicEvent {
            resource_ref,
            agency,
            origin_time,
            epicenter,
            depth_km,
            magnitude: properties.mag,
            place: non_blank(properties.place),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}
