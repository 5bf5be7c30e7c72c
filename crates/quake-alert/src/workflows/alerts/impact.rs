use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Coordinates, EventId, SeismicEvent};
use super::geodesy::{self, GeodesyError};
use super::registry::FacilityRegistry;
use super::tiers::TierTable;

/// A facility inside the alert radius of one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRecord {
    pub facility: String,
    pub distance_km: f64,
    pub event_id: EventId,
}

/// Outcome of evaluating one event against every facility.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub event_id: EventId,
    pub origin_time: DateTime<Utc>,
    pub magnitude: Option<f64>,
    pub epicenter: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    /// Radius of the matched tier; `None` when the magnitude matched no tier.
    pub radius_km: Option<f64>,
    /// Sorted ascending by distance, ties by facility name.
    pub impacts: Vec<ImpactRecord>,
}

impl ImpactReport {
    pub fn has_impacts(&self) -> bool {
        !self.impacts.is_empty()
    }

    pub fn nearest(&self) -> Option<&ImpactRecord> {
        self.impacts.first()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("event resource '{0}' does not yield an event identifier")]
    Unidentified(String),
    #[error("event {0} has no epicenter")]
    MissingEpicenter(EventId),
    #[error("event {event_id} has an invalid epicenter: {source}")]
    InvalidEpicenter {
        event_id: EventId,
        #[source]
        source: GeodesyError,
    },
}

/// Stateless evaluator combining the facility registry and radius tiers.
#[derive(Debug, Clone)]
pub struct ImpactEvaluator {
    registry: Arc<FacilityRegistry>,
    tiers: Arc<TierTable>,
}

impl ImpactEvaluator {
    pub fn new(registry: Arc<FacilityRegistry>, tiers: Arc<TierTable>) -> Self {
        Self { registry, tiers }
    }

    pub fn registry(&self) -> &FacilityRegistry {
        &self.registry
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn evaluate(&self, event: &SeismicEvent) -> Result<ImpactReport, EvaluationError> {
        let event_id = event
            .event_id()
            .ok_or_else(|| EvaluationError::Unidentified(event.resource_ref.clone()))?;
        let epicenter = event
            .epicenter
            .ok_or_else(|| EvaluationError::MissingEpicenter(event_id.clone()))?;
        let epicenter =
            geodesy::validate(epicenter).map_err(|source| EvaluationError::InvalidEpicenter {
                event_id: event_id.clone(),
                source,
            })?;

        let radius = self.tiers.radius_for(event.magnitude);
        let mut impacts = Vec::new();

        if let Some(radius) = radius {
            for facility in self.registry.all() {
                // Registry locations are validated on load, so only the epicenter can fail.
                let line = geodesy::inverse(facility.location, epicenter).map_err(|source| {
                    EvaluationError::InvalidEpicenter {
                        event_id: event_id.clone(),
                        source,
                    }
                })?;

                if radius.covers(line.distance_km) {
                    impacts.push(ImpactRecord {
                        facility: facility.name.clone(),
                        distance_km: line.distance_km,
                        event_id: event_id.clone(),
                    });
                }
            }
        }

        impacts.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then_with(|| a.facility.cmp(&b.facility))
        });

        Ok(ImpactReport {
            event_id,
            origin_time: event.origin_time,
            magnitude: event.magnitude,
            epicenter,
            place: event.place.clone(),
            radius_km: radius.map(|radius| radius.as_km()),
            impacts,
        })
    }
}
