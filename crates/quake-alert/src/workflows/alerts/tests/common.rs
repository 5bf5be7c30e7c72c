use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};

use crate::workflows::alerts::geodesy;
use crate::workflows::alerts::{
    AlertNotifier, AlertOrchestrator, CatalogError, CatalogKey, Coordinates, EventCatalog,
    EventId, Facility, FacilityRegistry, ImpactEvaluator, ImpactReport, NotificationError,
    SeismicEvent, TierTable,
};

pub(super) const AGENCIES: [&str; 4] = ["ci", "nc", "nn", "uw"];

/// Epicenter used by most fixtures; facilities are placed relative to it.
pub(super) fn epicenter() -> Coordinates {
    Coordinates::new(37.0, -121.0)
}

pub(super) fn origin_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 4, 18, 30, 0)
        .single()
        .expect("valid time")
}

pub(super) fn event(id: &str, agency: &str, magnitude: Option<f64>) -> SeismicEvent {
    SeismicEvent {
        resource_ref: format!(
            "https://earthquake.usgs.gov/earthquakes/feed/v1.0/detail/{id}.geojson"
        ),
        agency: agency.to_string(),
        origin_time: origin_time(),
        epicenter: Some(epicenter()),
        depth_km: Some(8.0),
        magnitude,
        place: Some("10 km NE of Gilroy, CA".to_string()),
    }
}

/// A facility `distance_km` due east of the fixture epicenter.
pub(super) fn facility_at(name: &str, distance_km: f64) -> Facility {
    let location = geodesy::destination(epicenter(), 90.0, distance_km);
    Facility {
        name: name.to_string(),
        location,
    }
}

pub(super) fn registry(facilities: Vec<Facility>) -> Arc<FacilityRegistry> {
    Arc::new(FacilityRegistry::new(facilities).expect("valid registry"))
}

pub(super) fn evaluator(facilities: Vec<Facility>) -> ImpactEvaluator {
    ImpactEvaluator::new(registry(facilities), Arc::new(TierTable::standard()))
}

/// Two sites: one inside every tier's radius, one only inside the M6+ radius.
pub(super) fn default_facilities() -> Vec<Facility> {
    vec![facility_at("Pump Station", 30.0), facility_at("Reservoir", 150.0)]
}

pub(super) fn orchestrator(
    catalog: Arc<MemoryCatalog>,
    notifier: Arc<MemoryNotifier>,
) -> AlertOrchestrator<MemoryCatalog, MemoryNotifier> {
    AlertOrchestrator::new(AGENCIES, catalog, evaluator(default_facilities()), notifier)
}

#[derive(Default)]
pub(super) struct MemoryCatalog {
    records: Mutex<BTreeMap<EventId, SeismicEvent>>,
    lookups: AtomicUsize,
    persists: AtomicUsize,
    /// Persisting this id fails.
    pub(super) reject_persist: Option<String>,
    pub(super) unavailable: bool,
}

impl MemoryCatalog {
    pub(super) fn failing_persist(id: &str) -> Self {
        Self {
            reject_persist: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub(super) fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub(super) fn seed(&self, event: &SeismicEvent) {
        let id = event.event_id().expect("fixture has id");
        self.records
            .lock()
            .expect("catalog lock")
            .insert(id, event.clone());
    }

    pub(super) fn contains(&self, id: &str) -> bool {
        self.records
            .lock()
            .expect("catalog lock")
            .contains_key(&EventId(id.to_string()))
    }

    pub(super) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(super) fn persists(&self) -> usize {
        self.persists.load(Ordering::SeqCst)
    }
}

impl EventCatalog for MemoryCatalog {
    fn exists(&self, key: &CatalogKey) -> Result<bool, CatalogError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(CatalogError::Unavailable("catalog offline".to_string()));
        }
        Ok(self
            .records
            .lock()
            .expect("catalog lock")
            .contains_key(&key.event_id))
    }

    fn persist(&self, key: &CatalogKey, event: &SeismicEvent) -> Result<(), CatalogError> {
        self.persists.fetch_add(1, Ordering::SeqCst);
        if self.reject_persist.as_deref() == Some(key.event_id.as_str()) {
            return Err(CatalogError::Unavailable("disk full".to_string()));
        }
        self.records
            .lock()
            .expect("catalog lock")
            .insert(key.event_id.clone(), event.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifier {
    reports: Mutex<Vec<ImpactReport>>,
    pub(super) fail: bool,
}

impl MemoryNotifier {
    pub(super) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(super) fn reports(&self) -> Vec<ImpactReport> {
        self.reports.lock().expect("notifier lock").clone()
    }
}

impl AlertNotifier for MemoryNotifier {
    fn notify(&self, report: &ImpactReport) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Transport {
                command: "memory".to_string(),
                detail: "relay refused".to_string(),
            });
        }
        self.reports
            .lock()
            .expect("notifier lock")
            .push(report.clone());
        Ok(())
    }
}

pub(super) async fn read_json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
