//! Event admission, facility impact evaluation, and alert orchestration.

pub mod admission;
pub mod catalog;
pub mod domain;
pub mod geodesy;
pub mod impact;
pub mod notify;
pub mod orchestrator;
pub mod registry;
pub mod router;
pub mod scml;
pub mod setup;
pub mod tiers;

#[cfg(test)]
mod tests;

pub use admission::{Admission, AdmissionGate, RejectReason};
pub use catalog::{CatalogError, CatalogKey, CatalogRecord, DispatchCommand, EventCatalog, FileCatalog};
pub use domain::{Coordinates, EventId, Facility, SeismicEvent};
pub use geodesy::{distance_km, GeodesyError, GreatCircle};
pub use impact::{EvaluationError, ImpactEvaluator, ImpactRecord, ImpactReport};
pub use notify::{
    AlertEnvelope, AlertNotifier, AlertTemplate, MailTransport, NotificationError,
    OutboxNotifier, RenderedAlert, SendmailNotifier,
};
pub use orchestrator::{
    AlertOrchestrator, BatchSummary, EventOutcome, EventStatus, PipelineError, PipelineStage,
};
pub use registry::{FacilityRegistry, RegistryError};
pub use router::alert_router;
pub use scml::{to_scml, ScmlError};
pub use setup::{build_orchestrator, ConfiguredOrchestrator, SetupError};
pub use tiers::{RadiusMeters, RadiusTier, TierLoadError, TierTable, TierTableError};
