use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::admission::{Admission, AdmissionGate, RejectReason};
use super::catalog::{CatalogError, EventCatalog};
use super::domain::{EventId, SeismicEvent};
use super::impact::{EvaluationError, ImpactEvaluator, ImpactReport};
use super::notify::{AlertNotifier, NotificationError};

/// Pipeline step an event reached before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Admission,
    Persist,
    Evaluate,
    Notify,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Admission => "admission",
            PipelineStage::Persist => "persist",
            PipelineStage::Evaluate => "evaluate",
            PipelineStage::Notify => "notify",
        }
    }
}

/// Per-event failure, tagged with the stage it happened in.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("catalog lookup failed: {0}")]
    Admission(#[source] CatalogError),
    #[error("persistence failure: {0}")]
    Persistence(#[source] CatalogError),
    #[error("invalid input: {0}")]
    InvalidInput(#[from] EvaluationError),
    #[error("notification failure: {0}")]
    Notification(#[from] NotificationError),
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::Admission(_) => PipelineStage::Admission,
            PipelineError::Persistence(_) => PipelineStage::Persist,
            PipelineError::InvalidInput(_) => PipelineStage::Evaluate,
            PipelineError::Notification(_) => PipelineStage::Notify,
        }
    }
}

/// What happened to one event in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EventStatus {
    Skipped { reason: RejectReason },
    Recorded { impacted_facilities: usize },
    Alerted { impacted_facilities: usize },
    Failed { stage: PipelineStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventOutcome {
    /// `None` only when the resource reference yields no identifier.
    pub event_id: Option<EventId>,
    #[serde(flatten)]
    pub status: EventStatus,
}

/// Counts for one batch. `admitted` includes events that later failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub admitted: usize,
    pub skipped: usize,
    pub alerted: usize,
    pub failed: usize,
    pub outcomes: Vec<EventOutcome>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    fn record(&mut self, event_id: Option<EventId>, status: EventStatus) {
        match &status {
            EventStatus::Skipped { .. } => self.skipped += 1,
            EventStatus::Recorded { .. } => {}
            EventStatus::Alerted { .. } => self.alerted += 1,
            EventStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(EventOutcome { event_id, status });
    }
}

/// Drives admission, persistence, evaluation and notification for each event.
pub struct AlertOrchestrator<C, N> {
    gate: AdmissionGate<C>,
    catalog: Arc<C>,
    evaluator: ImpactEvaluator,
    notifier: Arc<N>,
    batch_lock: Mutex<()>,
}

impl<C, N> AlertOrchestrator<C, N>
where
    C: EventCatalog + 'static,
    N: AlertNotifier + 'static,
{
    pub fn new<I, S>(
        allowed_agencies: I,
        catalog: Arc<C>,
        evaluator: ImpactEvaluator,
        notifier: Arc<N>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let gate = AdmissionGate::new(allowed_agencies, catalog.clone());
        Self {
            gate,
            catalog,
            evaluator,
            notifier,
            batch_lock: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> &AdmissionGate<C> {
        &self.gate
    }

    pub fn evaluator(&self) -> &ImpactEvaluator {
        &self.evaluator
    }

    /// Processes events in feed order. Failures stay scoped to their own event.
    ///
    /// Overlapping calls run one after the other so a re-polled window cannot
    /// pass the gate twice before its first record lands.
    pub fn process_batch<'a, I>(&self, events: I) -> BatchSummary
    where
        I: IntoIterator<Item = &'a SeismicEvent>,
    {
        let _batch = self
            .batch_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut summary = BatchSummary::default();

        for event in events {
            let event_id = event.event_id();
            match self.process_event(event) {
                Ok(Step::Skipped(reason)) => {
                    debug!(
                        event_id = event_id.as_ref().map(EventId::as_str).unwrap_or("-"),
                        agency = %event.agency,
                        reason = reason.label(),
                        "event skipped"
                    );
                    summary.record(event_id, EventStatus::Skipped { reason });
                }
                Ok(Step::Completed(report)) => {
                    summary.admitted += 1;
                    let impacted_facilities = report.impacts.len();
                    let status = if report.has_impacts() {
                        EventStatus::Alerted {
                            impacted_facilities,
                        }
                    } else {
                        EventStatus::Recorded {
                            impacted_facilities,
                        }
                    };
                    summary.record(event_id, status);
                }
                Err(err) => {
                    let stage = err.stage();
                    if stage != PipelineStage::Admission {
                        summary.admitted += 1;
                    }
                    let id = event_id.as_ref().map(EventId::as_str).unwrap_or("-");
                    match &err {
                        PipelineError::InvalidInput(_) => {
                            warn!(event_id = id, stage = stage.label(), error = %err, "event evaluation aborted")
                        }
                        _ => {
                            error!(event_id = id, stage = stage.label(), error = %err, "event processing failed")
                        }
                    }
                    summary.record(
                        event_id,
                        EventStatus::Failed {
                            stage,
                            error: err.to_string(),
                        },
                    );
                }
            }
        }

        info!(
            admitted = summary.admitted,
            skipped = summary.skipped,
            alerted = summary.alerted,
            failed = summary.failed,
            "batch processed"
        );
        summary
    }

    fn process_event(&self, event: &SeismicEvent) -> Result<Step, PipelineError> {
        let key = match self.gate.admit(event).map_err(PipelineError::Admission)? {
            Admission::Admitted(key) => key,
            Admission::Rejected(reason) => return Ok(Step::Skipped(reason)),
        };

        info!(event_id = %key.event_id, "creating and dispatching event record");
        self.catalog
            .persist(&key, event)
            .map_err(PipelineError::Persistence)?;

        let report = self.evaluator.evaluate(event)?;
        if report.has_impacts() {
            self.notifier.notify(&report)?;
            info!(
                event_id = %report.event_id,
                impacted = report.impacts.len(),
                "facility alert sent"
            );
        }

        Ok(Step::Completed(report))
    }
}

enum Step {
    Skipped(RejectReason),
    Completed(ImpactReport),
}
