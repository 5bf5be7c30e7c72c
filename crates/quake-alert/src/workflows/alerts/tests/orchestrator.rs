use super::common::*;
use std::sync::Arc;

use crate::workflows::alerts::{Coordinates, EventStatus, PipelineStage, RejectReason};

fn status_of<'a>(
    summary: &'a crate::workflows::alerts::BatchSummary,
    id: &str,
) -> &'a EventStatus {
    &summary
        .outcomes
        .iter()
        .find(|outcome| outcome.event_id.as_ref().map(|e| e.as_str()) == Some(id))
        .unwrap_or_else(|| panic!("no outcome for {id}"))
        .status
}

#[test]
fn batch_routes_events_through_every_stage() {
    let catalog = Arc::new(MemoryCatalog::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = orchestrator(catalog.clone(), notifier.clone());

    let batch = vec![
        event("ci40123456", "ci", Some(4.5)),
        event("nc73800000", "nc", Some(2.1)),
        event("xx0001", "xx", Some(7.5)),
    ];
    let summary = orchestrator.process_batch(&batch);

    assert_eq!(summary.total(), 3);
    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.alerted, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(
        status_of(&summary, "ci40123456"),
        &EventStatus::Alerted {
            impacted_facilities: 1
        }
    );
    assert_eq!(
        status_of(&summary, "nc73800000"),
        &EventStatus::Recorded {
            impacted_facilities: 0
        }
    );
    assert_eq!(
        status_of(&summary, "xx0001"),
        &EventStatus::Skipped {
            reason: RejectReason::AgencyNotAllowed
        }
    );

    assert!(catalog.contains("ci40123456"));
    assert!(catalog.contains("nc73800000"));
    assert!(!catalog.contains("xx0001"));

    let reports = notifier.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].event_id.as_str(), "ci40123456");
    assert_eq!(reports[0].impacts[0].facility, "Pump Station");
}

#[test]
fn reprocessing_the_same_batch_has_no_side_effects() {
    let catalog = Arc::new(MemoryCatalog::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = orchestrator(catalog.clone(), notifier.clone());
    let batch = vec![
        event("ci40123456", "ci", Some(6.3)),
        event("uw61900000", "uw", Some(4.0)),
    ];

    let first = orchestrator.process_batch(&batch);
    assert_eq!(first.admitted, 2);
    assert_eq!(catalog.persists(), 2);
    assert_eq!(notifier.reports().len(), 2);

    let second = orchestrator.process_batch(&batch);
    assert_eq!(second.admitted, 0);
    assert_eq!(second.skipped, 2);
    assert!(second.outcomes.iter().all(|outcome| outcome.status
        == EventStatus::Skipped {
            reason: RejectReason::AlreadyRecorded
        }));
    assert_eq!(catalog.persists(), 2);
    assert_eq!(notifier.reports().len(), 2);
}

#[test]
fn persistence_failure_stops_that_event_only() {
    let catalog = Arc::new(MemoryCatalog::failing_persist("ci1"));
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = orchestrator(catalog.clone(), notifier.clone());
    let batch = vec![event("ci1", "ci", Some(5.0)), event("ci2", "ci", Some(5.0))];

    let summary = orchestrator.process_batch(&batch);

    assert_eq!(summary.admitted, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.alerted, 1);
    match status_of(&summary, "ci1") {
        EventStatus::Failed { stage, error } => {
            assert_eq!(*stage, PipelineStage::Persist);
            assert!(error.contains("persistence failure"), "{error}");
        }
        other => panic!("expected persistence failure, got {other:?}"),
    }

    let reports = notifier.reports();
    assert_eq!(reports.len(), 1, "failed event must not be evaluated or notified");
    assert_eq!(reports[0].event_id.as_str(), "ci2");
    assert!(!catalog.contains("ci1"));
}

#[test]
fn notification_failure_is_counted_and_not_retried() {
    let catalog = Arc::new(MemoryCatalog::default());
    let orchestrator = orchestrator(catalog.clone(), Arc::new(MemoryNotifier::failing()));
    let batch = vec![event("nn00901234", "nn", Some(4.6))];

    let summary = orchestrator.process_batch(&batch);
    assert_eq!(summary.admitted, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.alerted, 0);
    assert!(matches!(
        status_of(&summary, "nn00901234"),
        EventStatus::Failed {
            stage: PipelineStage::Notify,
            ..
        }
    ));
    assert!(catalog.contains("nn00901234"));

    let again = orchestrator.process_batch(&batch);
    assert_eq!(again.skipped, 1);
}

#[test]
fn invalid_epicenter_is_recorded_but_reported_as_failure() {
    let catalog = Arc::new(MemoryCatalog::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = orchestrator(catalog.clone(), notifier.clone());

    let mut missing = event("ci3", "ci", Some(5.2));
    missing.epicenter = None;
    let mut out_of_range = event("ci4", "ci", Some(5.2));
    out_of_range.epicenter = Some(Coordinates::new(37.0, 200.0));
    let fine = event("ci5", "ci", Some(5.2));

    let summary = orchestrator.process_batch([&missing, &out_of_range, &fine]);

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.alerted, 1);
    for id in ["ci3", "ci4"] {
        assert!(matches!(
            status_of(&summary, id),
            EventStatus::Failed {
                stage: PipelineStage::Evaluate,
                ..
            }
        ));
        assert!(catalog.contains(id));
    }
    assert_eq!(notifier.reports().len(), 1);
}

#[test]
fn catalog_lookup_failure_is_not_counted_as_admitted() {
    let catalog = Arc::new(MemoryCatalog::unavailable());
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = orchestrator(catalog.clone(), notifier.clone());

    let summary = orchestrator.process_batch(&[event("ci6", "ci", Some(4.5))]);

    assert_eq!(summary.admitted, 0);
    assert_eq!(summary.failed, 1);
    assert!(matches!(
        status_of(&summary, "ci6"),
        EventStatus::Failed {
            stage: PipelineStage::Admission,
            ..
        }
    ));
    assert_eq!(catalog.persists(), 0);
    assert!(notifier.reports().is_empty());
}

#[test]
fn unidentified_events_are_skipped_without_id() {
    let orchestrator = orchestrator(
        Arc::new(MemoryCatalog::default()),
        Arc::new(MemoryNotifier::default()),
    );
    let mut event = event("ci7", "ci", Some(4.5));
    event.resource_ref = String::new();

    let summary = orchestrator.process_batch(&[event]);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.outcomes[0].event_id, None);
    assert_eq!(
        summary.outcomes[0].status,
        EventStatus::Skipped {
            reason: RejectReason::Unidentified
        }
    );
}

#[test]
fn overlapping_batches_persist_each_event_once() {
    let catalog = Arc::new(MemoryCatalog::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let orchestrator = Arc::new(orchestrator(catalog.clone(), notifier.clone()));
    let batch: Vec<_> = (0..20)
        .map(|n| event(&format!("ci{n}"), "ci", Some(4.5)))
        .collect();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let orchestrator = orchestrator.clone();
            let batch = &batch;
            scope.spawn(move || orchestrator.process_batch(batch));
        }
    });

    assert_eq!(catalog.persists(), 20);
    assert_eq!(notifier.reports().len(), 20);
}

#[test]
fn summary_serializes_with_flat_status() {
    let orchestrator = orchestrator(
        Arc::new(MemoryCatalog::default()),
        Arc::new(MemoryNotifier::default()),
    );
    let summary = orchestrator.process_batch(&[event("ci8", "ci", Some(4.5))]);
    let json = serde_json::to_value(&summary).expect("serializes");

    assert_eq!(json["alerted"], 1);
    assert_eq!(json["outcomes"][0]["event_id"], "ci8");
    assert_eq!(json["outcomes"][0]["status"], "alerted");
    assert_eq!(json["outcomes"][0]["impacted_facilities"], 1);
}
