use super::common::*;

use crate::workflows::alerts::{Coordinates, EvaluationError, EventId, Facility, GeodesyError};

fn names(report: &crate::workflows::alerts::ImpactReport) -> Vec<&str> {
    report
        .impacts
        .iter()
        .map(|impact| impact.facility.as_str())
        .collect()
}

#[test]
fn moderate_event_alerts_inside_seventy_one_kilometres_only() {
    let evaluator = evaluator(vec![
        facility_at("Inside", 70.0),
        facility_at("Outside", 71.0005),
    ]);

    let report = evaluator
        .evaluate(&event("ci40123456", "ci", Some(4.5)))
        .expect("evaluates");

    assert_eq!(report.radius_km, Some(71.0));
    assert_eq!(names(&report), vec!["Inside"]);
    let inside = &report.impacts[0];
    assert!((inside.distance_km - 70.0).abs() < 1e-6);
    assert_eq!(inside.event_id, EventId("ci40123456".to_string()));
}

#[test]
fn tier_radius_follows_magnitude() {
    let evaluator = evaluator(vec![facility_at("A", 100.0), facility_at("B", 130.0)]);

    let report = evaluator
        .evaluate(&event("nc1", "nc", Some(5.5)))
        .expect("evaluates");
    assert_eq!(report.radius_km, Some(118.0));
    assert_eq!(names(&report), vec!["A"]);

    let report = evaluator
        .evaluate(&event("nc2", "nc", Some(6.0)))
        .expect("evaluates");
    assert_eq!(report.radius_km, Some(221.0));
    assert_eq!(names(&report), vec!["A", "B"]);
}

#[test]
fn small_or_unknown_magnitude_yields_no_impacts() {
    let evaluator = evaluator(default_facilities());

    for magnitude in [None, Some(2.4), Some(3.94), Some(f64::NAN)] {
        let report = evaluator
            .evaluate(&event("nn00901234", "nn", magnitude))
            .expect("evaluates");
        assert!(!report.has_impacts(), "magnitude {magnitude:?}");
        assert_eq!(report.radius_km, None);
    }
}

#[test]
fn impacts_sorted_by_distance_then_name() {
    let shared = facility_at("Bravo Substation", 20.0).location;
    let evaluator = evaluator(vec![
        facility_at("Far Tank", 60.0),
        Facility {
            name: "Bravo Substation".to_string(),
            location: shared,
        },
        Facility {
            name: "Alpha Substation".to_string(),
            location: shared,
        },
        facility_at("Near Well", 5.0),
    ]);

    let report = evaluator
        .evaluate(&event("uw61900000", "uw", Some(4.8)))
        .expect("evaluates");

    assert_eq!(
        names(&report),
        vec!["Near Well", "Alpha Substation", "Bravo Substation", "Far Tank"]
    );
    assert_eq!(report.nearest().map(|i| i.facility.as_str()), Some("Near Well"));
}

#[test]
fn large_event_reaches_every_site_in_range() {
    let evaluator = evaluator(vec![facility_at("Coast", 700.0), facility_at("Remote", 760.0)]);

    let report = evaluator
        .evaluate(&event("ci9", "ci", Some(8.2)))
        .expect("evaluates");
    assert_eq!(report.radius_km, Some(750.0));
    assert_eq!(names(&report), vec!["Coast"]);
}

#[test]
fn missing_epicenter_is_invalid_input() {
    let evaluator = evaluator(default_facilities());
    let mut event = event("ci40123456", "ci", Some(5.0));
    event.epicenter = None;

    match evaluator.evaluate(&event) {
        Err(EvaluationError::MissingEpicenter(id)) => assert_eq!(id.as_str(), "ci40123456"),
        other => panic!("expected missing epicenter, got {other:?}"),
    }
}

#[test]
fn out_of_range_epicenter_is_invalid_input() {
    let evaluator = evaluator(default_facilities());
    let mut event = event("ci40123456", "ci", Some(5.0));
    event.epicenter = Some(Coordinates::new(91.0, -121.0));

    match evaluator.evaluate(&event) {
        Err(EvaluationError::InvalidEpicenter { source, .. }) => {
            assert_eq!(source, GeodesyError::InvalidLatitude(91.0))
        }
        other => panic!("expected invalid epicenter, got {other:?}"),
    }
}

#[test]
fn report_carries_event_details() {
    let evaluator = evaluator(default_facilities());
    let report = evaluator
        .evaluate(&event("ci40123456", "ci", Some(4.5)))
        .expect("evaluates");

    assert_eq!(report.event_id.as_str(), "ci40123456");
    assert_eq!(report.origin_time, origin_time());
    assert_eq!(report.magnitude, Some(4.5));
    assert_eq!(report.epicenter, epicenter());
    assert_eq!(report.place.as_deref(), Some("10 km NE of Gilroy, CA"));
}
