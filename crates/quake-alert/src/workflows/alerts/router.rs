use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::json;
use tracing::error;

use super::catalog::EventCatalog;
use super::domain::SeismicEvent;
use super::notify::AlertNotifier;
use super::orchestrator::AlertOrchestrator;
use crate::workflows::usgs::UsgsFeedReader;

/// HTTP endpoints for submitting feed snapshots and ad-hoc impact checks.
pub fn alert_router<C, N>(orchestrator: Arc<AlertOrchestrator<C, N>>) -> Router
where
    C: EventCatalog + 'static,
    N: AlertNotifier + 'static,
{
    Router::new()
        .route("/api/v1/feed", post(feed_handler::<C, N>))
        .route("/api/v1/impact", post(impact_handler::<C, N>))
        .with_state(orchestrator)
}

/// Accepts a raw GeoJSON feed body and runs it as one batch.
pub(crate) async fn feed_handler<C, N>(
    State(orchestrator): State<Arc<AlertOrchestrator<C, N>>>,
    body: String,
) -> Response
where
    C: EventCatalog + 'static,
    N: AlertNotifier + 'static,
{
    let snapshot = match UsgsFeedReader::from_json_str(&body) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    let ignored = snapshot.ignored;
    let events = snapshot.events;
    let batch =
        tokio::task::spawn_blocking(move || orchestrator.process_batch(events.iter())).await;

    match batch {
        Ok(summary) => {
            let payload = json!({
                "ignored_features": ignored,
                "summary": summary,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => {
            error!(error = %err, "feed batch worker did not complete");
            let payload = json!({ "error": "feed batch worker did not complete" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

/// Evaluates a single event without admitting, recording or notifying.
pub(crate) async fn impact_handler<C, N>(
    State(orchestrator): State<Arc<AlertOrchestrator<C, N>>>,
    axum::Json(event): axum::Json<SeismicEvent>,
) -> Response
where
    C: EventCatalog + 'static,
    N: AlertNotifier + 'static,
{
    match orchestrator.evaluator().evaluate(&event) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}
