use quake_alert::error::AppError;
use quake_alert::workflows::alerts::{AlertNotifier, AlertOrchestrator, BatchSummary, EventCatalog};
use quake_alert::workflows::usgs::FeedClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Fetches one snapshot and runs it through the pipeline off the async workers.
pub(crate) async fn poll_once<C, N>(
    orchestrator: &Arc<AlertOrchestrator<C, N>>,
    client: &FeedClient,
) -> Result<BatchSummary, AppError>
where
    C: EventCatalog + 'static,
    N: AlertNotifier + 'static,
{
    let snapshot = client.fetch().await?;
    if snapshot.ignored > 0 {
        warn!(ignored = snapshot.ignored, "feed features ignored");
    }

    let orchestrator = Arc::clone(orchestrator);
    let events = snapshot.events;
    tokio::task::spawn_blocking(move || orchestrator.process_batch(events.iter()))
        .await
        .map_err(|err| AppError::Server(axum::Error::new(err)))
}

/// Polls `client` every `every` until the runtime shuts down. Failed polls are
/// logged and retried on the next tick.
pub(crate) fn spawn_poller<C, N>(
    orchestrator: Arc<AlertOrchestrator<C, N>>,
    client: FeedClient,
    every: Duration,
) -> JoinHandle<()>
where
    C: EventCatalog + 'static,
    N: AlertNotifier + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match poll_once(&orchestrator, &client).await {
                Ok(summary) => info!(
                    url = %client.url(),
                    admitted = summary.admitted,
                    alerted = summary.alerted,
                    skipped = summary.skipped,
                    failed = summary.failed,
                    "feed poll finished"
                ),
                Err(err) => warn!(url = %client.url(), error = %err, "feed poll failed"),
            }
        }
    })
}
