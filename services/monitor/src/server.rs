use crate::cli::ServeArgs;
use crate::infra::{apply_server_overrides, AppState};
use crate::poller::spawn_poller;
use crate::routes::with_alert_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use quake_alert::config::AppConfig;
use quake_alert::error::AppError;
use quake_alert::telemetry::{self, LogOutput};
use quake_alert::workflows::alerts::build_orchestrator;
use quake_alert::workflows::usgs::FeedClient;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    apply_server_overrides(&mut config.server, args.host, args.port);

    telemetry::init(&config.telemetry, LogOutput::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orchestrator = Arc::new(build_orchestrator(&config.alerts)?);
    info!(
        agencies = %config.alerts.agencies.join(","),
        catalog = %config.alerts.catalog_dir.display(),
        "alert pipeline configured"
    );

    if let Some(every) = config.feed.poll_interval {
        let client = FeedClient::new(config.feed.url.clone(), config.feed.timeout)?;
        info!(url = %client.url(), every_secs = every.as_secs(), "background feed polling enabled");
        let _poller = spawn_poller(orchestrator.clone(), client, every);
    }

    let app = with_alert_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "quake alert monitor ready");

    axum::serve(listener, app).await?;
    Ok(())
}
