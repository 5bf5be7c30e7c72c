use metrics_exporter_prometheus::PrometheusHandle;
use quake_alert::config::{AppConfig, ServerConfig};
use quake_alert::error::AppError;
use quake_alert::telemetry::{self, LogOutput};
use quake_alert::workflows::usgs::{FeedClient, FeedError, FeedSnapshot, UsgsFeedReader};
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Where `poll` reads its GeoJSON snapshot from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FeedSource {
    Stdin,
    File(PathBuf),
    Url(String),
}

impl FeedSource {
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim() {
            "" => Err("feed path must not be empty".to_string()),
            "-" => Ok(Self::Stdin),
            url if url.starts_with("http://") || url.starts_with("https://") => {
                Ok(Self::Url(url.to_string()))
            }
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }

    pub(crate) async fn load(&self, timeout: Duration) -> Result<FeedSnapshot, FeedError> {
        match self {
            FeedSource::Stdin => {
                let mut raw = String::new();
                std::io::stdin().lock().read_to_string(&mut raw)?;
                UsgsFeedReader::from_json_str(&raw)
            }
            FeedSource::File(path) => UsgsFeedReader::from_path(path),
            FeedSource::Url(url) => FeedClient::new(url.as_str(), timeout)?.fetch().await,
        }
    }
}

/// Loads configuration and installs the subscriber for one-shot commands.
///
/// Logs go to stderr so stdout carries only the command's own output.
pub(crate) fn command_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogOutput::Stderr)?;
    Ok(config)
}

pub(crate) fn apply_server_overrides(
    server: &mut ServerConfig,
    host: Option<String>,
    port: Option<u16>,
) {
    if let Some(host) = host {
        server.host = host;
    }
    if let Some(port) = port {
        server.port = port;
    }
}
