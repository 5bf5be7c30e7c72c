use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::usgs::DEFAULT_FEED_URL;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub feed: FeedConfig,
    pub alerts: AlertConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            feed: FeedConfig::from_env()?,
            alerts: AlertConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Where the monitor fetches events from and how often.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    /// Background polling in `serve`; off when `QUAKE_POLL_INTERVAL_SECS` is unset.
    pub poll_interval: Option<Duration>,
    pub timeout: Duration,
}

impl FeedConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: optional_var("QUAKE_FEED_URL").unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            poll_interval: seconds_var("QUAKE_POLL_INTERVAL_SECS")?,
            timeout: seconds_var("QUAKE_FEED_TIMEOUT_SECS")?
                .unwrap_or(Duration::from_secs(30)),
        })
    }
}

/// Networks processed when `QUAKE_AGENCIES` is unset.
pub const DEFAULT_AGENCIES: [&str; 4] = ["ci", "nc", "nn", "uw"];

/// Admission, catalog and notification settings for the alert pipeline.
#[derive(Debug, Clone)]
pub struct AlertConfig {
    /// Exact, case-sensitive network codes.
    pub agencies: Vec<String>,
    /// `name,latitude,longitude` CSV; the example sites are used when unset.
    pub facilities_csv: Option<PathBuf>,
    /// `min_magnitude,max_magnitude,radius_km` CSV; the standard bands are used when unset.
    pub tiers_csv: Option<PathBuf>,
    pub catalog_dir: PathBuf,
    pub dispatch_command: Option<String>,
    pub notify: NotifyConfig,
}

impl AlertConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let agencies = match env::var("QUAKE_AGENCIES") {
            Ok(raw) => split_list(&raw),
            Err(_) => DEFAULT_AGENCIES.iter().map(|code| code.to_string()).collect(),
        };
        if agencies.is_empty() {
            return Err(ConfigError::EmptyAgencyList);
        }

        let mode = match env::var("QUAKE_NOTIFY_MODE") {
            Ok(raw) => NotifyMode::parse(&raw).ok_or(ConfigError::InvalidNotifyMode(raw))?,
            Err(_) => NotifyMode::Outbox,
        };

        Ok(Self {
            agencies,
            facilities_csv: optional_var("QUAKE_FACILITIES_CSV").map(PathBuf::from),
            tiers_csv: optional_var("QUAKE_TIERS_CSV").map(PathBuf::from),
            catalog_dir: PathBuf::from(
                optional_var("QUAKE_CATALOG_DIR").unwrap_or_else(|| "./catalog".to_string()),
            ),
            dispatch_command: optional_var("QUAKE_DISPATCH_COMMAND"),
            notify: NotifyConfig {
                mode,
                outbox_dir: PathBuf::from(
                    optional_var("QUAKE_OUTBOX_DIR").unwrap_or_else(|| "./outbox".to_string()),
                ),
                sendmail_command: optional_var("QUAKE_SENDMAIL_COMMAND")
                    .unwrap_or_else(|| "/usr/sbin/sendmail -t".to_string()),
                from: optional_var("QUAKE_ALERT_FROM")
                    .unwrap_or_else(|| "quake-alert@localhost".to_string()),
                recipients: optional_var("QUAKE_ALERT_RECIPIENTS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
                subject: optional_var("QUAKE_ALERT_SUBJECT")
                    .unwrap_or_else(|| "EQ Alert".to_string()),
                template: optional_var("QUAKE_ALERT_TEMPLATE").map(PathBuf::from),
            },
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyMode {
    Outbox,
    Sendmail,
}

impl NotifyMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "outbox" => Some(Self::Outbox),
            "sendmail" | "command" => Some(Self::Sendmail),
            _ => None,
        }
    }
}

/// Alert delivery settings.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub mode: NotifyMode,
    pub outbox_dir: PathBuf,
    pub sendmail_command: String,
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
    /// HTML body template; the built-in layout is used when unset.
    pub template: Option<PathBuf>,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Positive whole seconds, or `None` when unset.
fn seconds_var(key: &'static str) -> Result<Option<Duration>, ConfigError> {
    match optional_var(key) {
        None => Ok(None),
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
            _ => Err(ConfigError::InvalidSeconds { key, value: raw }),
        },
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    EmptyAgencyList,
    InvalidNotifyMode(String),
    InvalidSeconds { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::EmptyAgencyList => {
                write!(f, "QUAKE_AGENCIES must list at least one network code")
            }
            ConfigError::InvalidNotifyMode(value) => write!(
                f,
                "QUAKE_NOTIFY_MODE must be 'outbox' or 'sendmail' (got '{}')",
                value
            ),
            ConfigError::InvalidSeconds { key, value } => write!(
                f,
                "{} must be a positive number of seconds (got '{}')",
                key, value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::EmptyAgencyList
            | ConfigError::InvalidNotifyMode(_)
            | ConfigError::InvalidSeconds { .. } => None,
        }
    }
}
