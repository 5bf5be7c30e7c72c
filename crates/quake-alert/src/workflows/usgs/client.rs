use std::time::Duration;

use tracing::debug;

use super::{FeedError, FeedSnapshot, UsgsFeedReader};

/// USGS summary feed of M2.5+ events from the past hour.
pub const DEFAULT_FEED_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/2.5_hour.geojson";

const USER_AGENT: &str = concat!("quake-alert/", env!("CARGO_PKG_VERSION"));

/// Fetches and decodes one GeoJSON feed snapshot over HTTP.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    url: String,
}

impl FeedClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<FeedSnapshot, FeedError> {
        debug!(url = %self.url, "fetching event feed");
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        UsgsFeedReader::from_json_str(&body)
    }
}
