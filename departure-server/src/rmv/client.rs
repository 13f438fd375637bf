//! RMV departure-board HTTP client.
//!
//! One GET per call, bounded by the client timeout. No retries.

use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::departures::DepartureSource;

use super::error::RmvError;

/// Default endpoint for the departure board.
pub const DEFAULT_BASE_URL: &str = "https://www.rmv.de/hapi/departureBoard";

/// Default lookahead window in minutes.
const DEFAULT_LOOKAHEAD_MINS: u32 = 60;

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the RMV client.
#[derive(Debug, Clone)]
pub struct RmvConfig {
    /// Access ID issued by RMV, sent as the `accessId` query parameter
    pub api_key: String,
    /// Departure board endpoint (defaults to production RMV)
    pub base_url: String,
    /// How far ahead to list departures, in minutes
    pub lookahead_mins: u32,
    /// Request timeout
    pub timeout: Duration,
}

impl RmvConfig {
    /// Create a new config with the given access ID.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            lookahead_mins: DEFAULT_LOOKAHEAD_MINS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom endpoint (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the lookahead window.
    pub fn with_lookahead(mut self, mins: u32) -> Self {
        self.lookahead_mins = mins;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// RMV departure-board client.
#[derive(Debug, Clone)]
pub struct RmvClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    lookahead_mins: u32,
}

impl RmvClient {
    /// Create a new client with the given configuration.
    ///
    /// The access ID must be non-empty and free of whitespace and control
    /// characters; the endpoint must be an absolute URL.
    pub fn new(config: RmvConfig) -> Result<Self, RmvError> {
        if config.api_key.is_empty() {
            return Err(RmvError::Config("access ID is empty".to_string()));
        }
        if config
            .api_key
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(RmvError::Config(
                "access ID contains whitespace or control characters".to_string(),
            ));
        }
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            RmvError::Config(format!("invalid base URL {:?}: {e}", config.base_url))
        })?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            base_url: config.base_url,
            api_key: config.api_key,
            lookahead_mins: config.lookahead_mins,
        })
    }

    /// Fetch the departure board for a stop as an untyped JSON tree.
    ///
    /// A timeout, a non-success status and an undecodable body are all
    /// errors. The response is dropped on every return path, which releases
    /// the connection.
    pub async fn get_departure_board(&self, stop_id: &str) -> Result<Value, RmvError> {
        let duration = self.lookahead_mins.to_string();

        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("accessId", self.api_key.as_str()),
                ("id", stop_id),
                ("format", "json"),
                ("duration", duration.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RmvError::Status {
                status: status.as_u16(),
                message: body.chars().take(500).collect(),
            });
        }

        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(|e| RmvError::Json {
            message: e.to_string(),
            body: Some(String::from_utf8_lossy(&body).chars().take(500).collect()),
        })
    }
}

impl DepartureSource for RmvClient {
    fn fetch<'a>(&'a self, stop_id: &'a str) -> BoxFuture<'a, Result<Value, RmvError>> {
        Box::pin(self.get_departure_board(stop_id))
    }
}
