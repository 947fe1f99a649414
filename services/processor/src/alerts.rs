//! Client for the weather-alerts API.
//!
//! The API requires a caller-identifying `User-Agent` and tolerates only
//! modest request rates, so the fan-out is capped by a semaphore.  An
//! HTTP 200 with an empty `features` array means "no alert for this
//! point" and is a successful answer.

use aq_model::AlertRaw;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

const HTTP_DEADLINE: Duration = Duration::from_secs(10);

/// Concurrent in-flight requests against the alerts API.
pub const MAX_CONCURRENT_REQUESTS: usize = 4;

#[derive(Debug, Deserialize)]
struct AlertsResponse {
    #[serde(default)]
    features: Vec<AlertFeature>,
}

#[derive(Debug, Deserialize)]
struct AlertFeature {
    #[serde(default)]
    properties: AlertRaw,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum AlertsError {
    Build(String),
    Http(String),
    Decode(String),
}

impl std::fmt::Display for AlertsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertsError::Build(s) => write!(f, "client build error: {}", s),
            AlertsError::Http(s) => write!(f, "http error: {}", s),
            AlertsError::Decode(s) => write!(f, "decode error: {}", s),
        }
    }
}

impl std::error::Error for AlertsError {}

// ---------------------------------------------------------------------------
// AlertsClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AlertsClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    permits: Arc<Semaphore>,
}

impl AlertsClient {
    pub fn new(
        base_url: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Result<Self, AlertsError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_DEADLINE)
            .build()
            .map_err(|e| AlertsError::Build(e.to_string()))?;
        Ok(AlertsClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            user_agent: user_agent.into(),
            permits: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        })
    }

    /// The active alert for a point, if any.
    ///
    /// The first feature's properties win when several alerts overlap the
    /// point.
    pub async fn alert_for_point(&self, lat: f64, lng: f64) -> Result<Option<AlertRaw>, AlertsError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AlertsError::Http(e.to_string()))?;

        let url = format!("{}/alerts?point={},{}", self.base_url, lat, lng);
        let resp = self
            .http
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .send()
            .await
            .map_err(|e| AlertsError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AlertsError::Http(format!("HTTP {}", resp.status())));
        }
        let decoded: AlertsResponse = resp
            .json()
            .await
            .map_err(|e| AlertsError::Decode(e.to_string()))?;

        Ok(decoded.features.into_iter().next().map(|f| f.properties))
    }
}
