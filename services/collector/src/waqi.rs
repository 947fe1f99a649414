//! Client for the bounds/feed API.
//!
//! Thin typed decoding at the network edge: only the fields the pipeline
//! reads are modeled, everything else is ignored.

use aq_model::Msg;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::time::Duration;

const HTTP_DEADLINE: Duration = Duration::from_secs(10);

/// Stations forwarded per tick when the bounds answer is larger.
pub const MAX_STATIONS_PER_TICK: usize = 5;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct BoundsResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Vec<BoundsStation>,
}

#[derive(Debug, Deserialize)]
struct BoundsStation {
    uid: i64,
}

/// One station's feed answer.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: Msg,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum WaqiError {
    Build(String),
    Http(String),
    Decode(String),
    /// Bounds answered but with `status != "ok"`.
    BadStatus(String),
}

impl std::fmt::Display for WaqiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WaqiError::Build(s) => write!(f, "client build error: {}", s),
            WaqiError::Http(s) => write!(f, "http error: {}", s),
            WaqiError::Decode(s) => write!(f, "decode error: {}", s),
            WaqiError::BadStatus(s) => write!(f, "unexpected api status: {}", s),
        }
    }
}

impl std::error::Error for WaqiError {}

// ---------------------------------------------------------------------------
// WaqiClient
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct WaqiClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl WaqiClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self, WaqiError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_DEADLINE)
            .build()
            .map_err(|e| WaqiError::Build(e.to_string()))?;
        Ok(WaqiClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token: token.into(),
        })
    }

    /// Station ids inside the bounding box.
    ///
    /// A decoded answer with `status != "ok"` fails the call (and with it
    /// the tick); an empty id list on an `ok` answer is returned as-is for
    /// the caller to reject.
    pub async fn station_ids(&self, bbox: &[f64; 4]) -> Result<Vec<i64>, WaqiError> {
        let url = format!(
            "{}/v2/map/bounds?latlng={},{},{},{}&token={}",
            self.base_url, bbox[0], bbox[1], bbox[2], bbox[3], self.token
        );
        let res: BoundsResponse = self.get_json(&url).await?;
        if res.status != "ok" {
            return Err(WaqiError::BadStatus(res.status));
        }
        Ok(res.data.into_iter().map(|s| s.uid).collect())
    }

    /// Fetch one station's current observation.
    pub async fn station_feed(&self, station_id: i64) -> Result<FeedResponse, WaqiError> {
        let url = format!("{}/feed/@{}/?token={}", self.base_url, station_id, self.token);
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, WaqiError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WaqiError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(WaqiError::Http(format!("HTTP {}", resp.status())));
        }
        resp.json::<T>()
            .await
            .map_err(|e| WaqiError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Uniform sample of at most [`MAX_STATIONS_PER_TICK`] ids without
/// replacement; smaller inputs pass through untouched.
pub fn sample_station_ids(ids: Vec<i64>) -> Vec<i64> {
    if ids.len() <= MAX_STATIONS_PER_TICK {
        return ids;
    }
    let mut rng = rand::thread_rng();
    ids.choose_multiple(&mut rng, MAX_STATIONS_PER_TICK)
        .copied()
        .collect()
}
