//! Collector configuration from environment variables.
//!
//! # Required
//! - `TOKEN` -- bounds/feed API token
//! - `SVC_INGESTION_ADDR`, `SVC_INGESTION_PORT` -- downstream endpoint
//! - `UPDATE_FREQUENCY` -- tick period in seconds
//! - `METRIC_PORT` -- metric HTTP listener port
//!
//! # Optional
//! - `LAT1 LNG1 LAT2 LNG2` -- bounding box; any of the four unset or
//!   malformed falls back to the hostname-derived catalog entry
//! - `METRIC_ADDR` -- metric listen address (default `0.0.0.0`)
//! - `WAQI_BASE_URL` -- API base (default `https://api.waqi.info`)

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// `[lat1, lng1, lat2, lng2]`; `None` triggers the degenerate boot.
    pub bounding_box: Option<[f64; 4]>,
    pub token: String,
    pub ingestion_url: String,
    pub update_frequency: Duration,
    pub metric_bind: String,
    pub waqi_base_url: String,
}

impl CollectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bounding_box = read_bounding_box();

        let token = require("TOKEN")?;
        let addr = require("SVC_INGESTION_ADDR")?;
        let port = require("SVC_INGESTION_PORT")?;
        let update_secs: u64 = parse_var("UPDATE_FREQUENCY", &require("UPDATE_FREQUENCY")?)?;

        let metric_addr =
            std::env::var("METRIC_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let metric_port = require("METRIC_PORT")?;

        let waqi_base_url = std::env::var("WAQI_BASE_URL")
            .unwrap_or_else(|_| "https://api.waqi.info".to_owned());

        Ok(CollectorConfig {
            bounding_box,
            token,
            ingestion_url: format!("http://{}:{}", addr, port),
            update_frequency: Duration::from_secs(update_secs),
            metric_bind: format!("{}:{}", metric_addr, metric_port),
            waqi_base_url,
        })
    }
}

/// All four coordinates must parse; otherwise the catalog fallback is used.
fn read_bounding_box() -> Option<[f64; 4]> {
    let mut coords = [0.0; 4];
    for (slot, name) in coords.iter_mut().zip(["LAT1", "LNG1", "LAT2", "LNG2"]) {
        *slot = std::env::var(name).ok()?.trim().parse().ok()?;
    }
    Some(coords)
}

fn require(name: &str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_owned()),
        _ => Err(ConfigError::MissingVar(name.to_owned())),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{}='{}'", name, value)))
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVar(s) => write!(f, "missing required variable: {}", s),
            ConfigError::InvalidValue(s) => write!(f, "invalid value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}
