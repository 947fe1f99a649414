//! Dashboard configuration from environment variables.
//!
//! # Required
//! - `SVC_AGGR_STRG_ADDR`, `SVC_AGGR_STRG_PORT` -- pull source
//! - `UPDATE_FREQUENCY` -- tick period in seconds
//! - `METRIC_PORT`
//!
//! # Optional
//! - `METRIC_ADDR` (default `0.0.0.0`)

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub aggregated_store_url: String,
    pub update_frequency: Duration,
    pub metric_bind: String,
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let aggr_addr = require("SVC_AGGR_STRG_ADDR")?;
        let aggr_port = require("SVC_AGGR_STRG_PORT")?;

        let update_secs: u64 = parse_var("UPDATE_FREQUENCY", &require("UPDATE_FREQUENCY")?)?;

        let metric_addr =
            std::env::var("METRIC_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let metric_port = require("METRIC_PORT")?;

        Ok(DashboardConfig {
            aggregated_store_url: format!("http://{}:{}", aggr_addr, aggr_port),
            update_frequency: Duration::from_secs(update_secs),
            metric_bind: format!("{}:{}", metric_addr, metric_port),
        })
    }
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
