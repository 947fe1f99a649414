//! Processor configuration from environment variables.
//!
//! # Required
//! - `SVC_PROCESSOR_PORT` -- own RPC listener port
//! - `SVC_LOCAL_STRG_ADDR`, `SVC_LOCAL_STRG_PORT` -- pull source
//! - `SVC_AGGR_STRG_ADDR`, `SVC_AGGR_STRG_PORT` -- forward target
//! - `UPDATE_FREQUENCY` -- pull tick period in seconds
//! - `METRIC_PORT`
//!
//! # Optional
//! - `ALERTS_BASE_URL` (default `https://api.weather.gov`)
//! - `ALERTS_USER_AGENT` (default identifies this deployment)
//! - `METRIC_ADDR`, `SVC_PROCESSOR_ADDR` (bind, default `0.0.0.0`)

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub rpc_bind: String,
    pub local_store_url: String,
    pub aggregated_store_url: String,
    pub update_frequency: Duration,
    pub alerts_base_url: String,
    pub alerts_user_agent: String,
    pub metric_bind: String,
}

impl ProcessorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("SVC_PROCESSOR_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let port = require("SVC_PROCESSOR_PORT")?;

        let strg_addr = require("SVC_LOCAL_STRG_ADDR")?;
        let strg_port = require("SVC_LOCAL_STRG_PORT")?;
        let aggr_addr = require("SVC_AGGR_STRG_ADDR")?;
        let aggr_port = require("SVC_AGGR_STRG_PORT")?;

        let update_secs: u64 = parse_var("UPDATE_FREQUENCY", &require("UPDATE_FREQUENCY")?)?;

        let alerts_base_url = std::env::var("ALERTS_BASE_URL")
            .unwrap_or_else(|_| "https://api.weather.gov".to_owned());
        let alerts_user_agent = std::env::var("ALERTS_USER_AGENT")
            .unwrap_or_else(|_| "(airmon pipeline, ops@airmon.invalid)".to_owned());

        let metric_addr =
            std::env::var("METRIC_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let metric_port = require("METRIC_PORT")?;

        Ok(ProcessorConfig {
            rpc_bind: format!("{}:{}", bind_addr, port),
            local_store_url: format!("http://{}:{}", strg_addr, strg_port),
            aggregated_store_url: format!("http://{}:{}", aggr_addr, aggr_port),
            update_frequency: Duration::from_secs(update_secs),
            alerts_base_url,
            alerts_user_agent,
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
