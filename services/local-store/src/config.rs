//! Local-store configuration from environment variables.
//!
//! # Required
//! - `SVC_LOCAL_STRG_PORT` -- own RPC listener port
//! - `SVC_PROCESSOR_ADDR`, `SVC_PROCESSOR_PORT` -- push-forward target
//! - `UPDATE_FREQUENCY` -- push-forward tick period in minutes
//! - `METRIC_PORT`
//!
//! # Optional
//! - `DB_PATH` (default `/var/lib/airmon/local-store.sqlite3`)
//! - `METRIC_ADDR`, `SVC_LOCAL_STRG_ADDR` (bind, default `0.0.0.0`)

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LocalStoreConfig {
    pub rpc_bind: String,
    pub processor_url: String,
    pub update_frequency: Duration,
    pub db_path: PathBuf,
    pub metric_bind: String,
}

impl LocalStoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("SVC_LOCAL_STRG_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let port = require("SVC_LOCAL_STRG_PORT")?;

        let proc_addr = require("SVC_PROCESSOR_ADDR")?;
        let proc_port = require("SVC_PROCESSOR_PORT")?;

        let update_minutes: u64 =
            parse_var("UPDATE_FREQUENCY", &require("UPDATE_FREQUENCY")?)?;

        let db_path = std::env::var("DB_PATH")
            .unwrap_or_else(|_| "/var/lib/airmon/local-store.sqlite3".to_owned());

        let metric_addr =
            std::env::var("METRIC_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let metric_port = require("METRIC_PORT")?;

        Ok(LocalStoreConfig {
            rpc_bind: format!("{}:{}", bind_addr, port),
            processor_url: format!("http://{}:{}", proc_addr, proc_port),
            update_frequency: Duration::from_secs(update_minutes * 60),
            db_path: PathBuf::from(db_path),
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
