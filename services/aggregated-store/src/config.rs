//! Aggregated-store configuration from environment variables.
//!
//! # Required
//! - `SVC_AGGR_STRG_PORT` -- own RPC listener port
//! - `METRIC_PORT`
//!
//! # Optional
//! - `DB_PATH` (default `/var/lib/airmon/aggregated-store.sqlite3`)
//! - `METRIC_ADDR`, `SVC_AGGR_STRG_ADDR` (bind, default `0.0.0.0`)

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AggregatedStoreConfig {
    pub rpc_bind: String,
    pub db_path: PathBuf,
    pub metric_bind: String,
}

impl AggregatedStoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            std::env::var("SVC_AGGR_STRG_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let port = require("SVC_AGGR_STRG_PORT")?;

        let db_path = std::env::var("DB_PATH")
            .unwrap_or_else(|_| "/var/lib/airmon/aggregated-store.sqlite3".to_owned());

        let metric_addr =
            std::env::var("METRIC_ADDR").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let metric_port = require("METRIC_PORT")?;

        Ok(AggregatedStoreConfig {
            rpc_bind: format!("{}:{}", bind_addr, port),
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

#[derive(Debug)]
pub enum ConfigError {
    MissingVar(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVar(s) => write!(f, "missing required variable: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}
