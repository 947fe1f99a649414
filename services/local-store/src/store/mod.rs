//! Durable SQLite time-series of raw observations.
//!
//! # Schema
//! One `air_quality` table keyed by autoincrement id; nested observation
//! structures (attributions, city, forecast, iaqi) are serialized to JSON
//! text columns.  Timestamps are stored as UTC RFC3339 strings with
//! second precision, so lexicographic comparison is chronological.
//!
//! # Dedup rule
//! Per station (`idx`), only observations strictly newer than the stored
//! maximum timestamp are inserted; everything else is skipped.
//!
//! # SQLite settings
//! Applied at open: WAL, foreign_keys=ON.  `PRAGMA integrity_check` runs
//! at open and fails the open when not `ok`.

use aq_model::{AirQualityData, Msg, ObsTime, Observation};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

const SCHEMA_SQL: &str = include_str!("schema.sql");

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Integrity check failed: {0}")]
    IntegrityCheckFailed(String),
    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Batch outcome
// ---------------------------------------------------------------------------

/// What happened to one received batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub inserted: usize,
    /// Dropped by validation or the newest-timestamp rule.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// ObservationStore
// ---------------------------------------------------------------------------

pub struct ObservationStore {
    conn: Connection,
}

impl ObservationStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;",
        )?;
        let check: String = conn.pragma_query_value(None, "integrity_check", |row| row.get(0))?;
        if check != "ok" {
            return Err(StoreError::IntegrityCheckFailed(check));
        }
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(ObservationStore { conn })
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Insert a batch inside a single transaction.
    ///
    /// Observations failing validation (source status, timestamp parse) or
    /// the newest-timestamp rule are skipped; a SQL failure rolls the
    /// whole batch back.
    pub fn insert_batch(&mut self, data: &AirQualityData) -> Result<InsertReport, StoreError> {
        let tx = self.conn.transaction()?;
        let mut report = InsertReport::default();

        for obs in &data.obs {
            match prepare_row(obs) {
                Some(row) => {
                    // The max-timestamp lookup sees rows inserted earlier in
                    // this same transaction, so intra-batch duplicates
                    // resolve the same way as cross-batch ones.
                    let newest: Option<String> = tx.query_row(
                        "SELECT MAX(timestamp) FROM air_quality WHERE idx = ?1",
                        params![row.idx],
                        |r| r.get(0),
                    )?;
                    if let Some(max) = newest {
                        if row.timestamp <= max {
                            report.skipped += 1;
                            continue;
                        }
                    }
                    tx.execute(
                        "INSERT INTO air_quality
                             (aqi, idx, timestamp, attributions, city, dominentpol, forecast, iaqi, status)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                        params![
                            row.aqi,
                            row.idx,
                            row.timestamp,
                            row.attributions,
                            row.city,
                            row.dominentpol,
                            row.forecast,
                            row.iaqi,
                            row.status,
                        ],
                    )?;
                    report.inserted += 1;
                }
                None => report.skipped += 1,
            }
        }

        tx.commit()?;
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Observations with `start < timestamp < end`, rehydrated to the
    /// downstream shape (aqi, idx, attributions, city, dominentpol, iaqi,
    /// time.iso, forecast).
    pub fn observations_between(
        &self,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Msg>, StoreError> {
        self.query_rows(
            "SELECT aqi, idx, timestamp, attributions, city, dominentpol, forecast, iaqi
             FROM air_quality
             WHERE timestamp > ?1 AND timestamp < ?2
             ORDER BY timestamp ASC",
            params![store_timestamp(start), store_timestamp(end)],
        )
    }

    /// Observations strictly after `start` (push-forward tick).
    pub fn observations_after(&self, start: &DateTime<Utc>) -> Result<Vec<Msg>, StoreError> {
        self.query_rows(
            "SELECT aqi, idx, timestamp, attributions, city, dominentpol, forecast, iaqi
             FROM air_quality
             WHERE timestamp > ?1
             ORDER BY timestamp ASC",
            params![store_timestamp(start)],
        )
    }

    /// Total row count (test support).
    pub fn row_count(&self) -> Result<i64, StoreError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM air_quality", [], |r| r.get(0))?;
        Ok(count)
    }

    fn query_rows(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Msg>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| {
            Ok(RawRow {
                aqi: row.get(0)?,
                idx: row.get(1)?,
                timestamp: row.get(2)?,
                attributions: row.get(3)?,
                city: row.get(4)?,
                dominentpol: row.get(5)?,
                forecast: row.get(6)?,
                iaqi: row.get(7)?,
            })
        })?;

        let mut msgs = Vec::new();
        for row in rows {
            let raw = row?;
            match rehydrate(&raw) {
                Ok(msg) => msgs.push(msg),
                Err(e) => {
                    // A corrupt JSON column drops the row, not the query.
                    warn!(idx = raw.idx, error = %e, "skipping row with undecodable column");
                }
            }
        }
        Ok(msgs)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct PreparedRow {
    aqi: i64,
    idx: i64,
    timestamp: String,
    attributions: String,
    city: String,
    dominentpol: String,
    forecast: String,
    iaqi: String,
    status: String,
}

struct RawRow {
    aqi: i64,
    idx: i64,
    timestamp: String,
    attributions: String,
    city: String,
    dominentpol: String,
    forecast: String,
    iaqi: String,
}

/// UTC RFC3339 with second precision; lexicographic order is chronological.
fn store_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Validate one observation and serialize its columns.
///
/// `None` for a non-`ok` source status or an unparseable `time.iso`.
fn prepare_row(obs: &Observation) -> Option<PreparedRow> {
    if obs.status != "ok" {
        warn!(status = %obs.status, idx = obs.msg.idx, "received status is not ok");
        return None;
    }
    let parsed = match DateTime::parse_from_rfc3339(&obs.msg.time.iso) {
        Ok(t) => t.with_timezone(&Utc),
        Err(e) => {
            warn!(idx = obs.msg.idx, iso = %obs.msg.time.iso, error = %e, "unparseable observation time");
            return None;
        }
    };

    let attributions = serde_json::to_string(&obs.msg.attributions).ok()?;
    let city = serde_json::to_string(&obs.msg.city).ok()?;
    let forecast = serde_json::to_string(&obs.msg.forecast).ok()?;
    let iaqi = serde_json::to_string(&obs.msg.iaqi).ok()?;

    Some(PreparedRow {
        aqi: obs.msg.aqi,
        idx: obs.msg.idx,
        timestamp: store_timestamp(&parsed),
        attributions,
        city,
        dominentpol: obs.msg.dominentpol.clone(),
        forecast,
        iaqi,
        status: obs.status.clone(),
    })
}

fn rehydrate(raw: &RawRow) -> Result<Msg, serde_json::Error> {
    Ok(Msg {
        aqi: raw.aqi,
        idx: raw.idx,
        attributions: serde_json::from_str(&raw.attributions)?,
        city: serde_json::from_str(&raw.city)?,
        dominentpol: raw.dominentpol.clone(),
        iaqi: serde_json::from_str(&raw.iaqi)?,
        time: ObsTime::from_iso(raw.timestamp.clone()),
        forecast: serde_json::from_str(&raw.forecast)?,
    })
}
