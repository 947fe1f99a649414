//! Durable relational store of cities, measurements, and alerts.
//!
//! # Identity
//! - `city.idx` is the primary key; re-inserting a known city is benign.
//! - `air_quality.hash` = `hex(sha256(city_idx || "|" || timestamp))`.
//! - `alert.hash` = `hex(sha256(canonical_json(alert)))` with sorted keys,
//!   so equal alerts hash identically across processes.
//!
//! Unique-violation inserts are no-ops; replays and re-orderings converge
//! on the same row set.
//!
//! # Transactions
//! One transaction per record, never per batch: the city upsert, the
//! measurement insert, and the optional alert insert commit or roll back
//! together, and the next record proceeds regardless.

use aq_model::{Alert, AirQualityRecord, CityRecord, DataRequest, EnhancedRecord, EnhancedResponse};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, Transaction};
use sha2::{Digest, Sha256};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

const SCHEMA_SQL: &str = include_str!("schema.sql");

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Integrity check failed: {0}")]
    IntegrityCheckFailed(String),
    #[error("Serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid timestamp '{0}'")]
    Timestamp(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Whether one record's transaction committed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub succeeded: usize,
    pub failed: usize,
}

/// Read-path answer.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Data(Vec<EnhancedResponse>),
    /// Nothing addressable matched the request.
    NoData,
}

// ---------------------------------------------------------------------------
// Hashes
// ---------------------------------------------------------------------------

/// Content hash keying one measurement: `sha256(city_idx || "|" || timestamp)`.
pub fn air_quality_hash(city_idx: i64, timestamp: &str) -> String {
    let digest = Sha256::digest(format!("{}|{}", city_idx, timestamp).as_bytes());
    hex::encode(digest)
}

/// Content hash keying one alert over its canonical (sorted-key) JSON.
pub fn alert_hash(alert: &Alert) -> Result<String, StoreError> {
    let canonical = alert.canonical_json()?;
    Ok(hex::encode(Sha256::digest(canonical.as_bytes())))
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

// ---------------------------------------------------------------------------
// AggregateStore
// ---------------------------------------------------------------------------

pub struct AggregateStore {
    conn: Connection,
}

impl AggregateStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

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
        Ok(AggregateStore { conn })
    }

    // -----------------------------------------------------------------------
    // Write path
    // -----------------------------------------------------------------------

    /// Insert a batch of enriched records, one transaction per record.
    pub fn insert_records(&mut self, records: &[EnhancedRecord]) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();
        for record in records {
            match self.insert_one(record) {
                Ok(()) => outcome.succeeded += 1,
                Err(e) => {
                    warn!(city_idx = record.city.idx, error = %e, "record rolled back");
                    outcome.failed += 1;
                }
            }
        }
        outcome
    }

    fn insert_one(&mut self, record: &EnhancedRecord) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        insert_city(&tx, &record.city)?;
        insert_air_quality(&tx, record.city.idx, &record.air_quality)?;
        if let Some(alert) = &record.alert {
            insert_alert(&tx, record.city.idx, alert)?;
        }

        tx.commit()?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read path
    // -----------------------------------------------------------------------

    /// Answer a pull request (`points` or coordinate/window).
    pub fn query(&self, request: &DataRequest) -> Result<QueryOutcome, StoreError> {
        if request.request_type.is_some() {
            let envelopes = self
                .cities()?
                .into_iter()
                .map(|city| EnhancedResponse {
                    city,
                    air_quality: Vec::new(),
                    alerts: Vec::new(),
                })
                .collect();
            return Ok(QueryOutcome::Data(envelopes));
        }

        if request.start_time.is_empty()
            || request.end_time.is_empty()
            || request.lat == 0.0
            || request.lng == 0.0
        {
            return Err(StoreError::BadRequest(
                "start and end time and coordinates are required".to_owned(),
            ));
        }
        let start = parse_rfc3339(&request.start_time)?;
        let end = parse_rfc3339(&request.end_time)?;

        let cities = self.cities_at(request.lat, request.lng)?;
        if cities.is_empty() {
            return Ok(QueryOutcome::NoData);
        }

        let mut envelopes = Vec::with_capacity(cities.len());
        for city in cities {
            let air_quality = self.air_quality_between(city.idx, &start, &end)?;
            let alerts = self.alerts_within(city.idx, &start, &end)?;
            envelopes.push(EnhancedResponse {
                city,
                air_quality,
                alerts,
            });
        }
        Ok(QueryOutcome::Data(envelopes))
    }

    /// All known cities.
    pub fn cities(&self) -> Result<Vec<CityRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT idx, cityName, lat, lng FROM city ORDER BY idx ASC")?;
        let rows = stmt.query_map([], map_city)?;
        collect(rows)
    }

    fn cities_at(&self, lat: f64, lng: f64) -> Result<Vec<CityRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT idx, cityName, lat, lng FROM city WHERE lat = ?1 AND lng = ?2",
        )?;
        let rows = stmt.query_map(params![lat, lng], map_city)?;
        collect(rows)
    }

    fn air_quality_between(
        &self,
        city_idx: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<AirQualityRecord>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT aqi, timestamp, dewPoint, humidity, pressure, temperature,
                    windSpeed, windGust, pm25
             FROM air_quality
             WHERE city_id = ?1 AND timestamp > ?2 AND timestamp < ?3
             ORDER BY timestamp ASC",
        )?;
        let rows = stmt.query_map(
            params![city_idx, store_timestamp(start), store_timestamp(end)],
            |row| {
                Ok(AirQualityRecord {
                    aqi: row.get(0)?,
                    timestamp: row.get(1)?,
                    dew_point: row.get(2)?,
                    humidity: row.get(3)?,
                    pressure: row.get(4)?,
                    temperature: row.get(5)?,
                    wind_speed: row.get(6)?,
                    wind_gust: row.get(7)?,
                    pm25: row.get(8)?,
                    pm10: 0,
                })
            },
        )?;
        collect(rows)
    }

    fn alerts_within(
        &self,
        city_idx: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT alertDesc, alertEffective, alertExpires, alertStatus, alertCertainty,
                    alertUrgency, alertSeverity, alertHeadline, alertDescription, alertEvent
             FROM alert
             WHERE city_id = ?1 AND alertEffective > ?2 AND alertExpires < ?3",
        )?;
        let rows = stmt.query_map(
            params![city_idx, store_timestamp(start), store_timestamp(end)],
            |row| {
                Ok(Alert {
                    alert_desc: row.get(0)?,
                    alert_effective: row.get(1)?,
                    alert_expires: row.get(2)?,
                    alert_status: row.get(3)?,
                    alert_certainty: row.get(4)?,
                    alert_urgency: row.get(5)?,
                    alert_severity: row.get(6)?,
                    alert_headline: row.get(7)?,
                    alert_description: row.get(8)?,
                    alert_event: row.get(9)?,
                })
            },
        )?;
        collect(rows)
    }

    // -----------------------------------------------------------------------
    // Test support
    // -----------------------------------------------------------------------

    pub fn table_counts(&self) -> Result<(i64, i64, i64), StoreError> {
        let cities = self
            .conn
            .query_row("SELECT COUNT(*) FROM city", [], |r| r.get(0))?;
        let measurements = self
            .conn
            .query_row("SELECT COUNT(*) FROM air_quality", [], |r| r.get(0))?;
        let alerts = self
            .conn
            .query_row("SELECT COUNT(*) FROM alert", [], |r| r.get(0))?;
        Ok((cities, measurements, alerts))
    }
}

// ---------------------------------------------------------------------------
// Conditional writes
// ---------------------------------------------------------------------------

/// City upsert: a unique violation on `idx` means the city is already
/// known and the record proceeds; any other failure aborts the record.
fn insert_city(tx: &Transaction<'_>, city: &CityRecord) -> Result<(), StoreError> {
    let result = tx.execute(
        "INSERT INTO city (idx, cityName, lat, lng) VALUES (?1, ?2, ?3, ?4)",
        params![city.idx, city.city_name, city.lat, city.lng],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn insert_air_quality(
    tx: &Transaction<'_>,
    city_idx: i64,
    aq: &AirQualityRecord,
) -> Result<(), StoreError> {
    let hash = air_quality_hash(city_idx, &aq.timestamp);
    let timestamp = normalize_timestamp(&aq.timestamp);
    let result = tx.execute(
        "INSERT INTO air_quality
             (hash, aqi, timestamp, dewPoint, humidity, pressure, temperature,
              windSpeed, windGust, pm25, city_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            hash,
            aq.aqi,
            timestamp,
            aq.dew_point,
            aq.humidity,
            aq.pressure,
            aq.temperature,
            aq.wind_speed,
            aq.wind_gust,
            aq.pm25,
            city_idx,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn insert_alert(tx: &Transaction<'_>, city_idx: i64, alert: &Alert) -> Result<(), StoreError> {
    let effective = parse_rfc3339(&alert.alert_effective)?;
    let expires = parse_rfc3339(&alert.alert_expires)?;
    let hash = alert_hash(alert)?;

    let result = tx.execute(
        "INSERT INTO alert
             (hash, alertDesc, alertEffective, alertExpires, alertStatus, alertCertainty,
              alertUrgency, alertSeverity, alertHeadline, alertDescription, alertEvent, city_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            hash,
            alert.alert_desc,
            store_timestamp(&effective),
            store_timestamp(&expires),
            alert.alert_status,
            alert.alert_certainty,
            alert.alert_urgency,
            alert.alert_severity,
            alert.alert_headline,
            alert.alert_description,
            alert.alert_event,
            city_idx,
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_unique_violation(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn map_city(row: &rusqlite::Row<'_>) -> Result<CityRecord, rusqlite::Error> {
    Ok(CityRecord {
        idx: row.get(0)?,
        city_name: row.get(1)?,
        lat: row.get(2)?,
        lng: row.get(3)?,
    })
}

fn collect<T>(
    rows: impl Iterator<Item = Result<T, rusqlite::Error>>,
) -> Result<Vec<T>, StoreError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// UTC RFC3339 with second precision; lexicographic order is chronological.
fn store_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Normalize a wire timestamp for comparisons; unparseable values are
/// stored verbatim (the hash already used the wire form).
fn normalize_timestamp(s: &str) -> String {
    match DateTime::parse_from_rfc3339(s) {
        Ok(t) => store_timestamp(&t.with_timezone(&Utc)),
        Err(_) => s.to_owned(),
    }
}

fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Timestamp(s.to_owned()))
}
