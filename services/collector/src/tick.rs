//! Per-tick harvest: bounds -> sample -> parallel feed fetch -> push.

use crate::waqi::{sample_station_ids, FeedResponse, WaqiClient};
use aq_metrics::Metrics;
use aq_model::{AirQualityData, Observation};
use aq_protocol::handle::{ready_client, spawn_rtt_probe};
use aq_protocol::ClientHandle;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum TickError {
    Bounds(String),
    /// Bounds answered `ok` but listed no stations.
    NoStations,
}

impl std::fmt::Display for TickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickError::Bounds(s) => write!(f, "bounds fetch failed: {}", s),
            TickError::NoStations => write!(f, "bounds returned no station ids"),
        }
    }
}

impl std::error::Error for TickError {}

// ---------------------------------------------------------------------------
// Tick body
// ---------------------------------------------------------------------------

/// Run one collection tick against `bbox`.
///
/// Ticks are independent: the caller spawns each one, so a slow tick
/// overlaps the next rather than delaying it.  Per-station failures are
/// isolated; a bounds failure or an empty station list fails the tick.
pub async fn run_tick(
    waqi: &WaqiClient,
    downstream: &ClientHandle,
    metrics: &Arc<Metrics>,
    bbox: &[f64; 4],
) -> Result<(), TickError> {
    spawn_rtt_probe(downstream, "ingestor", metrics.clone());

    let started = Instant::now();
    let ids = waqi
        .station_ids(bbox)
        .await
        .map_err(|e| TickError::Bounds(e.to_string()))?;
    if ids.is_empty() {
        return Err(TickError::NoStations);
    }
    info!(count = ids.len(), "received station ids");

    let ids = sample_station_ids(ids);
    let harvest_elapsed = started.elapsed();

    let mut children = JoinSet::new();
    for station_id in ids {
        let waqi = waqi.clone();
        let downstream = downstream.clone();
        let metrics = metrics.clone();
        children.spawn(async move {
            let feed = match waqi.station_feed(station_id).await {
                Ok(feed) => feed,
                Err(e) => {
                    warn!(station_id, error = %e, "station fetch failed");
                    return;
                }
            };

            let validate_started = Instant::now();
            let Some(batch) = validate_feed(feed) else {
                warn!(station_id, "station feed failed validation, dropping");
                return;
            };
            metrics.add_processing_time(
                "collector",
                (harvest_elapsed + validate_started.elapsed()).as_secs_f64(),
            );

            push_batch(&downstream, station_id, &batch, &metrics).await;
        });
    }
    while let Some(joined) = children.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "station task failed");
        }
    }
    Ok(())
}

/// Feed validation: top-level `status == "ok"` and a non-empty city name.
///
/// A surviving response becomes a one-observation batch carrying the
/// feed's status through both levels.
pub fn validate_feed(feed: FeedResponse) -> Option<AirQualityData> {
    if feed.status != "ok" {
        return None;
    }
    if feed.data.city.name.is_empty() {
        return None;
    }
    let status = feed.status;
    Some(AirQualityData {
        obs: vec![Observation {
            msg: feed.data,
            status: status.clone(),
            cached: String::new(),
        }],
        status,
        ver: String::new(),
    })
}

async fn push_batch(
    downstream: &ClientHandle,
    station_id: i64,
    batch: &AirQualityData,
    metrics: &Arc<Metrics>,
) {
    let Some(client) = ready_client(downstream).await else {
        info!(station_id, "ingestion client is not ready yet");
        return;
    };
    let payload = match serde_json::to_string(batch) {
        Ok(p) => p,
        Err(e) => {
            warn!(station_id, error = %e, "batch serialization failed");
            metrics.failure("collector");
            return;
        }
    };
    let sent_bytes = payload.len() as f64;
    match client.send_data(payload).await {
        Ok(ack) => {
            metrics.success("collector");
            metrics.add_sent_data_bytes("ingestor", sent_bytes);
            info!(station_id, status = %ack.status, "batch pushed");
        }
        Err(e) => {
            metrics.failure("collector");
            warn!(station_id, error = %e, "push to ingestion service failed");
        }
    }
}
