//! RPC surface: push terminator and watermark-bounded pull.

use crate::store::ObservationStore;
use aq_metrics::Metrics;
use aq_model::{AirQualityData, DataRequest};
use aq_protocol::time::now_millis;
use aq_protocol::{server, ClientHandle, RpcAck, RpcData, RpcPullResponse, TaskGate};
use aq_protocol::{ROUTE_CHECK_CONNECTION, ROUTE_RECEIVE, ROUTE_SEND};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<ObservationStore>>,
    /// Downstream processor endpoint, used by the push-forward tick.
    pub downstream: ClientHandle,
    pub metrics: Arc<Metrics>,
    pub gate: TaskGate,
}

impl AppState {
    pub fn new(
        store: Arc<Mutex<ObservationStore>>,
        downstream: ClientHandle,
        metrics: Arc<Metrics>,
    ) -> Self {
        AppState {
            store,
            downstream,
            metrics,
            gate: TaskGate::new(64),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(ROUTE_CHECK_CONNECTION, post(server::check_connection))
        .route(ROUTE_SEND, post(send))
        .route(ROUTE_RECEIVE, post(receive))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Write path (push terminator)
// ---------------------------------------------------------------------------

async fn send(State(state): State<AppState>, Json(req): Json<RpcData>) -> Json<RpcAck> {
    let received_ms = now_millis();
    let started = Instant::now();
    info!(bytes = req.payload.len(), "batch received");

    let payload = req.payload.clone();
    state.gate.spawn({
        let state = state.clone();
        async move {
            let data: AirQualityData = match serde_json::from_str(&payload) {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "batch failed to parse");
                    state.metrics.failure("processing");
                    return;
                }
            };
            let report = {
                let mut store = state.store.lock().expect("store mutex");
                store.insert_batch(&data)
            };
            match report {
                Ok(report) => {
                    state.metrics.success("processing");
                    state
                        .metrics
                        .add_processing_time("processing", started.elapsed().as_secs_f64());
                    if report.inserted > 0 {
                        info!(
                            inserted = report.inserted,
                            skipped = report.skipped,
                            "batch stored"
                        );
                    }
                }
                Err(e) => {
                    state.metrics.failure("processing");
                    warn!(error = %e, "batch insert failed, rolled back");
                }
            }
        }
    });

    Json(RpcAck::ok(&req, received_ms))
}

// ---------------------------------------------------------------------------
// Read path (pull)
// ---------------------------------------------------------------------------

async fn receive(
    State(state): State<AppState>,
    Json(req): Json<RpcData>,
) -> Json<RpcPullResponse> {
    let received_ms = now_millis();
    let started = Instant::now();

    let request: DataRequest = match serde_json::from_str(&req.payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "pull request failed to parse");
            state.metrics.failure("processing");
            return Json(RpcPullResponse::error(received_ms));
        }
    };
    let (Some(start), Some(end)) = (
        parse_rfc3339(&request.start_time),
        parse_rfc3339(&request.end_time),
    ) else {
        warn!(
            start = %request.start_time,
            end = %request.end_time,
            "pull request with missing or invalid window"
        );
        state.metrics.failure("processing");
        return Json(RpcPullResponse::error(received_ms));
    };

    let msgs = {
        let store = state.store.lock().expect("store mutex");
        store.observations_between(&start, &end)
    };
    let msgs = match msgs {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "pull query failed");
            state.metrics.failure("processing");
            return Json(RpcPullResponse::error(received_ms));
        }
    };
    state
        .metrics
        .add_processing_time("processing", started.elapsed().as_secs_f64());
    info!(count = msgs.len(), "pull answered");

    if msgs.is_empty() {
        return Json(RpcPullResponse::no_data(received_ms));
    }
    match serde_json::to_string(&msgs) {
        Ok(payload) => {
            state.metrics.success("processing");
            Json(RpcPullResponse::ok(payload, received_ms))
        }
        Err(e) => {
            warn!(error = %e, "pull serialization failed");
            state.metrics.failure("processing");
            Json(RpcPullResponse::error(received_ms))
        }
    }
}

fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}
