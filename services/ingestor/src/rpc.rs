//! RPC surface: check-connection plus the push terminator.
//!
//! The ack is emitted before any parsing or forwarding starts; upstream
//! success means "received and will attempt", never "forwarded".

use crate::filter::filter_empty_cities;
use aq_metrics::Metrics;
use aq_model::AirQualityData;
use aq_protocol::handle::ready_client;
use aq_protocol::time::now_millis;
use aq_protocol::{server, ClientHandle, RpcAck, RpcData, TaskGate};
use aq_protocol::{ROUTE_CHECK_CONNECTION, ROUTE_SEND};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub downstream: ClientHandle,
    pub metrics: Arc<Metrics>,
    pub gate: TaskGate,
}

impl AppState {
    pub fn new(downstream: ClientHandle, metrics: Arc<Metrics>) -> Self {
        AppState {
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
        .with_state(state)
}

async fn send(State(state): State<AppState>, Json(req): Json<RpcData>) -> Json<RpcAck> {
    let received_ms = now_millis();
    let started = Instant::now();
    info!(bytes = req.payload.len(), "batch received");

    let payload = req.payload.clone();
    let gate_state = state.clone();
    state.gate.spawn(async move {
        process_batch(gate_state, payload, started).await;
    });

    Json(RpcAck::ok(&req, received_ms))
}

async fn process_batch(state: AppState, payload: String, started: Instant) {
    let data: AirQualityData = match serde_json::from_str(&payload) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "batch failed to parse");
            state.metrics.failure("processing");
            return;
        }
    };

    let Some(filtered) = filter_empty_cities(data) else {
        info!("no valid observations in batch, dropping");
        state
            .metrics
            .add_processing_time("processing", started.elapsed().as_secs_f64());
        return;
    };
    state
        .metrics
        .add_processing_time("processing", started.elapsed().as_secs_f64());

    let Some(client) = ready_client(&state.downstream).await else {
        info!("storage client is not ready yet");
        return;
    };
    let forwarded = match serde_json::to_string(&filtered) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "batch re-serialization failed");
            state.metrics.failure("processing");
            return;
        }
    };
    let sent_bytes = forwarded.len() as f64;
    match client.send_data(forwarded).await {
        Ok(_) => {
            state.metrics.success("processing");
            state.metrics.add_sent_data_bytes("local-store", sent_bytes);
            info!(observations = filtered.obs.len(), "batch forwarded to storage");
        }
        Err(e) => {
            state.metrics.failure("processing");
            warn!(error = %e, "forward to storage failed");
        }
    }
}
