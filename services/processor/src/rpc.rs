//! RPC surface and forwarding path.
//!
//! The processor both pulls on its own tick and terminates `send` pushes
//! from the local store's push-forward tick; both paths converge on
//! [`enrich_and_forward`].

use crate::alerts::AlertsClient;
use crate::enrich::enrich;
use aq_metrics::Metrics;
use aq_model::Msg;
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
    /// Aggregated-store endpoint.
    pub downstream: ClientHandle,
    pub alerts: AlertsClient,
    pub metrics: Arc<Metrics>,
    pub gate: TaskGate,
}

impl AppState {
    pub fn new(downstream: ClientHandle, alerts: AlertsClient, metrics: Arc<Metrics>) -> Self {
        AppState {
            downstream,
            alerts,
            metrics,
            gate: TaskGate::new(16),
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
    info!(bytes = req.payload.len(), "observation list received");

    let payload = req.payload.clone();
    state.gate.spawn({
        let state = state.clone();
        async move {
            let msgs: Vec<Msg> = match serde_json::from_str(&payload) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "observation list failed to parse");
                    state.metrics.failure("processing");
                    return;
                }
            };
            enrich_and_forward(&state, msgs).await;
        }
    });

    Json(RpcAck::ok(&req, received_ms))
}

/// Enrich a pulled or pushed observation list and forward it downstream.
pub async fn enrich_and_forward(state: &AppState, msgs: Vec<Msg>) {
    if msgs.is_empty() {
        return;
    }
    let started = Instant::now();
    let count = msgs.len();

    let records = enrich(msgs, &state.alerts).await;
    if records.is_empty() {
        info!(received = count, "no observations survived enrichment");
        return;
    }
    state
        .metrics
        .add_processing_time("processing", started.elapsed().as_secs_f64());
    info!(received = count, enriched = records.len(), "enrichment complete");

    let Some(client) = ready_client(&state.downstream).await else {
        info!("aggregated-store client is not ready yet");
        return;
    };
    let payload = match serde_json::to_string(&records) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "enriched batch serialization failed");
            state.metrics.failure("processing");
            return;
        }
    };
    let sent_bytes = payload.len() as f64;
    match client.send_data(payload).await {
        Ok(_) => {
            state.metrics.success("processing");
            state
                .metrics
                .add_sent_data_bytes("aggregated-store", sent_bytes);
        }
        Err(e) => {
            state.metrics.failure("processing");
            warn!(error = %e, "forward to aggregated store failed");
        }
    }
}
