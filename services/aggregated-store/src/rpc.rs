//! RPC surface: enriched-batch terminator and the query interface.

use crate::store::{AggregateStore, QueryOutcome, StoreError};
use aq_metrics::Metrics;
use aq_model::{DataRequest, EnhancedRecord};
use aq_protocol::time::now_millis;
use aq_protocol::{server, RpcAck, RpcData, RpcPullResponse, TaskGate};
use aq_protocol::{ROUTE_CHECK_CONNECTION, ROUTE_RECEIVE, ROUTE_SEND};
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<AggregateStore>>,
    pub metrics: Arc<Metrics>,
    pub gate: TaskGate,
}

impl AppState {
    pub fn new(store: Arc<Mutex<AggregateStore>>, metrics: Arc<Metrics>) -> Self {
        AppState {
            store,
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
// Write path
// ---------------------------------------------------------------------------

async fn send(State(state): State<AppState>, Json(req): Json<RpcData>) -> Json<RpcAck> {
    let received_ms = now_millis();
    let started = Instant::now();
    info!(bytes = req.payload.len(), "enriched batch received");

    let payload = req.payload.clone();
    state.gate.spawn({
        let state = state.clone();
        async move {
            let records: Vec<EnhancedRecord> = match serde_json::from_str(&payload) {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "enriched batch failed to parse");
                    state.metrics.failure("processing");
                    return;
                }
            };
            let outcome = {
                let mut store = state.store.lock().expect("store mutex");
                store.insert_records(&records)
            };
            for _ in 0..outcome.succeeded {
                state.metrics.success("processing");
            }
            for _ in 0..outcome.failed {
                state.metrics.failure("processing");
            }
            state
                .metrics
                .add_processing_time("processing", started.elapsed().as_secs_f64());
            info!(
                succeeded = outcome.succeeded,
                failed = outcome.failed,
                "enriched batch stored"
            );
        }
    });

    Json(RpcAck::ok(&req, received_ms))
}

// ---------------------------------------------------------------------------
// Read path
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
            warn!(error = %e, "query failed to parse");
            state.metrics.failure("processing");
            return Json(RpcPullResponse::error(received_ms));
        }
    };

    let outcome = {
        let store = state.store.lock().expect("store mutex");
        store.query(&request)
    };
    state
        .metrics
        .add_processing_time("processing", started.elapsed().as_secs_f64());

    match outcome {
        Ok(QueryOutcome::Data(envelopes)) => match serde_json::to_string(&envelopes) {
            Ok(payload) => {
                state.metrics.success("processing");
                info!(envelopes = envelopes.len(), "query answered");
                Json(RpcPullResponse::ok(payload, received_ms))
            }
            Err(e) => {
                warn!(error = %e, "query serialization failed");
                state.metrics.failure("processing");
                Json(RpcPullResponse::error(received_ms))
            }
        },
        Ok(QueryOutcome::NoData) => {
            info!("query matched nothing");
            Json(RpcPullResponse::no_data(received_ms))
        }
        Err(StoreError::BadRequest(reason)) | Err(StoreError::Timestamp(reason)) => {
            warn!(%reason, "query rejected");
            state.metrics.failure("processing");
            Json(RpcPullResponse::error(received_ms))
        }
        Err(e) => {
            warn!(error = %e, "query failed");
            state.metrics.failure("processing");
            Json(RpcPullResponse::error(received_ms))
        }
    }
}
