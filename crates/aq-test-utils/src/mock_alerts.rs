//! Mock weather-alerts API.
//!
//! Serves `GET /alerts?point=lat,lng` with a fixed feature list and
//! records the `User-Agent` of the last request so tests can assert the
//! mandatory header is present.

use aq_model::AlertRaw;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct AlertsState {
    features: Vec<AlertRaw>,
    requests: AtomicUsize,
    last_user_agent: Mutex<Option<String>>,
}

#[derive(Debug, Clone)]
pub struct MockAlerts {
    pub addr: SocketAddr,
    state: Arc<AlertsState>,
}

impl MockAlerts {
    pub fn base_url(&self) -> String {
        super::base_url(self.addr)
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn last_user_agent(&self) -> Option<String> {
        self.state.last_user_agent.lock().unwrap().clone()
    }
}

/// Spawn a mock returning `features` for every point.
///
/// An empty list reproduces the "no alert for this point" answer.
pub async fn spawn_mock_alerts(features: Vec<AlertRaw>) -> MockAlerts {
    let state = Arc::new(AlertsState {
        features,
        requests: AtomicUsize::new(0),
        last_user_agent: Mutex::new(None),
    });

    let router = Router::new()
        .route("/alerts", get(alerts))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockAlerts { addr, state }
}

async fn alerts(
    State(state): State<Arc<AlertsState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    state.requests.fetch_add(1, Ordering::SeqCst);
    *state.last_user_agent.lock().unwrap() = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let features: Vec<serde_json::Value> = state
        .features
        .iter()
        .map(|raw| serde_json::json!({"properties": raw}))
        .collect();
    Json(serde_json::json!({"features": features}))
}
