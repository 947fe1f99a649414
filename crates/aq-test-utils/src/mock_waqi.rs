//! Mock bounds/feed API.
//!
//! Serves the two endpoints the collector calls:
//! - `GET /v2/map/bounds?latlng=...&token=...`
//! - `GET /feed/@{id}/?token=...`
//!
//! Stations are fixed at spawn; requests are counted so tests can assert
//! fan-out behavior.

use aq_model::Msg;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One canned station: its bounds `uid` plus the feed body served for it.
#[derive(Debug, Clone)]
pub struct MockStation {
    pub uid: i64,
    pub msg: Msg,
    /// Top-level feed status; `"ok"` for healthy stations.
    pub status: String,
}

impl MockStation {
    pub fn ok(uid: i64, msg: Msg) -> Self {
        MockStation {
            uid,
            msg,
            status: "ok".to_owned(),
        }
    }
}

#[derive(Debug)]
struct WaqiState {
    bounds_status: String,
    stations: Vec<MockStation>,
    by_uid: HashMap<i64, MockStation>,
    bounds_requests: AtomicUsize,
    feed_requests: AtomicUsize,
}

/// Handle to a running mock; dropped servers keep running until the test
/// runtime shuts down.
#[derive(Debug, Clone)]
pub struct MockWaqi {
    pub addr: SocketAddr,
    state: Arc<WaqiState>,
}

impl MockWaqi {
    pub fn base_url(&self) -> String {
        super::base_url(self.addr)
    }

    pub fn bounds_requests(&self) -> usize {
        self.state.bounds_requests.load(Ordering::SeqCst)
    }

    pub fn feed_requests(&self) -> usize {
        self.state.feed_requests.load(Ordering::SeqCst)
    }
}

/// Spawn a mock answering `status` on bounds and serving `stations`.
pub async fn spawn_mock_waqi(bounds_status: &str, stations: Vec<MockStation>) -> MockWaqi {
    let by_uid = stations.iter().map(|s| (s.uid, s.clone())).collect();
    let state = Arc::new(WaqiState {
        bounds_status: bounds_status.to_owned(),
        stations,
        by_uid,
        bounds_requests: AtomicUsize::new(0),
        feed_requests: AtomicUsize::new(0),
    });

    let router = Router::new()
        .route("/v2/map/bounds", get(bounds))
        .route("/feed/{id}/", get(feed))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    MockWaqi { addr, state }
}

async fn bounds(State(state): State<Arc<WaqiState>>) -> Json<serde_json::Value> {
    state.bounds_requests.fetch_add(1, Ordering::SeqCst);
    let data: Vec<serde_json::Value> = state
        .stations
        .iter()
        .map(|s| serde_json::json!({"uid": s.uid, "aqi": "42"}))
        .collect();
    Json(serde_json::json!({"status": state.bounds_status, "data": data}))
}

async fn feed(
    State(state): State<Arc<WaqiState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state.feed_requests.fetch_add(1, Ordering::SeqCst);
    // The real API addresses stations as `/feed/@<id>/`; the `@` arrives
    // as part of the path segment.
    let Ok(uid) = id.trim_start_matches('@').parse::<i64>() else {
        return (StatusCode::NOT_FOUND, Json(serde_json::json!({"status": "error"})))
            .into_response();
    };
    match state.by_uid.get(&uid) {
        Some(station) => Json(serde_json::json!({
            "status": station.status,
            "data": station.msg,
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"status": "error"})),
        )
            .into_response(),
    }
}
