//! Capturing RPC sink.
//!
//! Terminates `check-connection` and `send` like a real downstream stage,
//! recording every pushed payload for assertions.

use aq_protocol::{server, RpcAck, RpcData, ROUTE_CHECK_CONNECTION, ROUTE_SEND};
use aq_protocol::time::now_millis;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct CaptureSink {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
}

impl CaptureSink {
    pub fn base_url(&self) -> String {
        super::base_url(self.addr)
    }

    /// Payloads received so far, in arrival order.
    pub fn payloads(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawn a sink acking everything with `ok`.
pub async fn spawn_capture_sink() -> CaptureSink {
    let received: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    let router = Router::new()
        .route(ROUTE_CHECK_CONNECTION, post(server::check_connection))
        .route(ROUTE_SEND, post(capture))
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    CaptureSink { addr, received }
}

async fn capture(
    State(received): State<Arc<Mutex<Vec<String>>>>,
    Json(req): Json<RpcData>,
) -> Json<RpcAck> {
    let received_ms = now_millis();
    received.lock().unwrap().push(req.payload.clone());
    Json(RpcAck::ok(&req, received_ms))
}
