//! RPC client for the uniform surface.
//!
//! One [`RpcClient`] per downstream peer.  Every call carries a 10-second
//! deadline; transient failures surface as [`RpcError`] and are retried by
//! the caller's next tick, never inline.

use crate::rtt::calculate_rtt;
use crate::time::now_millis;
use crate::{
    RpcAck, RpcData, RpcPullResponse, ROUTE_CHECK_CONNECTION, ROUTE_RECEIVE, ROUTE_SEND,
    STATUS_OK, STATUS_PONG,
};
use std::time::Duration;

const RPC_DEADLINE: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum RpcError {
    /// Client construction or URL failure.
    Build(String),
    /// Transport-level failure (connect, timeout, non-2xx).
    Transport(String),
    /// Body decoded but the peer answered with an unexpected status value.
    UnexpectedStatus(String),
    /// Malformed wire timestamp in the peer's reply.
    Timestamp(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Build(s) => write!(f, "client build error: {}", s),
            RpcError::Transport(s) => write!(f, "transport error: {}", s),
            RpcError::UnexpectedStatus(s) => write!(f, "unexpected status: {}", s),
            RpcError::Timestamp(s) => write!(f, "timestamp error: {}", s),
        }
    }
}

impl std::error::Error for RpcError {}

// ---------------------------------------------------------------------------
// PongSample
// ---------------------------------------------------------------------------

/// A completed check-connection round trip with the local clock readings
/// needed for the four-point RTT formula.
#[derive(Debug, Clone)]
pub struct PongSample {
    pub ack: RpcAck,
    /// Local wall-clock when the probe left, ms.
    pub sent_ms: i64,
    /// Local wall-clock when the pong arrived, ms.
    pub received_ms: i64,
}

impl PongSample {
    /// RTT in seconds, as recorded by the metric aggregator.
    pub fn rtt_seconds(&self) -> Result<f64, RpcError> {
        let rtt_ms = calculate_rtt(
            self.sent_ms,
            &self.ack.received_timestamp,
            &self.ack.ack_sent_timestamp,
            self.received_ms,
        )
        .map_err(|e| RpcError::Timestamp(e.to_string()))?;
        Ok(rtt_ms / 1000.0)
    }
}

// ---------------------------------------------------------------------------
// RpcClient
// ---------------------------------------------------------------------------

/// HTTP client for one peer's RPC surface.
#[derive(Debug, Clone)]
pub struct RpcClient {
    base_url: String,
    http: reqwest::Client,
}

impl RpcClient {
    /// Build a client for `base_url` (e.g. `http://10.0.0.5:50051`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_DEADLINE)
            .build()
            .map_err(|e| RpcError::Build(e.to_string()))?;
        Ok(RpcClient {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Liveness probe; returns the pong with the two local clock readings.
    pub async fn check_connection(&self) -> Result<PongSample, RpcError> {
        let req = RpcData::new("ping");
        let sent_ms = now_millis();
        let ack: RpcAck = self.post(ROUTE_CHECK_CONNECTION, &req).await?;
        let received_ms = now_millis();
        if ack.status != STATUS_PONG {
            return Err(RpcError::UnexpectedStatus(ack.status));
        }
        Ok(PongSample {
            ack,
            sent_ms,
            received_ms,
        })
    }

    /// Push a payload to the peer, awaiting its ack.
    ///
    /// An `ok` ack means "received and will attempt", not sink success.
    pub async fn send_data(&self, payload: impl Into<String>) -> Result<RpcAck, RpcError> {
        let req = RpcData::new(payload);
        let ack: RpcAck = self.post(ROUTE_SEND, &req).await?;
        if ack.status != STATUS_OK {
            return Err(RpcError::UnexpectedStatus(ack.status));
        }
        Ok(ack)
    }

    /// Pull from the peer with a JSON request body.
    ///
    /// Returns the raw response; callers inspect `status` for
    /// `no_data_available` themselves.
    pub async fn receive_data(
        &self,
        payload: impl Into<String>,
    ) -> Result<RpcPullResponse, RpcError> {
        let req = RpcData::new(payload);
        self.post(ROUTE_RECEIVE, &req).await
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
        body: &RpcData,
    ) -> Result<T, RpcError> {
        let url = format!("{}{}", self.base_url, route);
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(RpcError::Transport(format!(
                "{}: HTTP {}",
                url,
                resp.status()
            )));
        }
        resp.json::<T>()
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))
    }
}
