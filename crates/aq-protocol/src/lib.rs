// aq-protocol: uniform request/response surface between pipeline stages.
//
// Every stage terminates and/or originates the same three operations
// (check-connection, send, receive) carried as JSON over HTTP POST.  All
// timestamps on the wire are Unix milliseconds rendered as decimal strings,
// sufficient for the four-point RTT computation in [`rtt`].

use serde::{Deserialize, Serialize};

pub mod client;
pub mod handle;
pub mod rtt;
pub mod server;
pub mod task_gate;
pub mod time;

pub use client::{PongSample, RpcClient, RpcError};
pub use handle::{new_client_handle, spawn_connect, ClientHandle};
pub use task_gate::TaskGate;

// ---------------------------------------------------------------------------
// Status values and routes
// ---------------------------------------------------------------------------

/// Accepted / query answered.
pub const STATUS_OK: &str = "ok";
/// Liveness reply to a check-connection probe.
pub const STATUS_PONG: &str = "pong";
/// Query answered but nothing addressable matched; payload is empty.
pub const STATUS_NO_DATA: &str = "no_data_available";
/// Synchronous query failure (bad request body, storage error); no payload.
pub const STATUS_ERROR: &str = "error";

pub const ROUTE_CHECK_CONNECTION: &str = "/rpc/v1/check-connection";
pub const ROUTE_SEND: &str = "/rpc/v1/send";
pub const ROUTE_RECEIVE: &str = "/rpc/v1/receive";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A pushed payload or a pull request body.
///
/// `payload` is opaque JSON owned by the two stages on the edge; the
/// transport only inspects the timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcData {
    pub payload: String,
    /// Sender wall-clock at emission, ms since epoch as a decimal string.
    pub sent_timestamp: String,
}

impl RpcData {
    /// Wrap a payload, stamping the current wall-clock.
    pub fn new(payload: impl Into<String>) -> Self {
        RpcData {
            payload: payload.into(),
            sent_timestamp: time::now_millis_string(),
        }
    }
}

/// Synchronous receipt confirmation for `check-connection` and `send`.
///
/// Carries correlation timestamps only; an `ok` ack never implies the sink
/// committed anything (the async path owns delivery).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcAck {
    pub status: String,
    pub original_sent_timestamp: String,
    /// Receiver wall-clock at message receipt.
    pub received_timestamp: String,
    /// Receiver wall-clock at response emission.
    pub ack_sent_timestamp: String,
}

impl RpcAck {
    /// Liveness reply; both receiver timestamps are stamped now.
    pub fn pong(req: &RpcData) -> Self {
        let now = time::now_millis_string();
        RpcAck {
            status: STATUS_PONG.to_owned(),
            original_sent_timestamp: req.sent_timestamp.clone(),
            received_timestamp: now.clone(),
            ack_sent_timestamp: now,
        }
    }

    /// Acceptance ack for a push received at `received_ms`.
    pub fn ok(req: &RpcData, received_ms: i64) -> Self {
        RpcAck {
            status: STATUS_OK.to_owned(),
            original_sent_timestamp: req.sent_timestamp.clone(),
            received_timestamp: received_ms.to_string(),
            ack_sent_timestamp: time::now_millis_string(),
        }
    }
}

/// Response to a pull (`receive`) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcPullResponse {
    pub status: String,
    pub payload: String,
    pub received_timestamp: String,
    pub sent_timestamp: String,
}

impl RpcPullResponse {
    pub fn ok(payload: String, received_ms: i64) -> Self {
        RpcPullResponse {
            status: STATUS_OK.to_owned(),
            payload,
            received_timestamp: received_ms.to_string(),
            sent_timestamp: time::now_millis_string(),
        }
    }

    pub fn no_data(received_ms: i64) -> Self {
        RpcPullResponse {
            status: STATUS_NO_DATA.to_owned(),
            payload: String::new(),
            received_timestamp: received_ms.to_string(),
            sent_timestamp: time::now_millis_string(),
        }
    }

    pub fn error(received_ms: i64) -> Self {
        RpcPullResponse {
            status: STATUS_ERROR.to_owned(),
            payload: String::new(),
            received_timestamp: received_ms.to_string(),
            sent_timestamp: time::now_millis_string(),
        }
    }
}
