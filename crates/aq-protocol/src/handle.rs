//! Background connection establishment.
//!
//! Every stage with a downstream dependency serves its upstream contract
//! before that dependency answers.  The downstream client therefore lives
//! behind a [`ClientHandle`]; a spawned task probes the peer until it
//! answers `pong` and only then installs the client.  Tick and request
//! handlers treat an empty handle as "not ready yet" -- logged, not an
//! error.

use crate::client::RpcClient;
use aq_metrics::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{info, warn};

const PROBE_INTERVAL: Duration = Duration::from_secs(3);

/// Shared slot for a downstream client that may not exist yet.
pub type ClientHandle = Arc<RwLock<Option<RpcClient>>>;

pub fn new_client_handle() -> ClientHandle {
    Arc::new(RwLock::new(None))
}

/// Snapshot the client if the background connect has completed.
pub async fn ready_client(handle: &ClientHandle) -> Option<RpcClient> {
    handle.read().await.clone()
}

/// Probe `base_url` until it answers `pong`, then install the client.
///
/// Runs until the handle is populated; spawn it once at startup.
pub fn spawn_connect(handle: ClientHandle, base_url: String, peer: &'static str) {
    tokio::spawn(async move {
        let client = match RpcClient::new(&base_url) {
            Ok(c) => c,
            Err(e) => {
                warn!(peer, %base_url, error = %e, "cannot build client, peer will stay unreachable");
                return;
            }
        };
        loop {
            match client.check_connection().await {
                Ok(_) => {
                    info!(peer, %base_url, "connected to target service");
                    *handle.write().await = Some(client);
                    return;
                }
                Err(e) => {
                    info!(peer, %base_url, error = %e, "target service not reachable yet");
                    tokio::time::sleep(PROBE_INTERVAL).await;
                }
            }
        }
    });
}

/// Fire-and-forget RTT probe against the peer, recorded under `service`.
///
/// Used at the top of every tick; failures are logged and dropped so the
/// tick body never waits on the probe.
pub fn spawn_rtt_probe(handle: &ClientHandle, service: &'static str, metrics: Arc<Metrics>) {
    let handle = handle.clone();
    tokio::spawn(async move {
        let Some(client) = ready_client(&handle).await else {
            info!(service, "client is not ready yet, skipping rtt probe");
            return;
        };
        match client.check_connection().await {
            Ok(sample) => match sample.rtt_seconds() {
                Ok(rtt) => {
                    metrics.add_rtt_time(service, rtt);
                    info!(service, rtt_ms = rtt * 1000.0, "rtt sample recorded");
                }
                Err(e) => warn!(service, error = %e, "rtt calculation failed"),
            },
            Err(e) => warn!(service, error = %e, "check connection failed"),
        }
    });
}
