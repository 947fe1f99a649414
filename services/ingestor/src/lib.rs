// ingestor: terminates collector pushes, drops empty-city observations,
// forwards surviving batches to the local store.

pub mod config;
pub mod filter;
pub mod rpc;

pub use config::{ConfigError, IngestorConfig};
pub use filter::filter_empty_cities;
pub use rpc::{router, AppState};

use aq_protocol::handle::spawn_rtt_probe;
use aq_metrics::Metrics;
use aq_protocol::ClientHandle;
use std::sync::Arc;

/// Ping-only tick: the ingestor's periodic work is the RTT probe to its
/// downstream; all real work is push-driven.
pub fn run_tick(downstream: &ClientHandle, metrics: &Arc<Metrics>) {
    spawn_rtt_probe(downstream, "local-store", metrics.clone());
}
