// processor: pulls observations since its watermark, enriches them with
// weather alerts, forwards enriched batches to the aggregated store.

pub mod alerts;
pub mod config;
pub mod enrich;
pub mod rpc;
pub mod tick;
pub mod watermark;

pub use alerts::{AlertsClient, AlertsError};
pub use config::{ConfigError, ProcessorConfig};
pub use enrich::enrich;
pub use rpc::{enrich_and_forward, router, AppState};
pub use tick::run_pull_tick;
pub use watermark::PullWatermark;
