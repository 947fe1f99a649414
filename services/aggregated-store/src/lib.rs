// aggregated-store: durable store of enriched records with content-hash
// deduplication and a point/range query surface.

pub mod config;
pub mod rpc;
pub mod store;

pub use config::{AggregatedStoreConfig, ConfigError};
pub use rpc::{router, AppState};
pub use store::{
    air_quality_hash, alert_hash, AggregateStore, InsertOutcome, QueryOutcome, StoreError,
};
