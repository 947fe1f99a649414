// local-store: append-only time-series of raw observations with a
// watermark-bounded pull surface and a push-forward tick.

pub mod config;
pub mod push;
pub mod rpc;
pub mod store;

pub use config::{ConfigError, LocalStoreConfig};
pub use push::{run_push_tick, PushWatermark};
pub use rpc::{router, AppState};
pub use store::{InsertReport, ObservationStore, StoreError};
