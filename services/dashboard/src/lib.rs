// dashboard: pulls the current city set from the aggregated store on a
// timer and materializes the result.  Presentation is out of scope; the
// materialized set and the metric surface are the product.

pub mod cache;
pub mod config;
pub mod tick;

pub use cache::Materialized;
pub use config::{ConfigError, DashboardConfig};
pub use tick::run_tick;
