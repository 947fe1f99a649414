// collector: polls the bounds API on a timer, harvests station feeds, and
// pushes observation batches to the ingestion service.

pub mod catalog;
pub mod config;
pub mod tick;
pub mod waqi;

pub use config::{CollectorConfig, ConfigError};
pub use tick::{run_tick, TickError};
pub use waqi::{WaqiClient, MAX_STATIONS_PER_TICK};

use std::time::Duration;
use tracing::{info, warn};

const CATALOG_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Minimum station count a catalog-derived box must yield.
pub const MIN_CATALOG_STATIONS: usize = 5;

/// Resolve the bounding box to collect from.
///
/// Configured coordinates win.  Otherwise the hostname-derived catalog
/// entry is probed until the bounds endpoint returns at least
/// [`MIN_CATALOG_STATIONS`] ids, pausing one second between attempts.
pub async fn resolve_bounding_box(
    configured: Option<[f64; 4]>,
    waqi: &WaqiClient,
    identifier: &str,
) -> [f64; 4] {
    if let Some(bbox) = configured {
        return bbox;
    }
    warn!("coordinates not configured, using a catalog city box");

    let bbox = catalog::box_for_identifier(identifier);
    loop {
        match waqi.station_ids(&bbox).await {
            Ok(ids) if ids.len() >= MIN_CATALOG_STATIONS => {
                info!(
                    lat1 = bbox[0],
                    lng1 = bbox[1],
                    lat2 = bbox[2],
                    lng2 = bbox[3],
                    stations = ids.len(),
                    "catalog box selected"
                );
                return bbox;
            }
            Ok(ids) => {
                warn!(stations = ids.len(), "catalog box has too few stations, retrying");
            }
            Err(e) => {
                warn!(error = %e, "bounds probe for catalog box failed, retrying");
            }
        }
        tokio::time::sleep(CATALOG_RETRY_PAUSE).await;
    }
}
