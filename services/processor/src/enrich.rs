//! Enrichment fan-out: observations -> enhanced records.

use crate::alerts::AlertsClient;
use aq_model::{Alert, EnhancedRecord, Msg};
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Enrich each observation with the active alert for its coordinates.
///
/// One fetch per observation, fanned out concurrently (the alerts client
/// caps in-flight requests).  Observations without a geo pair or whose
/// alert fetch fails are skipped; output order is unspecified -- the sink
/// dedups, so ordering carries no meaning.
pub async fn enrich(msgs: Vec<Msg>, alerts: &AlertsClient) -> Vec<EnhancedRecord> {
    let mut children = JoinSet::new();
    for msg in msgs {
        let alerts = alerts.clone();
        children.spawn(async move { enrich_one(msg, &alerts).await });
    }

    let mut records = Vec::new();
    while let Some(joined) = children.join_next().await {
        match joined {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "enrichment task failed"),
        }
    }
    records
}

async fn enrich_one(msg: Msg, alerts: &AlertsClient) -> Option<EnhancedRecord> {
    let mut record = match EnhancedRecord::from_msg(&msg) {
        Some(r) => r,
        None => {
            warn!(idx = msg.idx, "observation has no geo pair, skipping");
            return None;
        }
    };

    match alerts.alert_for_point(record.city.lat, record.city.lng).await {
        Ok(Some(raw)) => record.alert = Some(Alert::from_raw(&raw)),
        Ok(None) => {
            info!(lat = record.city.lat, lng = record.city.lng, "no alerts for point");
        }
        Err(e) => {
            warn!(idx = msg.idx, error = %e, "alert fetch failed, skipping observation");
            return None;
        }
    }
    Some(record)
}
