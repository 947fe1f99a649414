//! Poll tick: pull the city set, decode it, materialize, record metrics.

use crate::cache::Materialized;
use aq_metrics::Metrics;
use aq_model::{DataRequest, EnhancedResponse};
use aq_protocol::handle::{ready_client, spawn_rtt_probe};
use aq_protocol::{ClientHandle, STATUS_NO_DATA, STATUS_OK};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run one dashboard tick.
///
/// A `no_data_available` answer is a no-op; the previous materialized set
/// stays in place.
pub async fn run_tick(upstream: &ClientHandle, cache: &Arc<Materialized>, metrics: &Arc<Metrics>) {
    spawn_rtt_probe(upstream, "aggregated-store", metrics.clone());

    let Some(client) = ready_client(upstream).await else {
        info!("aggregated-store client is not ready yet");
        return;
    };

    let payload = match serde_json::to_string(&DataRequest::points()) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "request serialization failed");
            return;
        }
    };
    let response = match client.receive_data(payload).await {
        Ok(r) => r,
        Err(e) => {
            metrics.failure("dashboard");
            warn!(error = %e, "pull from aggregated store failed");
            return;
        }
    };

    match response.status.as_str() {
        STATUS_OK => {
            let started = Instant::now();
            let envelopes: Vec<EnhancedResponse> = match serde_json::from_str(&response.payload)
            {
                Ok(d) => d,
                Err(e) => {
                    metrics.failure("dashboard");
                    warn!(error = %e, "payload failed to decode");
                    return;
                }
            };
            metrics.add_processing_time("dashboard", started.elapsed().as_secs_f64());
            metrics.success("dashboard");
            info!(cities = envelopes.len(), "materialized city set refreshed");
            cache.replace(envelopes).await;
        }
        STATUS_NO_DATA => {
            info!("no data available yet");
        }
        other => {
            metrics.failure("dashboard");
            warn!(status = %other, "pull answered with unexpected status");
        }
    }
}
