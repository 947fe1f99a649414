//! Push-forward tick.
//!
//! On its own timer the store pulls everything newer than its last-push
//! watermark and forwards the list to the processor, so the processor has
//! work even with no pending state of its own.  The watermark seeds to
//! `now - 24h` and advances only after a successful push; an unready
//! processor or a failed send leaves it untouched for the next tick.

use crate::rpc::AppState;
use aq_protocol::handle::{ready_client, spawn_rtt_probe};
use chrono::{DateTime, Duration, Utc};
use std::time::Instant;
use tracing::{info, warn};

const SEED_LOOKBACK_HOURS: i64 = 24;

/// Last-push watermark; monotonic within a run.
#[derive(Debug, Default)]
pub struct PushWatermark {
    last_push: Option<DateTime<Utc>>,
}

impl PushWatermark {
    pub fn new() -> Self {
        PushWatermark::default()
    }

    /// Lower bound for the next push query.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_push
            .unwrap_or_else(|| now - Duration::hours(SEED_LOOKBACK_HOURS))
    }

    /// Advance after a successful push; regressions are ignored.
    pub fn advance(&mut self, to: DateTime<Utc>) {
        if self.last_push.map_or(true, |cur| to > cur) {
            self.last_push = Some(to);
        }
    }
}

/// Run one push-forward tick.
pub async fn run_push_tick(state: &AppState, watermark: &mut PushWatermark) {
    spawn_rtt_probe(&state.downstream, "processor", state.metrics.clone());

    let now = Utc::now();
    let start = watermark.window_start(now);
    let started = Instant::now();

    let msgs = {
        let store = state.store.lock().expect("store mutex");
        store.observations_after(&start)
    };
    let msgs = match msgs {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "push query failed");
            state.metrics.failure("processing");
            return;
        }
    };
    if msgs.is_empty() {
        return;
    }
    info!(count = msgs.len(), since = %start, "pushing observations forward");

    let Some(client) = ready_client(&state.downstream).await else {
        info!("processor client is not ready yet");
        return;
    };
    let payload = match serde_json::to_string(&msgs) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "push serialization failed");
            state.metrics.failure("processing");
            return;
        }
    };
    state
        .metrics
        .add_processing_time("processing", started.elapsed().as_secs_f64());

    let sent_bytes = payload.len() as f64;
    match client.send_data(payload).await {
        Ok(_) => {
            state.metrics.success("processing");
            state.metrics.add_sent_data_bytes("processor", sent_bytes);
            watermark.advance(now);
        }
        Err(e) => {
            state.metrics.failure("processing");
            warn!(error = %e, "push to processor failed");
        }
    }
}
