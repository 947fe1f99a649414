//! Pull tick: watermark window -> local-store pull -> enrich -> forward.

use crate::rpc::{enrich_and_forward, AppState};
use crate::watermark::PullWatermark;
use aq_model::{DataRequest, Msg};
use aq_protocol::handle::{ready_client, spawn_rtt_probe};
use aq_protocol::{ClientHandle, STATUS_NO_DATA, STATUS_OK};
use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

/// Run one pull tick against the local store.
///
/// The watermark advances to the window end after any successful pull --
/// including a `no_data_available` answer, which is a successful pull of
/// an empty window.
pub async fn run_pull_tick(
    state: &AppState,
    upstream: &ClientHandle,
    watermark: &mut PullWatermark,
) {
    spawn_rtt_probe(upstream, "local-store", state.metrics.clone());
    spawn_rtt_probe(&state.downstream, "aggregated-store", state.metrics.clone());

    let Some(client) = ready_client(upstream).await else {
        info!("local-store client is not ready yet");
        return;
    };

    let now = Utc::now();
    let (start, end) = watermark.window(now);
    let request = DataRequest::window(
        start.to_rfc3339_opts(SecondsFormat::Secs, true),
        end.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let payload = match serde_json::to_string(&request) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "pull request serialization failed");
            return;
        }
    };

    let response = match client.receive_data(payload).await {
        Ok(r) => r,
        Err(e) => {
            state.metrics.failure("processing");
            warn!(error = %e, "pull from local store failed");
            return;
        }
    };

    match response.status.as_str() {
        STATUS_OK => {
            let msgs: Vec<Msg> = match serde_json::from_str(&response.payload) {
                Ok(m) => m,
                Err(e) => {
                    state.metrics.failure("processing");
                    warn!(error = %e, "pull payload failed to parse");
                    return;
                }
            };
            info!(count = msgs.len(), "pulled observations from local store");
            watermark.advance(end);
            enrich_and_forward(state, msgs).await;
        }
        STATUS_NO_DATA => {
            info!("no new observations in window");
            watermark.advance(end);
        }
        other => {
            state.metrics.failure("processing");
            warn!(status = %other, "pull answered with unexpected status");
        }
    }
}
