use aq_metrics::Metrics;
use aq_protocol::handle::{new_client_handle, spawn_connect};
use aq_protocol::server::serve_in_background;
use processor::{router, AlertsClient, AppState, ProcessorConfig, PullWatermark};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = match ProcessorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "processor starting");

    let alerts = match AlertsClient::new(&config.alerts_base_url, &config.alerts_user_agent) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "cannot build alerts client");
            std::process::exit(1);
        }
    };

    let upstream = new_client_handle();
    spawn_connect(upstream.clone(), config.local_store_url.clone(), "local-store");
    let downstream = new_client_handle();
    spawn_connect(
        downstream.clone(),
        config.aggregated_store_url.clone(),
        "aggregated-store",
    );

    let metrics = Arc::new(Metrics::new());
    let state = AppState::new(downstream, alerts, metrics.clone());

    match serve_in_background(&config.rpc_bind, router(state.clone())).await {
        Ok(addr) => info!(%addr, "rpc server listening"),
        Err(e) => {
            error!(error = %e, "cannot bind rpc server");
            std::process::exit(1);
        }
    }

    {
        let state = state.clone();
        let upstream = upstream.clone();
        let period = config.update_frequency;
        tokio::spawn(async move {
            let mut watermark = PullWatermark::new();
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                processor::run_pull_tick(&state, &upstream, &mut watermark).await;
            }
        });
    }

    match serve_in_background(&config.metric_bind, aq_metrics::router(metrics)).await {
        Ok(addr) => info!(%addr, "metric server listening"),
        Err(e) => {
            error!(error = %e, "cannot bind metric server");
            std::process::exit(1);
        }
    }

    std::future::pending::<()>().await;
}
