use aq_metrics::Metrics;
use aq_protocol::handle::{new_client_handle, spawn_connect};
use aq_protocol::server::serve_in_background;
use local_store::{router, AppState, LocalStoreConfig, ObservationStore, PushWatermark};
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = match LocalStoreConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "local store starting");

    let store = match ObservationStore::open(&config.db_path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %config.db_path.display(), "cannot open store");
            std::process::exit(1);
        }
    };
    let store = Arc::new(Mutex::new(store));

    let downstream = new_client_handle();
    spawn_connect(downstream.clone(), config.processor_url.clone(), "processor");

    let metrics = Arc::new(Metrics::new());
    let state = AppState::new(store, downstream, metrics.clone());

    match serve_in_background(&config.rpc_bind, router(state.clone())).await {
        Ok(addr) => info!(%addr, "rpc server listening"),
        Err(e) => {
            error!(error = %e, "cannot bind rpc server");
            std::process::exit(1);
        }
    }

    {
        let state = state.clone();
        let period = config.update_frequency;
        tokio::spawn(async move {
            let mut watermark = PushWatermark::new();
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                local_store::run_push_tick(&state, &mut watermark).await;
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
