use aggregated_store::{router, AggregateStore, AggregatedStoreConfig, AppState};
use aq_metrics::Metrics;
use aq_protocol::server::serve_in_background;
use std::sync::{Arc, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = match AggregatedStoreConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "aggregated store starting");

    let store = match AggregateStore::open(&config.db_path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, path = %config.db_path.display(), "cannot open store");
            std::process::exit(1);
        }
    };

    let metrics = Arc::new(Metrics::new());
    let state = AppState::new(Arc::new(Mutex::new(store)), metrics.clone());

    match serve_in_background(&config.rpc_bind, router(state)).await {
        Ok(addr) => info!(%addr, "rpc server listening"),
        Err(e) => {
            error!(error = %e, "cannot bind rpc server");
            std::process::exit(1);
        }
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
