use aq_metrics::Metrics;
use aq_protocol::handle::{new_client_handle, spawn_connect};
use aq_protocol::server::serve_in_background;
use ingestor::{router, AppState, IngestorConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = match IngestorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "ingestor starting");

    let downstream = new_client_handle();
    spawn_connect(
        downstream.clone(),
        config.local_store_url.clone(),
        "local-store",
    );

    let metrics = Arc::new(Metrics::new());
    let state = AppState::new(downstream.clone(), metrics.clone());

    match serve_in_background(&config.rpc_bind, router(state)).await {
        Ok(addr) => info!(%addr, "rpc server listening"),
        Err(e) => {
            error!(error = %e, "cannot bind rpc server");
            std::process::exit(1);
        }
    }

    {
        let downstream = downstream.clone();
        let metrics = metrics.clone();
        let period = config.update_frequency;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                ingestor::run_tick(&downstream, &metrics);
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
