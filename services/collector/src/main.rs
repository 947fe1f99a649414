use aq_metrics::Metrics;
use aq_protocol::handle::{new_client_handle, spawn_connect};
use aq_protocol::server::serve_in_background;
use collector::{resolve_bounding_box, run_tick, CollectorConfig, WaqiClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_level))
        .init();

    let config = match CollectorConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    info!(version = env!("CARGO_PKG_VERSION"), "collector starting");

    let waqi = match WaqiClient::new(&config.waqi_base_url, &config.token) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "cannot build api client");
            std::process::exit(1);
        }
    };

    let hostname = gethostname::gethostname().to_string_lossy().into_owned();
    let bbox = resolve_bounding_box(config.bounding_box, &waqi, &hostname).await;

    let downstream = new_client_handle();
    spawn_connect(downstream.clone(), config.ingestion_url.clone(), "ingestor");

    let metrics = Arc::new(Metrics::new());

    // Ticks overlap: each one runs as its own task.
    {
        let waqi = waqi.clone();
        let downstream = downstream.clone();
        let metrics = metrics.clone();
        let period = config.update_frequency;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let waqi = waqi.clone();
                let downstream = downstream.clone();
                let metrics = metrics.clone();
                tokio::spawn(async move {
                    if let Err(e) = run_tick(&waqi, &downstream, &metrics, &bbox).await {
                        error!(error = %e, "tick failed");
                    }
                });
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

    // Keep the process alive; all work happens in spawned tasks.
    std::future::pending::<()>().await;
}
