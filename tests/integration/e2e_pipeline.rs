//! End-to-end pipeline harness: collector -> ingestor -> local store ->
//! processor -> aggregated store -> dashboard, all in-process, with mock
//! external APIs.
//!
//! # Coverage
//! - Single-station happy path via the local store's push-forward tick:
//!   the aggregated store ends up with the city and one measurement, and
//!   the dashboard materializes the city set.
//! - The same path driven by the processor's watermark pull tick instead
//!   (both tick configurations deliver).

use aq_model::{City, EnhancedResponse, Iaqi, Measurement, Msg, ObsTime};
use aq_protocol::handle::new_client_handle;
use aq_protocol::server::serve_in_background;
use aq_protocol::{ClientHandle, RpcClient};
use aq_test_utils::{spawn_mock_alerts, spawn_mock_waqi, MockStation};
use chrono::{SecondsFormat, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Harness helpers
// ---------------------------------------------------------------------------

struct Pipeline {
    aggregated: aggregated_store::AppState,
    local: local_store::AppState,
    processor: processor::AppState,
    /// Local-store endpoint, for the processor's pull tick.
    local_handle: ClientHandle,
    /// Ingestor endpoint, the collector's downstream.
    ingestor_handle: ClientHandle,
    /// Aggregated-store endpoint, the dashboard's upstream.
    aggregated_handle: ClientHandle,
}

/// Boot every stage on an ephemeral port with handles already connected.
async fn start_pipeline(alerts_url: String) -> Pipeline {
    let metrics = || Arc::new(aq_metrics::Metrics::new());

    // Aggregated store.
    let aggregated = aggregated_store::AppState::new(
        Arc::new(Mutex::new(
            aggregated_store::AggregateStore::open_in_memory().unwrap(),
        )),
        metrics(),
    );
    let aggregated_addr = serve_in_background("127.0.0.1:0", aggregated_store::router(aggregated.clone()))
        .await
        .unwrap();

    // Processor, forwarding to the aggregated store.
    let to_aggregated = new_client_handle();
    *to_aggregated.write().await =
        Some(RpcClient::new(format!("http://{}", aggregated_addr)).unwrap());
    let alerts = processor::AlertsClient::new(alerts_url, "(airmon e2e tests)").unwrap();
    let proc_state = processor::AppState::new(to_aggregated, alerts, metrics());
    let proc_addr = serve_in_background("127.0.0.1:0", processor::router(proc_state.clone()))
        .await
        .unwrap();

    // Local store, push-forwarding to the processor.
    let to_processor = new_client_handle();
    *to_processor.write().await = Some(RpcClient::new(format!("http://{}", proc_addr)).unwrap());
    let local = local_store::AppState::new(
        Arc::new(Mutex::new(local_store::ObservationStore::open_in_memory().unwrap())),
        to_processor,
        metrics(),
    );
    let local_addr = serve_in_background("127.0.0.1:0", local_store::router(local.clone()))
        .await
        .unwrap();

    // Ingestor, forwarding to the local store.
    let to_local = new_client_handle();
    *to_local.write().await = Some(RpcClient::new(format!("http://{}", local_addr)).unwrap());
    let ingestor_state = ingestor::AppState::new(to_local, metrics());
    let ingestor_addr = serve_in_background("127.0.0.1:0", ingestor::router(ingestor_state))
        .await
        .unwrap();

    let ingestor_handle = new_client_handle();
    *ingestor_handle.write().await =
        Some(RpcClient::new(format!("http://{}", ingestor_addr)).unwrap());
    let local_handle = new_client_handle();
    *local_handle.write().await = Some(RpcClient::new(format!("http://{}", local_addr)).unwrap());
    let aggregated_handle = new_client_handle();
    *aggregated_handle.write().await =
        Some(RpcClient::new(format!("http://{}", aggregated_addr)).unwrap());

    Pipeline {
        aggregated,
        local,
        processor: proc_state,
        local_handle,
        ingestor_handle,
        aggregated_handle,
    }
}

fn station(uid: i64, city_name: &str, iso: &str, aqi: i64) -> MockStation {
    MockStation::ok(
        uid,
        Msg {
            aqi,
            idx: uid,
            city: City {
                name: city_name.to_owned(),
                geo: vec![43.65, -79.38],
                ..City::default()
            },
            iaqi: Iaqi {
                h: Measurement { v: 61.0 },
                pm25: Measurement { v: aqi as f64 },
                ..Iaqi::default()
            },
            time: ObsTime::from_iso(iso),
            ..Msg::default()
        },
    )
}

fn recent_iso() -> String {
    (Utc::now() - chrono::Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

async fn wait_for<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", what);
}

fn aggregated_counts(pipeline: &Pipeline) -> (i64, i64, i64) {
    pipeline
        .aggregated
        .store
        .lock()
        .unwrap()
        .table_counts()
        .unwrap()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn single_station_happy_path_via_push_forward() {
    let iso = recent_iso();
    let waqi = spawn_mock_waqi("ok", vec![station(12345, "Foo", &iso, 42)]).await;
    let alerts = spawn_mock_alerts(vec![]).await;
    let pipeline = start_pipeline(alerts.base_url()).await;

    // Tick 1: collector harvests and pushes through the ingestor.
    let waqi_client = collector::WaqiClient::new(waqi.base_url(), "t").unwrap();
    let metrics = Arc::new(aq_metrics::Metrics::new());
    collector::run_tick(&waqi_client, &pipeline.ingestor_handle, &metrics, &[43.0, -80.0, 44.0, -79.0])
        .await
        .unwrap();
    wait_for("local store row", || {
        pipeline.local.store.lock().unwrap().row_count().unwrap() == 1
    })
    .await;

    // Tick 2: the local store pushes forward; the processor enriches and
    // forwards to the aggregated store.
    let mut watermark = local_store::PushWatermark::new();
    local_store::run_push_tick(&pipeline.local, &mut watermark).await;
    wait_for("aggregated store row", || {
        aggregated_counts(&pipeline) == (1, 1, 0)
    })
    .await;

    // The dashboard sees the city.
    let cache = Arc::new(dashboard::Materialized::new());
    dashboard::run_tick(&pipeline.aggregated_handle, &cache, &Arc::new(aq_metrics::Metrics::new()))
        .await;
    let snapshot: Vec<EnhancedResponse> = cache.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].city.idx, 12345);
    assert_eq!(snapshot[0].city.city_name, "Foo");
    assert_eq!(snapshot[0].city.lat, 43.65);
    assert_eq!(snapshot[0].city.lng, -79.38);
}

#[tokio::test]
async fn single_station_happy_path_via_processor_pull() {
    let iso = recent_iso();
    let waqi = spawn_mock_waqi("ok", vec![station(777, "Bar", &iso, 55)]).await;
    let alerts = spawn_mock_alerts(vec![]).await;
    let pipeline = start_pipeline(alerts.base_url()).await;

    let waqi_client = collector::WaqiClient::new(waqi.base_url(), "t").unwrap();
    let metrics = Arc::new(aq_metrics::Metrics::new());
    collector::run_tick(&waqi_client, &pipeline.ingestor_handle, &metrics, &[43.0, -80.0, 44.0, -79.0])
        .await
        .unwrap();
    wait_for("local store row", || {
        pipeline.local.store.lock().unwrap().row_count().unwrap() == 1
    })
    .await;

    // The processor pulls on its own watermark instead of being pushed to.
    let mut watermark = processor::PullWatermark::new();
    processor::run_pull_tick(&pipeline.processor, &pipeline.local_handle, &mut watermark).await;
    wait_for("aggregated store row", || {
        aggregated_counts(&pipeline) == (1, 1, 0)
    })
    .await;
    assert!(watermark.last_call().is_some(), "watermark advanced after the pull");
}
