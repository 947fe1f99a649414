//! Collector wiring tests against mock bounds/feed and a capture sink.
//!
//! # Coverage
//! - One tick pushes exactly five batches when bounds lists seven stations.
//! - A bounds answer with `status != "ok"` fails the tick; nothing is pushed.
//! - Feed answers failing validation (bad status, empty city) are dropped
//!   while healthy stations still go through.
//! - Catalog fallback probes until the bounds endpoint yields five stations.

use aq_model::{AirQualityData, City, Msg};
use aq_protocol::handle::new_client_handle;
use aq_protocol::RpcClient;
use aq_test_utils::{spawn_capture_sink, spawn_mock_waqi, MockStation};
use collector::{resolve_bounding_box, run_tick, WaqiClient};
use std::sync::Arc;
use std::time::Duration;

const BBOX: [f64; 4] = [43.0, -80.0, 44.0, -79.0];

fn station(uid: i64, city_name: &str) -> MockStation {
    MockStation::ok(
        uid,
        Msg {
            idx: uid,
            aqi: 10 + uid,
            city: City {
                name: city_name.to_owned(),
                geo: vec![43.5, -79.5],
                ..City::default()
            },
            ..Msg::default()
        },
    )
}

/// Install a ready client pointing at the sink, skipping the background probe.
async fn ready_handle(base_url: String) -> aq_protocol::ClientHandle {
    let handle = new_client_handle();
    *handle.write().await = Some(RpcClient::new(base_url).unwrap());
    handle
}

async fn wait_for_payloads(sink: &aq_test_utils::CaptureSink, expected: usize) {
    for _ in 0..100 {
        if sink.len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("sink received {} payloads, wanted {}", sink.len(), expected);
}

#[tokio::test]
async fn seven_stations_push_exactly_five_batches() {
    let stations: Vec<MockStation> = (1..=7).map(|uid| station(uid, "Toronto")).collect();
    let waqi_mock = spawn_mock_waqi("ok", stations).await;
    let sink = spawn_capture_sink().await;

    let waqi = WaqiClient::new(waqi_mock.base_url(), "test-token").unwrap();
    let downstream = ready_handle(sink.base_url()).await;
    let metrics = Arc::new(aq_metrics::Metrics::new());

    run_tick(&waqi, &downstream, &metrics, &BBOX).await.unwrap();
    wait_for_payloads(&sink, 5).await;
    assert_eq!(sink.len(), 5, "exactly five stations forwarded per tick");
    assert_eq!(waqi_mock.feed_requests(), 5);

    // Each payload is a one-observation batch of the canonical shape.
    for payload in sink.payloads() {
        let batch: AirQualityData = serde_json::from_str(&payload).unwrap();
        assert_eq!(batch.status, "ok");
        assert_eq!(batch.obs.len(), 1);
        assert_eq!(batch.obs[0].msg.city.name, "Toronto");
    }
}

#[tokio::test]
async fn bad_bounds_status_fails_the_tick_without_pushes() {
    let waqi_mock = spawn_mock_waqi("error", vec![station(1, "Toronto")]).await;
    let sink = spawn_capture_sink().await;

    let waqi = WaqiClient::new(waqi_mock.base_url(), "test-token").unwrap();
    let downstream = ready_handle(sink.base_url()).await;
    let metrics = Arc::new(aq_metrics::Metrics::new());

    let err = run_tick(&waqi, &downstream, &metrics, &BBOX).await;
    assert!(err.is_err(), "tick must fail on non-ok bounds status");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(sink.is_empty(), "no downstream push on a failed tick");
    assert_eq!(waqi_mock.feed_requests(), 0);
}

#[tokio::test]
async fn invalid_feeds_are_dropped_but_do_not_fail_the_tick() {
    let mut bad_status = station(2, "Hamilton");
    bad_status.status = "error".to_owned();
    let stations = vec![station(1, "Toronto"), bad_status, station(3, "")];
    let waqi_mock = spawn_mock_waqi("ok", stations).await;
    let sink = spawn_capture_sink().await;

    let waqi = WaqiClient::new(waqi_mock.base_url(), "test-token").unwrap();
    let downstream = ready_handle(sink.base_url()).await;
    let metrics = Arc::new(aq_metrics::Metrics::new());

    run_tick(&waqi, &downstream, &metrics, &BBOX).await.unwrap();
    wait_for_payloads(&sink, 1).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(sink.len(), 1, "only the valid station survives");
    let batch: AirQualityData = serde_json::from_str(&sink.payloads()[0]).unwrap();
    assert_eq!(batch.obs[0].msg.city.name, "Toronto");
}

#[tokio::test]
async fn configured_box_bypasses_the_catalog() {
    let waqi_mock = spawn_mock_waqi("ok", vec![]).await;
    let waqi = WaqiClient::new(waqi_mock.base_url(), "t").unwrap();
    let bbox = resolve_bounding_box(Some(BBOX), &waqi, "host-a").await;
    assert_eq!(bbox, BBOX);
    assert_eq!(waqi_mock.bounds_requests(), 0, "no probe when configured");
}

#[tokio::test]
async fn catalog_fallback_accepts_a_box_with_five_stations() {
    let stations: Vec<MockStation> = (1..=5).map(|uid| station(uid, "Toronto")).collect();
    let waqi_mock = spawn_mock_waqi("ok", stations).await;
    let waqi = WaqiClient::new(waqi_mock.base_url(), "t").unwrap();

    let bbox = resolve_bounding_box(None, &waqi, "host-a").await;
    assert_eq!(bbox, collector::catalog::box_for_identifier("host-a"));
    assert!(waqi_mock.bounds_requests() >= 1);
}
