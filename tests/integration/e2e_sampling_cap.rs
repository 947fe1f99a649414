//! Five-sample cap observed at the far side of the ingestor.
//!
//! Bounds lists seven stations; one collector tick must produce exactly
//! five pushes, and the ingestor must forward exactly those five batches
//! to its sink.

use aq_model::{AirQualityData, City, Iaqi, Measurement, Msg, ObsTime};
use aq_protocol::handle::new_client_handle;
use aq_protocol::server::serve_in_background;
use aq_protocol::RpcClient;
use aq_test_utils::{spawn_capture_sink, spawn_mock_waqi, MockStation};
use std::sync::Arc;
use std::time::Duration;

fn station(uid: i64) -> MockStation {
    MockStation::ok(
        uid,
        Msg {
            aqi: 42,
            idx: uid,
            city: City {
                name: format!("City-{}", uid),
                geo: vec![43.65, -79.38],
                ..City::default()
            },
            iaqi: Iaqi {
                h: Measurement { v: 61.0 },
                ..Iaqi::default()
            },
            time: ObsTime::from_iso("2024-01-01T00:00:00Z"),
            ..Msg::default()
        },
    )
}

#[tokio::test]
async fn seven_stations_forward_exactly_five_batches_through_the_ingestor() {
    let waqi_mock = spawn_mock_waqi("ok", (1..=7).map(station).collect()).await;
    let sink = spawn_capture_sink().await;

    // Real ingestor in front of the capture sink.
    let to_sink = new_client_handle();
    *to_sink.write().await = Some(RpcClient::new(sink.base_url()).unwrap());
    let ingestor_state = ingestor::AppState::new(to_sink, Arc::new(aq_metrics::Metrics::new()));
    let ingestor_addr = serve_in_background("127.0.0.1:0", ingestor::router(ingestor_state))
        .await
        .unwrap();

    let downstream = new_client_handle();
    *downstream.write().await =
        Some(RpcClient::new(format!("http://{}", ingestor_addr)).unwrap());

    let waqi = collector::WaqiClient::new(waqi_mock.base_url(), "t").unwrap();
    collector::run_tick(
        &waqi,
        &downstream,
        &Arc::new(aq_metrics::Metrics::new()),
        &[43.0, -80.0, 44.0, -79.0],
    )
    .await
    .unwrap();

    for _ in 0..200 {
        if sink.len() >= 5 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(waqi_mock.feed_requests(), 5, "one fetch per sampled station");
    assert_eq!(sink.len(), 5, "five batches, no more, reach the sink");

    // Five distinct stations made it through.
    let mut stations: Vec<i64> = sink
        .payloads()
        .iter()
        .map(|p| serde_json::from_str::<AirQualityData>(p).unwrap().obs[0].msg.idx)
        .collect();
    stations.sort_unstable();
    stations.dedup();
    assert_eq!(stations.len(), 5);
}
