//! Local-store wiring tests over the RPC surface.
//!
//! # Coverage
//! - Push then pull round-trips the core observation fields.
//! - A pull over an empty window answers `no_data_available`.
//! - A malformed pull request answers a non-ok status without payload.
//! - The push-forward tick delivers stored observations to a sink and
//!   advances its watermark (no re-delivery on the next tick).

use aq_model::{AirQualityData, City, DataRequest, Msg, ObsTime, Observation};
use aq_protocol::handle::new_client_handle;
use aq_protocol::server::serve_in_background;
use aq_protocol::{RpcClient, STATUS_NO_DATA, STATUS_OK};
use aq_test_utils::spawn_capture_sink;
use local_store::{router, AppState, ObservationStore, PushWatermark};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn obs(idx: i64, iso: &str, aqi: i64, city_name: &str) -> Observation {
    Observation {
        msg: Msg {
            aqi,
            idx,
            city: City {
                name: city_name.to_owned(),
                geo: vec![43.65, -79.38],
                ..City::default()
            },
            time: ObsTime::from_iso(iso),
            ..Msg::default()
        },
        status: "ok".to_owned(),
        cached: String::new(),
    }
}

fn batch_json(observations: Vec<Observation>) -> String {
    serde_json::to_string(&AirQualityData {
        obs: observations,
        status: "ok".to_owned(),
        ver: String::new(),
    })
    .unwrap()
}

async fn start_store(downstream_url: Option<String>) -> (RpcClient, AppState) {
    let store = Arc::new(Mutex::new(ObservationStore::open_in_memory().unwrap()));
    let downstream = new_client_handle();
    if let Some(url) = downstream_url {
        *downstream.write().await = Some(RpcClient::new(url).unwrap());
    }
    let state = AppState::new(store, downstream, Arc::new(aq_metrics::Metrics::new()));
    let addr = serve_in_background("127.0.0.1:0", router(state.clone()))
        .await
        .unwrap();
    (RpcClient::new(format!("http://{}", addr)).unwrap(), state)
}

async fn wait_for_rows(state: &AppState, expected: i64) {
    for _ in 0..100 {
        if state.store.lock().unwrap().row_count().unwrap() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("store never reached {} rows", expected);
}

#[tokio::test]
async fn push_then_pull_round_trips() {
    let (client, state) = start_store(None).await;

    let ack = client
        .send_data(batch_json(vec![obs(12345, "2024-01-01T12:00:00Z", 42, "Foo")]))
        .await
        .unwrap();
    assert_eq!(ack.status, STATUS_OK);
    wait_for_rows(&state, 1).await;

    let req = DataRequest::window("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z");
    let res = client
        .receive_data(serde_json::to_string(&req).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status, STATUS_OK);

    let msgs: Vec<Msg> = serde_json::from_str(&res.payload).unwrap();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].aqi, 42);
    assert_eq!(msgs[0].idx, 12345);
    assert_eq!(msgs[0].time.iso, "2024-01-01T12:00:00Z");
}

#[tokio::test]
async fn empty_window_answers_no_data() {
    let (client, _state) = start_store(None).await;
    let req = DataRequest::window("2024-01-01T00:00:00Z", "2024-01-02T00:00:00Z");
    let res = client
        .receive_data(serde_json::to_string(&req).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status, STATUS_NO_DATA);
    assert!(res.payload.is_empty());
}

#[tokio::test]
async fn malformed_pull_request_is_a_sync_error() {
    let (client, _state) = start_store(None).await;

    let res = client.receive_data("not json").await.unwrap();
    assert_eq!(res.status, aq_protocol::STATUS_ERROR);
    assert!(res.payload.is_empty());

    // A window-less request is equally rejected.
    let res = client
        .receive_data(serde_json::to_string(&DataRequest::default()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status, aq_protocol::STATUS_ERROR);
}

#[tokio::test]
async fn push_forward_tick_delivers_once() {
    let sink = spawn_capture_sink().await;
    let (client, state) = start_store(Some(sink.base_url())).await;

    let recent = chrono::Utc::now() - chrono::Duration::hours(1);
    let iso = recent.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    client
        .send_data(batch_json(vec![obs(7, &iso, 55, "Bar")]))
        .await
        .unwrap();
    wait_for_rows(&state, 1).await;

    let mut watermark = PushWatermark::new();
    local_store::run_push_tick(&state, &mut watermark).await;
    assert_eq!(sink.len(), 1, "stored observation forwarded");

    let msgs: Vec<Msg> = serde_json::from_str(&sink.payloads()[0]).unwrap();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].aqi, 55);

    // Watermark advanced: the next tick has nothing new to push.
    local_store::run_push_tick(&state, &mut watermark).await;
    assert_eq!(sink.len(), 1, "no re-delivery after the watermark advanced");
}
