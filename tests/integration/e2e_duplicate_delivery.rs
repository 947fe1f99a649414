//! Re-delivery across the processor edge is absorbed by the aggregated
//! store's content hashes.
//!
//! The same observation list is pushed to the processor twice (the
//! overlap the local store's push tick and the processor's pull tick can
//! produce in real deployments); the aggregated store's row set after
//! the second delivery equals the set after the first.

use aq_model::{Alert, City, Iaqi, Measurement, Msg, ObsTime};
use aq_protocol::handle::new_client_handle;
use aq_protocol::server::serve_in_background;
use aq_protocol::RpcClient;
use aq_test_utils::spawn_mock_alerts;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn msg(idx: i64) -> Msg {
    Msg {
        aqi: 42,
        idx,
        city: City {
            name: format!("City-{}", idx),
            geo: vec![43.65, -79.38],
            ..City::default()
        },
        iaqi: Iaqi {
            h: Measurement { v: 61.0 },
            pm25: Measurement { v: 42.0 },
            ..Iaqi::default()
        },
        time: ObsTime::from_iso("2024-01-01T12:00:00Z"),
        ..Msg::default()
    }
}

#[tokio::test]
async fn duplicate_observation_lists_converge_on_one_row_set() {
    let alerts_mock = spawn_mock_alerts(vec![aq_model::AlertRaw {
        description: "heat advisory".to_owned(),
        effective: "2024-01-01T00:00:00Z".to_owned(),
        expires: "2024-01-02T00:00:00Z".to_owned(),
        event: "Heat".to_owned(),
        ..aq_model::AlertRaw::default()
    }])
    .await;

    let aggregated = aggregated_store::AppState::new(
        Arc::new(Mutex::new(
            aggregated_store::AggregateStore::open_in_memory().unwrap(),
        )),
        Arc::new(aq_metrics::Metrics::new()),
    );
    let aggregated_addr =
        serve_in_background("127.0.0.1:0", aggregated_store::router(aggregated.clone()))
            .await
            .unwrap();

    let to_aggregated = new_client_handle();
    *to_aggregated.write().await =
        Some(RpcClient::new(format!("http://{}", aggregated_addr)).unwrap());
    let alerts = processor::AlertsClient::new(alerts_mock.base_url(), "(airmon e2e tests)").unwrap();
    let proc_state = processor::AppState::new(to_aggregated, alerts, Arc::new(aq_metrics::Metrics::new()));
    let proc_addr = serve_in_background("127.0.0.1:0", processor::router(proc_state))
        .await
        .unwrap();
    let processor_client = RpcClient::new(format!("http://{}", proc_addr)).unwrap();

    let payload = serde_json::to_string(&vec![msg(1), msg(2)]).unwrap();

    let counts = |state: &aggregated_store::AppState| {
        state.store.lock().unwrap().table_counts().unwrap()
    };

    processor_client.send_data(payload.clone()).await.unwrap();
    for _ in 0..200 {
        if counts(&aggregated) == (2, 2, 1) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    // The alert content is identical for both cities, so its hash dedups
    // it down to a single row even on first delivery.
    let after_first = counts(&aggregated);
    assert_eq!(after_first, (2, 2, 1), "two cities, two measurements, one alert");

    processor_client.send_data(payload).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let after_second = counts(&aggregated);
    assert_eq!(after_first, after_second, "re-delivery must be a no-op");

    // Equal alerts hash identically regardless of which delivery wrote them.
    let expected_alert = Alert {
        alert_desc: "heat advisory".to_owned(),
        alert_description: "heat advisory".to_owned(),
        alert_effective: "2024-01-01T00:00:00Z".to_owned(),
        alert_expires: "2024-01-02T00:00:00Z".to_owned(),
        alert_event: "Heat".to_owned(),
        ..Alert::default()
    };
    assert_eq!(
        aggregated_store::alert_hash(&expected_alert).unwrap().len(),
        64
    );
}
