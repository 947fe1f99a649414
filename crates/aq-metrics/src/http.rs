//! HTTP query surface for the metric aggregator.
//!
//! Two endpoints:
//! - `GET /` -- index: known service names and supported query kinds.
//! - `GET /metric?type={rtt|processing|sent_bytes|success|failure}&service=NAME`
//!   -- summary statistics for the observation series, or rate+counters
//!   for the outcome kinds.

use crate::{Metrics, SeriesKind};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;

const QUERY_KINDS: [&str; 5] = ["rtt", "processing", "sent_bytes", "success", "failure"];

/// Build the metric router for one stage.
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metric", get(metric))
        .with_state(metrics)
}

async fn index(State(metrics): State<Arc<Metrics>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "services": metrics.service_names(),
        "types": QUERY_KINDS,
    }))
}

#[derive(Debug, Deserialize)]
struct MetricQuery {
    #[serde(rename = "type")]
    kind: String,
    service: String,
}

async fn metric(
    State(metrics): State<Arc<Metrics>>,
    Query(q): Query<MetricQuery>,
) -> impl IntoResponse {
    if let Some(kind) = SeriesKind::parse(&q.kind) {
        return match metrics.summary(&q.service, kind) {
            Some(summary) => (StatusCode::OK, Json(serde_json::json!(summary))).into_response(),
            None => not_found(&q.service, &q.kind),
        };
    }

    match q.kind.as_str() {
        "success" | "failure" => {
            let Some((success, failure)) = metrics.counters(&q.service) else {
                return not_found(&q.service, &q.kind);
            };
            let rate = if q.kind == "success" {
                metrics.success_rate(&q.service)
            } else {
                metrics.failure_rate(&q.service)
            };
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "service": q.service,
                    "success": success,
                    "failure": failure,
                    "rate_pct": rate,
                })),
            )
                .into_response()
        }
        other => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("unknown metric type '{}'", other),
                "types": QUERY_KINDS,
            })),
        )
            .into_response(),
    }
}

fn not_found(service: &str, kind: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": format!("no '{}' observations for service '{}'", kind, service),
        })),
    )
        .into_response()
}
