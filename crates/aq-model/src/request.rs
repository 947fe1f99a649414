//! Pull-request body shared by the watermark pulls and the dashboard.

use serde::{Deserialize, Serialize};

fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

/// Query discriminator for the aggregated store's read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    #[serde(rename = "points")]
    Points,
}

/// Pull request carried in the `receive` payload.
///
/// With `request_type` unset, `start_time`/`end_time`/`lat`/`lng` select a
/// time window at a coordinate; with `Points` the rest is ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub start_time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub end_time: String,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub lat: f64,
    #[serde(default, skip_serializing_if = "is_zero_f64")]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_type: Option<RequestType>,
}

impl DataRequest {
    /// A window-only request (local store pulls).
    pub fn window(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        DataRequest {
            start_time: start_time.into(),
            end_time: end_time.into(),
            ..DataRequest::default()
        }
    }

    /// The all-cities request (dashboard pulls).
    pub fn points() -> Self {
        DataRequest {
            request_type: Some(RequestType::Points),
            ..DataRequest::default()
        }
    }
}
