//! Drop-empty-city filter.

use aq_model::AirQualityData;
use tracing::info;

/// Remove observations whose city name is empty, keeping the batch's
/// top-level `status` and `ver`.
///
/// `None` when nothing survives -- the whole batch is dropped.
pub fn filter_empty_cities(data: AirQualityData) -> Option<AirQualityData> {
    let AirQualityData { obs, status, ver } = data;
    let total = obs.len();
    let surviving: Vec<_> = obs
        .into_iter()
        .filter(|o| !o.msg.city.name.is_empty())
        .collect();

    if surviving.len() < total {
        info!(
            dropped = total - surviving.len(),
            kept = surviving.len(),
            "dropped observations with empty city name"
        );
    }
    if surviving.is_empty() {
        return None;
    }
    Some(AirQualityData {
        obs: surviving,
        status,
        ver,
    })
}
