//! Enriched record shapes: processor -> aggregated store -> dashboard.

use crate::observation::Msg;
use serde::{Deserialize, Serialize};

/// City row as stored by the aggregated store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityRecord {
    #[serde(default)]
    pub idx: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub city_name: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
}

/// Narrowed measurement set keyed by city and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQualityRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(default)]
    pub aqi: i64,
    #[serde(default)]
    pub dew_point: i64,
    #[serde(default)]
    pub humidity: i64,
    #[serde(default)]
    pub pressure: i64,
    #[serde(default)]
    pub temperature: i64,
    #[serde(default)]
    pub wind_speed: i64,
    #[serde(default)]
    pub wind_gust: i64,
    #[serde(default)]
    pub pm25: i64,
    #[serde(default)]
    pub pm10: i64,
}

/// The alerts-API property set, as fetched (discarded after enrichment).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRaw {
    #[serde(default)]
    pub area_desc: String,
    #[serde(default)]
    pub sent: String,
    #[serde(default)]
    pub effective: String,
    #[serde(default)]
    pub expires: String,
    #[serde(default)]
    pub ends: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub certainty: String,
    #[serde(default)]
    pub urgency: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
}

/// Normalized alert fields as stored and forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(default)]
    pub alert_desc: String,
    #[serde(default)]
    pub alert_effective: String,
    #[serde(default)]
    pub alert_expires: String,
    #[serde(default)]
    pub alert_status: String,
    #[serde(default)]
    pub alert_certainty: String,
    #[serde(default)]
    pub alert_urgency: String,
    #[serde(default)]
    pub alert_severity: String,
    #[serde(default)]
    pub alert_headline: String,
    #[serde(default)]
    pub alert_description: String,
    #[serde(default)]
    pub alert_event: String,
}

impl Alert {
    /// Normalize a raw alerts-API property set.
    ///
    /// Both `alert_desc` and `alert_description` carry the description,
    /// matching the upstream assignment.
    pub fn from_raw(raw: &AlertRaw) -> Self {
        Alert {
            alert_desc: raw.description.clone(),
            alert_effective: raw.effective.clone(),
            alert_expires: raw.expires.clone(),
            alert_status: raw.status.clone(),
            alert_certainty: raw.certainty.clone(),
            alert_urgency: raw.urgency.clone(),
            alert_severity: raw.severity.clone(),
            alert_headline: raw.headline.clone(),
            alert_description: raw.description.clone(),
            alert_event: raw.event.clone(),
        }
    }

    /// Sorted-key JSON rendering used as the content-hash input, so two
    /// equal alerts hash identically across processes.
    pub fn canonical_json(&self) -> serde_json::Result<String> {
        // serde_json::Value objects iterate in key order.
        let value = serde_json::to_value(self)?;
        serde_json::to_string(&value)
    }
}

/// One city-scoped measurement plus optional alert on the wire.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnhancedRecord {
    #[serde(default)]
    pub city: CityRecord,
    #[serde(rename = "airQualityData", default)]
    pub air_quality: AirQualityRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

impl EnhancedRecord {
    /// Narrow an observation into the enriched wire shape.
    ///
    /// `None` when the city has no `[lat, lng]` pair -- such observations
    /// cannot be enriched or keyed and are skipped upstream.
    ///
    /// `dew_point` and `humidity` both narrow from `iaqi.h`; the mapping
    /// is preserved from the upstream system.
    pub fn from_msg(msg: &Msg) -> Option<Self> {
        if msg.city.geo.len() < 2 {
            return None;
        }
        Some(EnhancedRecord {
            city: CityRecord {
                idx: msg.idx,
                city_name: msg.city.name.clone(),
                lat: msg.city.geo[0],
                lng: msg.city.geo[1],
            },
            air_quality: AirQualityRecord {
                timestamp: msg.time.iso.clone(),
                aqi: msg.aqi,
                dew_point: msg.iaqi.h.v as i64,
                humidity: msg.iaqi.h.v as i64,
                pressure: msg.iaqi.p.v as i64,
                temperature: msg.iaqi.t.v as i64,
                wind_speed: msg.iaqi.w.v as i64,
                wind_gust: msg.iaqi.wg.v as i64,
                pm25: msg.iaqi.pm25.v as i64,
                pm10: 0,
            },
            alert: None,
        })
    }
}

/// Aggregated-store query answer: one envelope per city.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnhancedResponse {
    #[serde(default)]
    pub city: CityRecord,
    #[serde(rename = "airQualityData", default, skip_serializing_if = "Vec::is_empty")]
    pub air_quality: Vec<AirQualityRecord>,
    #[serde(rename = "alert", default, skip_serializing_if = "Vec::is_empty")]
    pub alerts: Vec<Alert>,
}
