//! Raw observation shapes as the air-quality feed serves them.
//!
//! Field names and spellings follow the feed JSON (`dominentpol`, the
//! single-letter IAQI keys).  Every field defaults so partially populated
//! feed payloads still decode; empty strings are skipped on re-emission
//! to keep stored JSON compact.

use serde::{Deserialize, Serialize};

fn is_zero_i64(v: &i64) -> bool {
    *v == 0
}

/// One attribution entry from the feed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Attributions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logo: String,
}

/// Reporting city; `geo` is `[lat, lng]` when present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct City {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geo: Vec<f64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

/// A single indexed-AQI measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    #[serde(default)]
    pub v: f64,
}

/// The indexed-AQI set: humidity, pressure, pm2.5, temperature, wind.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Iaqi {
    #[serde(default)]
    pub h: Measurement,
    #[serde(default)]
    pub p: Measurement,
    #[serde(default)]
    pub pm25: Measurement,
    #[serde(default)]
    pub t: Measurement,
    #[serde(default)]
    pub w: Measurement,
    #[serde(default)]
    pub wg: Measurement,
}

/// Observation time; `iso` (RFC3339) is the only field downstream reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObsTime {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tz: String,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub v: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub iso: String,
}

impl ObsTime {
    /// An `ObsTime` carrying only the RFC3339 instant, as rehydrated rows
    /// are rebuilt from the stored timestamp column.
    pub fn from_iso(iso: impl Into<String>) -> Self {
        ObsTime {
            iso: iso.into(),
            ..ObsTime::default()
        }
    }
}

/// One forecast day.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastDay {
    #[serde(default)]
    pub avg: f64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub day: String,
    #[serde(default)]
    pub max: f64,
    #[serde(default)]
    pub min: f64,
}

/// Per-pollutant daily forecast series.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForecastDays {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub o3: Vec<ForecastDay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pm10: Vec<ForecastDay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pm25: Vec<ForecastDay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uvi: Vec<ForecastDay>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub daily: ForecastDays,
}

/// The observation body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Msg {
    #[serde(default)]
    pub aqi: i64,
    #[serde(default)]
    pub idx: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributions: Vec<Attributions>,
    #[serde(default)]
    pub city: City,
    /// Feed spelling, kept verbatim.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dominentpol: String,
    #[serde(default)]
    pub iaqi: Iaqi,
    #[serde(default)]
    pub time: ObsTime,
    #[serde(default)]
    pub forecast: Forecast,
}

/// One station observation with its source status.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub msg: Msg,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cached: String,
}

/// The batch shape pushed collector -> ingestor -> local store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AirQualityData {
    #[serde(default)]
    pub obs: Vec<Observation>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ver: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_feed_shaped_payload() {
        let json = r#"{
            "obs": [{
                "msg": {
                    "aqi": 42,
                    "idx": 12345,
                    "city": {"geo": [43.65, -79.38], "name": "Toronto", "url": "https://aqicn.org/city/toronto"},
                    "dominentpol": "pm25",
                    "iaqi": {"h": {"v": 61.5}, "p": {"v": 1014.0}, "pm25": {"v": 42.0}, "t": {"v": 21.2}, "w": {"v": 2.1}, "wg": {"v": 4.4}},
                    "time": {"iso": "2024-01-01T00:00:00Z", "tz": "-05:00"}
                },
                "status": "ok"
            }],
            "status": "ok",
            "ver": "1"
        }"#;
        let data: AirQualityData = serde_json::from_str(json).unwrap();
        assert_eq!(data.status, "ok");
        assert_eq!(data.obs.len(), 1);
        let msg = &data.obs[0].msg;
        assert_eq!(msg.aqi, 42);
        assert_eq!(msg.idx, 12345);
        assert_eq!(msg.city.name, "Toronto");
        assert_eq!(msg.city.geo, vec![43.65, -79.38]);
        assert_eq!(msg.iaqi.h.v, 61.5);
        assert_eq!(msg.time.iso, "2024-01-01T00:00:00Z");
    }

    #[test]
    fn missing_fields_default() {
        let data: AirQualityData = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert!(data.obs.is_empty());
        assert!(data.ver.is_empty());

        let msg: Msg = serde_json::from_str("{}").unwrap();
        assert_eq!(msg.aqi, 0);
        assert!(msg.city.name.is_empty());
    }

    #[test]
    fn empty_strings_are_not_reemitted() {
        let obs = Observation {
            status: "ok".to_owned(),
            ..Observation::default()
        };
        let json = serde_json::to_value(&obs).unwrap();
        assert!(json.get("cached").is_none());
        assert!(json["msg"].get("dominentpol").is_none());
    }
}
