// aq-model: domain shapes carried between pipeline stages.
//
// The observation tree mirrors the upstream feed JSON (including its
// `dominentpol` spelling); the enriched side is the narrowed wire shape
// the processor hands to the aggregated store.  Everything here is plain
// serde data -- behavior lives in the services.

pub mod enriched;
pub mod observation;
pub mod request;

pub use enriched::{
    AirQualityRecord, Alert, AlertRaw, CityRecord, EnhancedRecord, EnhancedResponse,
};
pub use observation::{
    AirQualityData, Attributions, City, Forecast, ForecastDay, ForecastDays, Iaqi, Measurement,
    Msg, ObsTime, Observation,
};
pub use request::{DataRequest, RequestType};
