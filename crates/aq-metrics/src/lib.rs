// aq-metrics: labeled in-memory metric aggregator.
//
// Every stage owns one `Metrics` value and records two quantities per peer
// service name -- round-trip time and processing time, both in seconds --
// plus success/failure counters.  One mutex guards all series; nothing
// holds it across an await point, and derived statistics operate on a
// sorted copy of the observations.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

pub mod http;

pub use http::router;

/// Percentiles exposed in every summary.
pub const PERCENTILES: [u8; 6] = [25, 50, 75, 90, 95, 99];

// ---------------------------------------------------------------------------
// Series storage
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ServiceSeries {
    rtt: Vec<f64>,
    processing: Vec<f64>,
    sent_bytes: Vec<f64>,
    success: u64,
    failure: u64,
}

/// Which observation series a query addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    Rtt,
    Processing,
    SentBytes,
}

impl SeriesKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rtt" => Some(Self::Rtt),
            "processing" => Some(Self::Processing),
            "sent_bytes" => Some(Self::SentBytes),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Derived statistics over one observation series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    /// Keyed by percentile (25..99), value taken from the sorted slice at
    /// index `floor((n - 1) * p / 100)`.
    pub percentiles: BTreeMap<u8, f64>,
}

fn summarize(values: &[f64]) -> Option<Summary> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut percentiles = BTreeMap::new();
    for p in PERCENTILES {
        let idx = (n - 1) * usize::from(p) / 100;
        percentiles.insert(p, sorted[idx]);
    }

    Some(Summary {
        count: n,
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        variance,
        std_dev: variance.sqrt(),
        percentiles,
    })
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// The per-stage metric aggregator.
#[derive(Debug, Default)]
pub struct Metrics {
    inner: Mutex<HashMap<String, ServiceSeries>>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Record one RTT observation (seconds) for `service`.
    pub fn add_rtt_time(&self, service: &str, seconds: f64) {
        let mut inner = self.inner.lock().expect("metrics mutex");
        inner.entry(service.to_owned()).or_default().rtt.push(seconds);
    }

    /// Record one processing-time observation (seconds) for `service`.
    pub fn add_processing_time(&self, service: &str, seconds: f64) {
        let mut inner = self.inner.lock().expect("metrics mutex");
        inner
            .entry(service.to_owned())
            .or_default()
            .processing
            .push(seconds);
    }

    /// Record the payload size (bytes) of one outbound push to `service`.
    pub fn add_sent_data_bytes(&self, service: &str, bytes: f64) {
        let mut inner = self.inner.lock().expect("metrics mutex");
        inner
            .entry(service.to_owned())
            .or_default()
            .sent_bytes
            .push(bytes);
    }

    pub fn success(&self, service: &str) {
        let mut inner = self.inner.lock().expect("metrics mutex");
        inner.entry(service.to_owned()).or_default().success += 1;
    }

    pub fn failure(&self, service: &str) {
        let mut inner = self.inner.lock().expect("metrics mutex");
        inner.entry(service.to_owned()).or_default().failure += 1;
    }

    /// Known service names, sorted for stable output.
    pub fn service_names(&self) -> Vec<String> {
        let inner = self.inner.lock().expect("metrics mutex");
        let mut names: Vec<String> = inner.keys().cloned().collect();
        names.sort();
        names
    }

    /// Summary of one series, or `None` when nothing was recorded.
    pub fn summary(&self, service: &str, kind: SeriesKind) -> Option<Summary> {
        let inner = self.inner.lock().expect("metrics mutex");
        let series = inner.get(service)?;
        match kind {
            SeriesKind::Rtt => summarize(&series.rtt),
            SeriesKind::Processing => summarize(&series.processing),
            SeriesKind::SentBytes => summarize(&series.sent_bytes),
        }
    }

    /// (success, failure) counters, or `None` for an unknown service.
    pub fn counters(&self, service: &str) -> Option<(u64, u64)> {
        let inner = self.inner.lock().expect("metrics mutex");
        inner.get(service).map(|s| (s.success, s.failure))
    }

    /// Integer success percentage over all outcomes, or `None` when no
    /// outcome was recorded.
    pub fn success_rate(&self, service: &str) -> Option<u64> {
        let (ok, fail) = self.counters(service)?;
        let total = ok + fail;
        if total == 0 {
            return None;
        }
        Some(ok * 100 / total)
    }

    /// Integer failure percentage over all outcomes.
    pub fn failure_rate(&self, service: &str) -> Option<u64> {
        let rate = self.success_rate(service)?;
        Some(100 - rate)
    }
}

// ---------------------------------------------------------------------------
// Bucket boundary parsing (exporter-compatible configuration surface)
// ---------------------------------------------------------------------------

/// Parse comma-separated histogram bucket boundaries; malformed entries
/// are dropped.  An empty or unset value yields an empty list (callers
/// fall back to defaults).
pub fn parse_buckets(s: &str) -> Vec<f64> {
    s.split(',')
        .filter_map(|part| part.trim().parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_has_no_summary() {
        let m = Metrics::new();
        assert!(m.summary("ingestor", SeriesKind::Rtt).is_none());
        m.success("ingestor");
        assert!(m.summary("ingestor", SeriesKind::Rtt).is_none());
    }

    #[test]
    fn summary_statistics() {
        let m = Metrics::new();
        for v in [4.0, 2.0, 1.0, 3.0] {
            m.add_processing_time("processing", v);
        }
        let s = m.summary("processing", SeriesKind::Processing).unwrap();
        assert_eq!(s.count, 4);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.variance, 1.25);
        assert!((s.std_dev - 1.25f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn percentile_index_is_floor_of_n_minus_one() {
        let m = Metrics::new();
        // Sorted: [1, 2, 3, 4, 5]; n-1 = 4.
        for v in [5.0, 3.0, 1.0, 4.0, 2.0] {
            m.add_rtt_time("svc", v);
        }
        let s = m.summary("svc", SeriesKind::Rtt).unwrap();
        // floor(4 * 25 / 100) = 1 -> 2.0
        assert_eq!(s.percentiles[&25], 2.0);
        // floor(4 * 50 / 100) = 2 -> 3.0
        assert_eq!(s.percentiles[&50], 3.0);
        // floor(4 * 75 / 100) = 3 -> 4.0
        assert_eq!(s.percentiles[&75], 4.0);
        // floor(4 * 90 / 100) = 3 -> 4.0
        assert_eq!(s.percentiles[&90], 4.0);
        // floor(4 * 99 / 100) = 3 -> 4.0
        assert_eq!(s.percentiles[&99], 4.0);
    }

    #[test]
    fn single_observation_percentiles() {
        let m = Metrics::new();
        m.add_rtt_time("svc", 7.0);
        let s = m.summary("svc", SeriesKind::Rtt).unwrap();
        for p in PERCENTILES {
            assert_eq!(s.percentiles[&p], 7.0);
        }
    }

    #[test]
    fn summaries_do_not_mutate_recorded_order() {
        let m = Metrics::new();
        for v in [3.0, 1.0, 2.0] {
            m.add_rtt_time("svc", v);
        }
        let first = m.summary("svc", SeriesKind::Rtt).unwrap();
        let second = m.summary("svc", SeriesKind::Rtt).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sent_bytes_is_its_own_series() {
        let m = Metrics::new();
        m.add_sent_data_bytes("local-store", 1024.0);
        m.add_sent_data_bytes("local-store", 2048.0);
        let s = m.summary("local-store", SeriesKind::SentBytes).unwrap();
        assert_eq!(s.count, 2);
        assert_eq!(s.max, 2048.0);
        assert!(m.summary("local-store", SeriesKind::Rtt).is_none());
    }

    #[test]
    fn success_and_failure_rates_are_integer_percentages() {
        let m = Metrics::new();
        m.success("processing");
        m.success("processing");
        m.failure("processing");
        assert_eq!(m.counters("processing"), Some((2, 1)));
        assert_eq!(m.success_rate("processing"), Some(66));
        assert_eq!(m.failure_rate("processing"), Some(34));
        assert_eq!(m.success_rate("unknown"), None);
    }

    #[test]
    fn service_names_are_sorted() {
        let m = Metrics::new();
        m.success("b");
        m.success("a");
        m.add_rtt_time("c", 0.1);
        assert_eq!(m.service_names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn parse_buckets_drops_garbage() {
        assert_eq!(parse_buckets("0.01, 0.1,0.5,1"), vec![0.01, 0.1, 0.5, 1.0]);
        assert_eq!(parse_buckets("a,0.5,b"), vec![0.5]);
        assert!(parse_buckets("").is_empty());
    }

    #[test]
    fn concurrent_writers_do_not_lose_samples() {
        use std::sync::Arc;
        let m = Arc::new(Metrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = m.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    m.add_rtt_time("svc", 0.001);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.summary("svc", SeriesKind::Rtt).unwrap().count, 800);
    }
}
