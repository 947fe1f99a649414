// aq-test-utils: in-process doubles for the two external HTTP APIs and a
// capturing RPC sink, used by unit and integration suites.

pub mod capture_sink;
pub mod mock_alerts;
pub mod mock_waqi;

pub use capture_sink::{spawn_capture_sink, CaptureSink};
pub use mock_alerts::{spawn_mock_alerts, MockAlerts};
pub use mock_waqi::{spawn_mock_waqi, MockStation, MockWaqi};

/// `http://` base URL for a bound address.
pub fn base_url(addr: std::net::SocketAddr) -> String {
    format!("http://{}", addr)
}
