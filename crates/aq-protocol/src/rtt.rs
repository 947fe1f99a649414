//! Four-point round-trip-time computation.
//!
//! Given sender send time S, receiver-recorded receive R, receiver-recorded
//! response send R', and sender-recorded response receive S':
//!
//! ```text
//! RTT_ms = (R - S) + (S' - R')
//! ```
//!
//! The two receiver-side values travel as decimal-string wire timestamps;
//! the two sender-side values are local clock readings.  With monotone
//! non-decreasing wall-clocks the result is non-negative.

use crate::time::{parse_millis, ParseMillisError};

/// RTT in milliseconds from the four correlated timestamps.
pub fn calculate_rtt(
    sent_ms: i64,
    received_timestamp: &str,
    ack_sent_timestamp: &str,
    ack_received_ms: i64,
) -> Result<f64, ParseMillisError> {
    let received_ms = parse_millis(received_timestamp)?;
    let resp_sent_ms = parse_millis(ack_sent_timestamp)?;
    let rtt = (received_ms - sent_ms) + (ack_received_ms - resp_sent_ms);
    Ok(rtt as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symmetric_path() {
        // S=0, R=10, R'=12, S'=22: 10ms out + 10ms back.
        let rtt = calculate_rtt(0, "10", "12", 22).unwrap();
        assert_eq!(rtt, 20.0);
    }

    #[test]
    fn zero_latency() {
        let rtt = calculate_rtt(100, "100", "100", 100).unwrap();
        assert_eq!(rtt, 0.0);
    }

    #[test]
    fn non_negative_under_monotone_clocks() {
        // Receiver processing time (R' - R) does not count toward RTT.
        let rtt = calculate_rtt(0, "5", "500", 505).unwrap();
        assert_eq!(rtt, 10.0);
        assert!(rtt >= 0.0);
    }

    #[test]
    fn bad_wire_timestamp_is_an_error() {
        assert!(calculate_rtt(0, "abc", "12", 22).is_err());
        assert!(calculate_rtt(0, "10", "", 22).is_err());
    }
}
