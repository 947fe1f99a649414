//! Millisecond wall-clock helpers for the wire timestamp contract.

use chrono::Utc;

/// Current wall-clock, ms since epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current wall-clock as the decimal-string wire form.
pub fn now_millis_string() -> String {
    now_millis().to_string()
}

/// Parse a decimal-string wire timestamp back to ms since epoch.
pub fn parse_millis(s: &str) -> Result<i64, ParseMillisError> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| ParseMillisError(format!("'{}': {}", s, e)))
}

#[derive(Debug)]
pub struct ParseMillisError(pub String);

impl std::fmt::Display for ParseMillisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid millisecond timestamp: {}", self.0)
    }
}

impl std::error::Error for ParseMillisError {}
