//! The processor's pull watermark.
//!
//! State is a single `last_call` instant owned by the ticker task.  The
//! pull window opens at `last_call` (or `now - 8h` when unset) and closes
//! at `now + 1h` -- the forward hour absorbs small clock skew between
//! stages.  After a successful pull the watermark advances to the window
//! end; it never regresses, and a crash reseeds it, accepting re-delivery
//! that the sinks' dedup absorbs.

use chrono::{DateTime, Duration, Utc};

const SEED_LOOKBACK_HOURS: i64 = 8;
const FORWARD_WINDOW_HOURS: i64 = 1;

#[derive(Debug, Default)]
pub struct PullWatermark {
    last_call: Option<DateTime<Utc>>,
}

impl PullWatermark {
    pub fn new() -> Self {
        PullWatermark::default()
    }

    /// The `(start, end)` window for a tick at `now`.
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self
            .last_call
            .unwrap_or_else(|| now - Duration::hours(SEED_LOOKBACK_HOURS));
        let end = now + Duration::hours(FORWARD_WINDOW_HOURS);
        (start, end)
    }

    /// Advance after a successful pull; regressions are ignored.
    pub fn advance(&mut self, to: DateTime<Utc>) {
        if self.last_call.map_or(true, |cur| to > cur) {
            self.last_call = Some(to);
        }
    }

    pub fn last_call(&self) -> Option<DateTime<Utc>> {
        self.last_call
    }
}
