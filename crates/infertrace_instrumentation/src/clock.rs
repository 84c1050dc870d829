//! Paired monotonic/wall-clock timestamps and session identifiers.

use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

/// A single logical instant viewed through both clocks.
///
/// The monotonic half drives every duration computed by the trackers; the wall
/// half is what ends up in the log. Both are captured back to back in [`Timestamp::now`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl Timestamp {
    #[must_use]
    pub fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }

    /// Monotonic time elapsed between `earlier` and `self`, zero if `earlier` is later.
    #[must_use]
    pub fn since(&self, earlier: &Timestamp) -> Duration {
        self.instant.saturating_duration_since(earlier.instant)
    }

    /// Microseconds since the Unix epoch according to the wall clock.
    #[must_use]
    pub fn epoch_micros(&self) -> u64 {
        u64::try_from(self.wall.timestamp_micros()).unwrap_or(0)
    }

    /// RFC 3339 rendering with millisecond precision, e.g. `2024-08-23T14:00:00.123Z`.
    #[must_use]
    pub fn display(&self) -> String {
        self.wall.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.display())
    }
}

/// Generate an opaque session id: `<prefix>_<yyyymmdd>_<hhmmss>_<8 hex digits>`.
///
/// The time part keeps ids sortable; the random suffix separates sessions opened
/// within the same second.
#[must_use]
pub fn generate_session_id(prefix: &str) -> String {
    let now = Utc::now();
    let suffix: u32 = rand::random();
    format!("{prefix}_{}_{suffix:08x}", now.format("%Y%m%d_%H%M%S"))
}

#[path = "clock.test.rs"]
mod tests;
