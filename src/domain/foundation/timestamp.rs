//! Timestamp value object for immutable points in time.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    ///
    /// Truncated to whole milliseconds so that values survive a round trip
    /// through PostgreSQL and through provider protocols that speak millis.
    pub fn now() -> Self {
        let now = Utc::now();
        Self::from_unix_millis(now.timestamp_millis()).unwrap_or(Self(now))
    }

    /// Creates a timestamp from a DateTime<Utc>.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the inner DateTime.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a new timestamp by adding the specified number of days.
    ///
    /// Negative values subtract days.
    pub fn add_days(&self, days: i64) -> Self {
        Self(self.0 + Duration::days(days))
    }

    /// Creates a timestamp from Unix milliseconds.
    ///
    /// Returns `None` when the value is outside chrono's representable range.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Returns the timestamp as Unix milliseconds.
    pub fn as_unix_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Returns the timestamp as Unix seconds.
    pub fn as_unix_secs(&self) -> i64 {
        self.0.timestamp()
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn timestamp_now_creates_current_time() {
        let before = Utc::now().timestamp_millis();
        let ts = Timestamp::now();
        let after = Utc::now().timestamp_millis();

        assert!(ts.as_unix_millis() >= before);
        assert!(ts.as_unix_millis() <= after);
    }

    #[test]
    fn now_has_millisecond_precision() {
        let ts = Timestamp::now();
        assert_eq!(ts.as_datetime().timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn from_unix_millis_roundtrips() {
        let ts = Timestamp::from_unix_millis(1_705_276_800_123).unwrap();
        assert_eq!(ts.as_unix_millis(), 1_705_276_800_123);
        assert_eq!(ts.as_unix_secs(), 1_705_276_800);
        assert_eq!(ts.as_datetime().year(), 2024);
    }

    #[test]
    fn add_days_moves_forward_and_back() {
        let ts = Timestamp::from_unix_millis(0).unwrap();
        assert_eq!(ts.add_days(1).as_unix_secs(), 86_400);
        assert_eq!(ts.add_days(-1).as_unix_secs(), -86_400);
    }

    #[test]
    fn timestamp_serializes_to_rfc3339() {
        let ts = Timestamp::from_unix_millis(1_705_276_800_000).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert!(json.contains("2024-01-15"));
    }
}
