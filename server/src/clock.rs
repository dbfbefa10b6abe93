//! Time source abstraction for envelope timestamps.
//!
//! This module provides a `TimeSource` trait that abstracts over wall-clock
//! time, allowing the server to stamp envelopes with real system time in
//! production and a fixed instant in tests.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Abstraction over wall-clock time.
pub trait TimeSource: Send + Sync {
    /// Get the current UTC time.
    fn now(&self) -> DateTime<Utc>;

    /// Get the current time in milliseconds since Unix epoch.
    fn now_ms(&self) -> i64 {
        self.now().timestamp_millis()
    }

    /// Get the current time as an ISO-8601 string with millisecond precision.
    ///
    /// The format matches `2024-01-01T00:00:00.000Z`.
    fn now_iso(&self) -> String {
        format_timestamp(self.now())
    }
}

/// Real time source using the system clock.
///
/// This is the default implementation used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A time source frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource(pub DateTime<Utc>);

impl FixedTimeSource {
    /// Create a fixed time source from milliseconds since Unix epoch.
    ///
    /// Out-of-range values fall back to the Unix epoch.
    #[must_use]
    pub fn from_millis(ms: i64) -> Self {
        Self(
            Utc.timestamp_millis_opt(ms)
                .single()
                .unwrap_or_default(),
        )
    }
}

impl TimeSource for FixedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Format a UTC instant as ISO-8601 with millisecond precision and a `Z` suffix.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_time_source() {
        let source = SystemTimeSource;
        let t1 = source.now_ms();
        let t2 = source.now_ms();

        // Time should be reasonable (after 2020)
        assert!(t1 > 1_577_836_800_000); // 2020-01-01 00:00:00 UTC

        // Time should not go backwards
        assert!(t2 >= t1);
    }

    #[test]
    fn test_fixed_time_source_iso_format() {
        let source = FixedTimeSource::from_millis(1_700_000_000_123);
        assert_eq!(source.now_iso(), "2023-11-14T22:13:20.123Z");
        assert_eq!(source.now_ms(), 1_700_000_000_123);
    }

    #[test]
    fn test_system_timestamp_parses_back() {
        let stamp = SystemTimeSource.now_iso();
        assert!(stamp.ends_with('Z'));
        assert!(DateTime::parse_from_rfc3339(&stamp).is_ok());
    }
}
