//! Sync-timestamp formatting
//!
//! Synced assets carry two stamps: `backend_synced_at` (when the local copy
//! was made) and `runtime_node_synced_at` (the external record's own creation
//! time). Both use the same wire format: `YYYY-MM-DD HH:MM:SS`, no timezone
//! suffix, truncated to whole seconds. All timestamps are interpreted as UTC;
//! conversion from timezone-aware values must happen before formatting.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

use crate::error::{EdgeSyncError, Result};

/// Wire format for sync timestamps.
pub const SYNC_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a naive UTC timestamp as `YYYY-MM-DD HH:MM:SS`.
///
/// Sub-second precision is dropped, not rounded.
pub fn format_sync_timestamp(ts: NaiveDateTime) -> String {
    ts.format(SYNC_TIMESTAMP_FORMAT).to_string()
}

/// Format a timezone-aware timestamp, normalizing to UTC first.
pub fn format_sync_timestamp_utc(ts: DateTime<Utc>) -> String {
    format_sync_timestamp(ts.naive_utc())
}

/// Parse a `YYYY-MM-DD HH:MM:SS` string back into a naive UTC timestamp.
pub fn parse_sync_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, SYNC_TIMESTAMP_FORMAT)
        .map_err(|e| EdgeSyncError::InvalidTimestamp(format!("{}: {}", s, e)))
}

/// Truncate a timestamp to whole seconds.
pub fn truncate_to_seconds(ts: NaiveDateTime) -> NaiveDateTime {
    // with_nanosecond(0) only fails for leap-second inputs
    ts.with_nanosecond(0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn sample() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(10, 0, 0, 750)
            .unwrap()
    }

    #[test]
    fn test_format_drops_subseconds() {
        assert_eq!(
            format_sync_timestamp(truncate_to_seconds(sample())),
            "2024-01-02 10:00:00"
        );
    }

    #[test]
    fn test_format_utc_normalizes() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        assert_eq!(format_sync_timestamp_utc(ts), "2024-01-02 10:00:00");
    }

    #[test]
    fn test_parse_roundtrip() {
        let parsed = parse_sync_timestamp("2024-01-02 10:00:00").unwrap();
        assert_eq!(format_sync_timestamp(parsed), "2024-01-02 10:00:00");
    }

    #[test]
    fn test_parse_rejects_timezone_suffix() {
        assert!(parse_sync_timestamp("2024-01-02T10:00:00Z").is_err());
    }
}
