//! 시간 포맷 모듈.

use chrono::{DateTime, FixedOffset};

/// Kuaishou publishes in China Standard Time (UTC+8).
const CST_OFFSET_SECS: i32 = 8 * 3600;

/// Formats a millisecond Unix timestamp as `YYYY-MM-DD_HH:MM:SS` in UTC+8.
pub fn format_publish_time(millis: i64) -> Option<String> {
    let offset = FixedOffset::east_opt(CST_OFFSET_SECS)?;
    let utc = DateTime::from_timestamp_millis(millis)?;
    Some(
        utc.with_timezone(&offset)
            .format("%Y-%m-%d_%H:%M:%S")
            .to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_publish_time_epoch() {
        assert_eq!(
            format_publish_time(0).as_deref(),
            Some("1970-01-01_08:00:00")
        );
    }

    #[test]
    fn test_format_publish_time_known_value() {
        // 2024-01-02 03:04:05 UTC
        assert_eq!(
            format_publish_time(1_704_164_645_000).as_deref(),
            Some("2024-01-02_11:04:05")
        );
    }

    #[test]
    fn test_format_publish_time_out_of_range() {
        assert!(format_publish_time(i64::MAX).is_none());
    }
}
