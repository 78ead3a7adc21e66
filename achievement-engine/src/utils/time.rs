//! 时间工具函数 — UTC 日期标签与小时窗口
//!
//! All bucketing is UTC. Timestamps are Unix millis.

use chrono::{DateTime, TimeZone, Timelike, Utc};

/// Unix millis → UTC datetime, falling back to the epoch when out of range
pub fn utc_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).single().unwrap_or_default()
}

/// UTC calendar day label (`YYYY-MM-DD`) of a Unix millis timestamp
pub fn date_label(millis: i64) -> String {
    utc_datetime(millis).format("%Y-%m-%d").to_string()
}

/// Whether the UTC hour of `at` falls in the half-open window `[start, end)`
///
/// A window with `start > end` wraps past midnight; `start == end` is empty.
pub fn hour_in_window(at: &DateTime<Utc>, start: u32, end: u32) -> bool {
    let hour = at.hour();
    if start <= end {
        hour >= start && hour < end
    } else {
        hour >= start || hour < end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, hour, 30, 0).unwrap()
    }

    #[test]
    fn test_date_label() {
        // 2024-01-05T23:59:59.999Z
        assert_eq!(date_label(1_704_499_199_999), "2024-01-05");
        assert_eq!(date_label(1_704_499_200_000), "2024-01-06");
        assert_eq!(date_label(0), "1970-01-01");
    }

    #[test]
    fn test_hour_window_half_open() {
        assert!(!hour_in_window(&at_hour(0), 1, 4));
        assert!(hour_in_window(&at_hour(1), 1, 4));
        assert!(hour_in_window(&at_hour(3), 1, 4));
        assert!(!hour_in_window(&at_hour(4), 1, 4));
    }

    #[test]
    fn test_hour_window_wraps_midnight() {
        assert!(hour_in_window(&at_hour(23), 22, 2));
        assert!(hour_in_window(&at_hour(1), 22, 2));
        assert!(!hour_in_window(&at_hour(2), 22, 2));
        assert!(!hour_in_window(&at_hour(12), 22, 2));
    }

    #[test]
    fn test_empty_window() {
        assert!((0..24).all(|h| !hour_in_window(&at_hour(h), 3, 3)));
    }
}
