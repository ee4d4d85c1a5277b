//! Tests for timestamp formats
//!

use chrono::{TimeZone, Utc};
use shared::{display_timestamp, log_timestamp};

#[test]
fn display_format() {
    let time = Utc.with_ymd_and_hms(2026, 10, 16, 9, 5, 7).unwrap();
    assert_eq!(display_timestamp(time), "2026-Oct-16-09.05.07");
}

#[test]
fn log_format() {
    let time = Utc.with_ymd_and_hms(2026, 10, 16, 9, 5, 7).unwrap();
    assert_eq!(log_timestamp(time), "UTC: 2026-10-16 09:05:07.000000");
}
