use chrono::{DateTime, Utc};

/// Timestamp used in broadcasts and archive file names, e.g. `2026-Oct-16-09.30.00`.
pub const DISPLAY_FORMAT: &str = "%Y-%b-%d-%H.%M.%S";

/// Timestamp prefixed to every event log line.
pub const LOG_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Formats a time for humans and file names.
pub fn display_timestamp(time: DateTime<Utc>) -> String {
    time.format(DISPLAY_FORMAT).to_string()
}

/// Formats a time as an event log line prefix.
pub fn log_timestamp(time: DateTime<Utc>) -> String {
    format!("UTC: {}", time.format(LOG_FORMAT))
}
