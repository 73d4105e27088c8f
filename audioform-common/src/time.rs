//! Timestamp utilities

use chrono::{DateTime, FixedOffset, Utc};

/// US Eastern standard time offset used for report timestamps
const EASTERN_OFFSET_SECS: i32 = -5 * 3600;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Round milliseconds to the nearest whole second, halves rounding up
pub fn round_millis_to_secs(millis: i64) -> i64 {
    (millis + 500).div_euclid(1000)
}

/// Whole seconds between two instants, rounded to nearest
pub fn elapsed_whole_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    round_millis_to_secs((end - start).num_milliseconds())
}

/// Render a timestamp in Eastern standard time, e.g. `01/14/2025, 10:18 PM EST`
pub fn format_eastern(ts: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(EASTERN_OFFSET_SECS) {
        Some(offset) => ts
            .with_timezone(&offset)
            .format("%m/%d/%Y, %I:%M %p EST")
            .to_string(),
        None => ts.to_rfc3339(),
    }
}
