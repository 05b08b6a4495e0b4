use chrono::Utc;

/// Current wall-clock time as unix seconds.
pub fn current_unix_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Unix timestamp `delay_seconds` from now. Negative delays point to the past.
pub fn unix_timestamp_in(delay_seconds: i64) -> i64 {
    current_unix_timestamp() + delay_seconds
}
