use chrono::{DateTime, Utc};

/// Current wall-clock time in milliseconds since the UNIX epoch.
///
/// Deadlines travel between processes in this unit.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parses a `deadline` metadata value (UNIX milliseconds).
///
/// Returns `None` for anything that is not a representable timestamp.
pub fn deadline_from_millis(value: &str) -> Option<DateTime<Utc>> {
    let millis = value.trim().parse::<i64>().ok()?;
    DateTime::from_timestamp_millis(millis)
}
