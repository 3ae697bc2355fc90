use chrono::{DateTime, TimeZone, Utc};
use eyre::{eyre, Result};

/// Timestamps are stored as unix milliseconds.
pub(crate) fn datetime_to_db(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

pub(crate) fn datetime_from_db(millis: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| eyre!("invalid timestamp in database: {}", millis))
}
