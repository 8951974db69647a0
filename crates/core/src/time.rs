use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Result, RumshopError};

pub fn unix_nanos(ts: DateTime<Utc>) -> u64 {
    ts.timestamp_nanos_opt().map(|n| n.max(0) as u64).unwrap_or(0)
}

/// Seconds since the epoch with sub-second precision, the way orders store
/// their creation time.
pub fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_micros() as f64 / 1_000_000.0
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| RumshopError::Parse(format!("invalid duration {input}: {e}")))
}
