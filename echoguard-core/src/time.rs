//! Time management for telemetry ingestion
//!
//! Provides a clock abstraction so the "missing timestamp defaults to now"
//! rule can be exercised deterministically:
//! - System clock (production)
//! - Fixed clock (tests, replays)
//!
//! Also hosts the bin alignment helper shared by the Resampler.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::errors::SchemaError;

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Source of time for the system
pub trait TimeSource: Send + Sync {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time
    fn is_wall_clock(&self) -> bool;
}

/// System wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        Utc::now().timestamp_millis()
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Fixed time source for testing
#[derive(Debug, Clone)]
pub struct FixedTime {
    timestamp: Timestamp,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Move the clock forward
    pub fn advance(&mut self, ms: i64) {
        self.timestamp += ms;
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Parse a wire timestamp into epoch milliseconds.
///
/// Accepts RFC 3339 with an offset (`2024-03-01T12:00:00Z`,
/// `2024-03-01T13:00:00+01:00`) and naive ISO-8601 without one
/// (`2024-03-01T12:00:00`, `2024-03-01 12:00:00.250`), which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<Timestamp, SchemaError> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }

    Err(SchemaError::InvalidTimestamp {
        value: raw.to_string(),
    })
}

/// Magnitude above which a numeric timestamp is read as milliseconds
/// rather than seconds (2e10 s is in the year 2603).
const EPOCH_SECONDS_LIMIT: f64 = 2e10;

/// Convert a numeric wire timestamp into epoch milliseconds.
///
/// Values up to 2e10 in magnitude are seconds, larger ones milliseconds.
/// Fractions are kept to the millisecond. Values outside the calendar range
/// are rejected.
pub fn epoch_timestamp(value: f64) -> Result<Timestamp, SchemaError> {
    let millis = if value.abs() <= EPOCH_SECONDS_LIMIT {
        value * 1000.0
    } else {
        value
    };

    Some(millis.round())
        .filter(|m| m.is_finite() && m.abs() < i64::MAX as f64)
        .and_then(|m| DateTime::<Utc>::from_timestamp_millis(m as i64))
        .map(|dt| dt.timestamp_millis())
        .ok_or_else(|| SchemaError::InvalidTimestamp {
            value: value.to_string(),
        })
}

/// Start of the bin containing `timestamp`.
///
/// Bins are aligned to multiples of `width_ms` from the epoch, so two devices
/// resampled independently share bin boundaries. Floors toward negative
/// infinity for pre-epoch times.
pub fn bin_start(timestamp: Timestamp, width_ms: i64) -> Timestamp {
    timestamp.div_euclid(width_ms) * width_ms
}
