//! Time-Related Constants
//!
//! This module defines time conversion factors and the default resampling
//! bin width. All internal timestamps are milliseconds since the Unix epoch.

// ===== TIME UNIT CONVERSIONS =====

/// Milliseconds per second.
pub const MS_PER_SECOND: i64 = 1000;

/// Seconds per minute.
pub const SECONDS_PER_MINUTE: i64 = 60;

/// Milliseconds per minute.
pub const MS_PER_MINUTE: i64 = MS_PER_SECOND * SECONDS_PER_MINUTE;

// ===== RESAMPLING =====

/// Default resampling bin width (milliseconds).
///
/// Devices report every 30-60 seconds with jitter, so one-minute bins hold
/// one or two raw readings each. Bins are aligned to multiples of the width
/// counted from the Unix epoch.
///
/// Source: Telemetry sampling profile (30-60 s interval, ±5 s jitter)
pub const DEFAULT_BIN_WIDTH_MS: i64 = MS_PER_MINUTE;
