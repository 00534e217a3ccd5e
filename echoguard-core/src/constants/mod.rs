//! Constants for EchoGuard Core
//!
//! This module provides centralized, documented constants used throughout
//! the preparation and fusion path. Every numeric contract that downstream
//! models depend on is defined here exactly once.
//!
//! ## Organization
//!
//! Constants are grouped by domain:
//! - **Channels**: Channel and statistic ordering shared by every stage
//! - **Time**: Time unit conversions and the default bin width
//! - **Pipeline**: Window length, completeness gate, interpolation bounds
//! - **Fusion**: Fusion weights, risk thresholds, calibration defaults
//!
//! ## Usage Guidelines
//!
//! 1. Always use these constants instead of magic numbers
//! 2. Changing any value here changes the shape or meaning of model inputs;
//!    artifacts prepared under the old value must be regenerated
//! 3. Use descriptive names that include units

/// Channel and statistic ordering.
pub mod channels;

/// Time-related constants for bins and unit conversions.
pub mod time;

/// Windowing, gating and interpolation parameters.
pub mod pipeline;

/// Fusion weights, thresholds and neutral defaults.
pub mod fusion;

// Re-export commonly used constants for convenience
pub use channels::{CHANNEL_COUNT, STATISTIC_COUNT, FEATURE_COUNT};

pub use time::{MS_PER_SECOND, MS_PER_MINUTE, DEFAULT_BIN_WIDTH_MS};

pub use pipeline::{
    WINDOW_SIZE, MIN_VALID_RATIO, INTERPOLATION_LIMIT, MIN_PERIODS_DIVISOR,
};

pub use fusion::{
    SEQUENCE_WEIGHT, TABULAR_WEIGHT, ANOMALY_WEIGHT,
    RISK_MEDIUM_THRESHOLD, RISK_HIGH_THRESHOLD,
    NEUTRAL_PROBABILITY,
};
