//! Channel and Statistic Ordering
//!
//! The channel order is fixed and identical across the Resampler, Windower,
//! Aggregator and Normalizer. Model inputs are positional, so reordering here
//! silently corrupts every prediction.

/// Number of sensor channels per reading.
///
/// Order: temperature, vibration, rpm, humidity.
///
/// Source: Device telemetry contract
pub const CHANNEL_COUNT: usize = 4;

/// Number of rolling statistics computed per channel.
///
/// Order: mean, std, min, max, median.
pub const STATISTIC_COUNT: usize = 5;

/// Length of the tabular feature vector (channels × statistics).
pub const FEATURE_COUNT: usize = CHANNEL_COUNT * STATISTIC_COUNT;

/// Wire names of the channels in model order.
pub const CHANNEL_NAMES: [&str; CHANNEL_COUNT] = ["temperature", "vibration", "rpm", "humidity"];

/// Wire names of the rolling statistics in column order.
pub const STATISTIC_NAMES: [&str; STATISTIC_COUNT] = ["mean", "std", "min", "max", "median"];

/// Tabular feature names, channel-major: `{channel}_{statistic}`.
///
/// This is the order the tabular predictor consumes.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "temperature_mean", "temperature_std", "temperature_min", "temperature_max", "temperature_median",
    "vibration_mean", "vibration_std", "vibration_min", "vibration_max", "vibration_median",
    "rpm_mean", "rpm_std", "rpm_min", "rpm_max", "rpm_median",
    "humidity_mean", "humidity_std", "humidity_min", "humidity_max", "humidity_median",
];
