//! Fusion Constants
//!
//! This module defines the fixed fusion law that combines the three model
//! outputs into one risk score, the risk-level thresholds, and the neutral
//! values substituted when a predictor is unavailable.

// ===== FUSION WEIGHTS =====

/// Weight of the sequence classifier probability.
///
/// The sequence model sees the full hour of raw dynamics and carries most
/// of the signal.
///
/// Source: Fusion design (weights are fixed, not fitted)
pub const SEQUENCE_WEIGHT: f64 = 0.6;

/// Weight of the tabular classifier probability.
///
/// Source: Fusion design
pub const TABULAR_WEIGHT: f64 = 0.3;

/// Weight of the calibrated reconstruction anomaly score.
///
/// Source: Fusion design
pub const ANOMALY_WEIGHT: f64 = 0.1;

// ===== RISK LEVELS =====

/// Fused risk at or above this value is MEDIUM.
pub const RISK_MEDIUM_THRESHOLD: f64 = 0.3;

/// Fused risk at or above this value is HIGH.
pub const RISK_HIGH_THRESHOLD: f64 = 0.6;

// ===== ANOMALY CALIBRATION DEFAULTS =====

/// Default logistic shift applied to the reconstruction error.
///
/// Reconstruction errors around this value map to 0.5.
///
/// Source: Provisional heuristic, configurable per deployment
pub const ANOMALY_CALIBRATION_SHIFT: f64 = 0.01;

/// Default logistic slope applied to the reconstruction error.
///
/// Source: Provisional heuristic, configurable per deployment
pub const ANOMALY_CALIBRATION_SCALE: f64 = 100.0;

// ===== DEGRADED OPERATION =====

/// Probability substituted for an unavailable classifier.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;
