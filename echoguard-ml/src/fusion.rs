//! Multi-Model Risk Fusion
//!
//! ## Overview
//!
//! Three independently produced model outputs are combined into one failure
//! risk with a fixed, reproducible law:
//!
//! ```text
//!   window ──► adapt (T × F) ──┬──► sequence classifier ──► sequence_prob ──────────┐
//!                              └──► autoencoder ──► anomaly_score ──► ae_scaled ────┤
//!   agg ──► 20-feature vector ─────► tabular classifier ──► tabular_prob ───────────┤
//!                                                                                  ▼
//!                          fused_risk = 0.6·sequence + 0.3·tabular + 0.1·ae_scaled
//! ```
//!
//! ## Anomaly Calibration
//!
//! The raw reconstruction error is unbounded. A logistic mapping brings it
//! into [0, 1]:
//!
//! ```text
//! ae_scaled = 1 / (1 + exp(-(anomaly_score - shift) · scale))
//! ```
//!
//! `shift` is the error mapped to 0.5 and `scale` the slope. Both default to
//! provisional values (0.01, 100) and are carried in `FusionConfig` so a
//! deployment can recalibrate from a validation set without code changes.
//!
//! ## Risk Levels
//!
//! | fused_risk      | level  |
//! |-----------------|--------|
//! | < 0.3           | LOW    |
//! | [0.3, 0.6)      | MEDIUM |
//! | ≥ 0.6           | HIGH   |
//!
//! ## Degraded Operation
//!
//! A predictor that failed to load, failed at runtime, or returned a value
//! outside its contract is replaced by its neutral default:
//!
//! - classifier probability: 0.5
//! - anomaly score: the calibration shift, so `ae_scaled` is exactly 0.5
//!
//! The response is still complete; `degraded` is set and `error` names every
//! substituted predictor. Only malformed input is returned as an error.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use echoguard_core::constants::channels::{FEATURE_COUNT, FEATURE_NAMES};
use echoguard_core::constants::fusion::{
    ANOMALY_CALIBRATION_SCALE, ANOMALY_CALIBRATION_SHIFT, ANOMALY_WEIGHT, NEUTRAL_PROBABILITY,
    RISK_HIGH_THRESHOLD, RISK_MEDIUM_THRESHOLD, SEQUENCE_WEIGHT, TABULAR_WEIGHT,
};
use echoguard_core::constants::pipeline::WINDOW_SIZE;
use echoguard_core::{ConfigError, Frame};

use crate::errors::{FusionError, FusionResult};
use crate::predictor::{reconstruction_error, PredictorError};
use crate::registry::{ModelKind, ModelRegistry};
use crate::shape::adapt_window;

/// Logistic mapping of reconstruction error into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyCalibration {
    /// Reconstruction error mapped to 0.5
    pub shift: f64,
    /// Slope of the mapping
    pub scale: f64,
}

impl Default for AnomalyCalibration {
    fn default() -> Self {
        Self {
            shift: ANOMALY_CALIBRATION_SHIFT,
            scale: ANOMALY_CALIBRATION_SCALE,
        }
    }
}

impl AnomalyCalibration {
    /// Map a reconstruction error into [0, 1]
    pub fn scale_score(&self, anomaly_score: f64) -> f64 {
        1.0 / (1.0 + (-(anomaly_score - self.shift) * self.scale).exp())
    }

    /// Anomaly score substituted when the autoencoder is unavailable
    pub fn neutral_score(&self) -> f64 {
        self.shift
    }

    /// Shift must be finite; scale finite and positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.shift.is_finite() {
            return Err(ConfigError::OutOfRange {
                name: "calibration.shift",
                value: self.shift,
                expected: "finite",
            });
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "calibration.scale",
                value: self.scale,
                expected: "finite and > 0",
            });
        }
        Ok(())
    }
}

/// Scorer parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Rows the models expect (T)
    pub window_size: usize,
    /// Anomaly score calibration
    pub calibration: AnomalyCalibration,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            calibration: AnomalyCalibration::default(),
        }
    }
}

impl FusionConfig {
    /// Decode from JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter against its domain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::OutOfRange {
                name: "window_size",
                value: 0.0,
                expected: ">= 1",
            });
        }
        self.calibration.validate()
    }
}

/// Discrete risk bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// fused_risk < 0.3
    Low,
    /// 0.3 ≤ fused_risk < 0.6
    Medium,
    /// fused_risk ≥ 0.6
    High,
}

impl RiskLevel {
    /// Bucket for a fused risk value
    pub fn from_score(fused_risk: f64) -> Self {
        if fused_risk < RISK_MEDIUM_THRESHOLD {
            RiskLevel::Low
        } else if fused_risk < RISK_HIGH_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }
}

/// Raw outputs of the three models
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScoreTriple {
    /// Sequence classifier probability
    pub sequence_prob: f64,
    /// Tabular classifier probability
    pub tabular_prob: f64,
    /// Mean squared reconstruction error
    pub anomaly_score: f64,
}

/// Derived fields of one fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusedRisk {
    /// Calibrated anomaly score
    pub ae_scaled: f64,
    /// 1 - tabular_prob
    pub health_score: f64,
    /// Weighted risk
    pub fused_risk: f64,
    /// Bucket of `fused_risk`
    pub risk_level: RiskLevel,
}

/// Combine three model outputs. Pure: equal inputs give equal outputs.
pub fn fuse(triple: &ModelScoreTriple, calibration: &AnomalyCalibration) -> FusedRisk {
    let ae_scaled = calibration.scale_score(triple.anomaly_score);
    let fused_risk = weighted_risk(triple.sequence_prob, triple.tabular_prob, ae_scaled);
    FusedRisk {
        ae_scaled,
        health_score: 1.0 - triple.tabular_prob,
        fused_risk,
        risk_level: RiskLevel::from_score(fused_risk),
    }
}

/// The fixed fusion law over already-calibrated terms.
///
/// The two minor terms are summed first: 0.3 + 0.1 rounds to exactly 0.4,
/// so all-certain inputs give exactly 1.0 and the result never exceeds it.
pub fn weighted_risk(sequence_prob: f64, tabular_prob: f64, ae_scaled: f64) -> f64 {
    SEQUENCE_WEIGHT * sequence_prob + (TABULAR_WEIGHT * tabular_prob + ANOMALY_WEIGHT * ae_scaled)
}

/// Scoring request: one window plus its aggregate feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FusionRequest {
    /// Up to T rows of F channel values
    pub window: Vec<Vec<f64>>,
    /// Named aggregate statistics; absent names count as 0.0
    pub agg: HashMap<String, f64>,
}

impl FusionRequest {
    /// Decode a request document
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Complete scoring result, degraded or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResponse {
    /// Sequence classifier probability (or neutral default)
    pub sequence_prob: f64,
    /// Tabular classifier probability (or neutral default)
    pub tabular_prob: f64,
    /// Reconstruction error (or neutral default)
    pub anomaly_score: f64,
    /// Calibrated anomaly score
    pub ae_scaled: f64,
    /// 1 - tabular_prob
    pub health_score: f64,
    /// Weighted risk
    pub fused_risk: f64,
    /// Bucket of `fused_risk`
    pub risk_level: RiskLevel,
    /// A neutral default replaced at least one model output
    pub degraded: bool,
    /// Which predictors were substituted, and why
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate mapping as a vector in `FEATURE_NAMES` order.
///
/// Missing names default to 0.0; names outside the feature set are ignored.
pub fn feature_vector(agg: &HashMap<String, f64>) -> FusionResult<[f64; FEATURE_COUNT]> {
    let mut features = [0.0; FEATURE_COUNT];
    for (slot, name) in features.iter_mut().zip(FEATURE_NAMES) {
        if let Some(&value) = agg.get(name) {
            if !value.is_finite() {
                return Err(FusionError::NonFiniteFeature {
                    name: name.to_string(),
                });
            }
            *slot = value;
        }
    }

    let ignored = agg.keys().filter(|k| !FEATURE_NAMES.contains(&k.as_str())).count();
    if ignored > 0 {
        debug!("ignoring {} aggregate entries outside the feature set", ignored);
    }
    Ok(features)
}

/// Substitutions made while scoring one request
#[derive(Default)]
struct Degradation {
    reasons: Vec<String>,
}

impl Degradation {
    fn unavailable(&mut self, reason: String) {
        self.reasons.push(reason);
    }

    fn out_of_contract(&mut self, model: ModelKind, reason: impl std::fmt::Display) {
        warn!("{} model output rejected: {}", model, reason);
        self.reasons.push(format!("{} model output rejected: {}", model, reason));
    }

    fn into_annotation(self) -> Option<String> {
        if self.reasons.is_empty() {
            None
        } else {
            Some(self.reasons.join("; "))
        }
    }
}

fn checked_probability(
    model: ModelKind,
    output: Result<f64, PredictorError>,
    degradation: &mut Degradation,
) -> Option<f64> {
    match output {
        Ok(p) if (0.0..=1.0).contains(&p) => Some(p),
        Ok(p) => {
            degradation.out_of_contract(model, format!("probability {} outside [0, 1]", p));
            None
        }
        Err(e) => {
            degradation.out_of_contract(model, e);
            None
        }
    }
}

/// Scores requests against the models held by a registry
#[derive(Debug)]
pub struct FusionScorer<'a> {
    registry: &'a ModelRegistry,
    config: FusionConfig,
}

impl<'a> FusionScorer<'a> {
    /// Scorer with a validated configuration
    pub fn new(registry: &'a ModelRegistry, config: FusionConfig) -> FusionResult<Self> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    /// Scorer with default configuration
    pub fn with_defaults(registry: &'a ModelRegistry) -> Self {
        Self {
            registry,
            config: FusionConfig::default(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Score one request.
    ///
    /// Errors only for malformed input. Unavailable or misbehaving models
    /// produce a degraded response instead.
    pub fn score(&self, request: &FusionRequest) -> FusionResult<FusionResponse> {
        let window = adapt_window(&request.window, self.config.window_size)?;
        let features = feature_vector(&request.agg)?;
        let mut degradation = Degradation::default();

        let triple = ModelScoreTriple {
            sequence_prob: self
                .sequence_prob(&window, &mut degradation)
                .unwrap_or(NEUTRAL_PROBABILITY),
            tabular_prob: self
                .tabular_prob(&features, &mut degradation)
                .unwrap_or(NEUTRAL_PROBABILITY),
            anomaly_score: self
                .anomaly_score(&window, &mut degradation)
                .unwrap_or_else(|| self.config.calibration.neutral_score()),
        };

        let fused = fuse(&triple, &self.config.calibration);
        let error = degradation.into_annotation();
        debug!(
            "fused risk {:.4} ({:?}){}",
            fused.fused_risk,
            fused.risk_level,
            if error.is_some() { ", degraded" } else { "" }
        );

        Ok(FusionResponse {
            sequence_prob: triple.sequence_prob,
            tabular_prob: triple.tabular_prob,
            anomaly_score: triple.anomaly_score,
            ae_scaled: fused.ae_scaled,
            health_score: fused.health_score,
            fused_risk: fused.fused_risk,
            risk_level: fused.risk_level,
            degraded: error.is_some(),
            error,
        })
    }

    fn sequence_prob(&self, window: &[Frame], degradation: &mut Degradation) -> Option<f64> {
        match self.registry.sequence() {
            Ok(model) => checked_probability(ModelKind::Sequence, model.predict(window), degradation),
            Err(e) => {
                degradation.unavailable(e.to_string());
                None
            }
        }
    }

    fn tabular_prob(
        &self,
        features: &[f64; FEATURE_COUNT],
        degradation: &mut Degradation,
    ) -> Option<f64> {
        match self.registry.tabular() {
            Ok(model) => {
                checked_probability(ModelKind::Tabular, model.predict_proba(features), degradation)
            }
            Err(e) => {
                degradation.unavailable(e.to_string());
                None
            }
        }
    }

    fn anomaly_score(&self, window: &[Frame], degradation: &mut Degradation) -> Option<f64> {
        let model = match self.registry.reconstructor() {
            Ok(model) => model,
            Err(e) => {
                degradation.unavailable(e.to_string());
                return None;
            }
        };

        let reconstruction = match model.reconstruct(window) {
            Ok(r) => r,
            Err(e) => {
                degradation.out_of_contract(ModelKind::Reconstructor, e);
                return None;
            }
        };

        match reconstruction_error(window, &reconstruction) {
            Some(score) if score.is_finite() => Some(score),
            Some(score) => {
                degradation.out_of_contract(
                    ModelKind::Reconstructor,
                    format!("reconstruction error {} is not finite", score),
                );
                None
            }
            None => {
                degradation.out_of_contract(
                    ModelKind::Reconstructor,
                    format!(
                        "reconstruction has {} rows, expected {}",
                        reconstruction.len(),
                        window.len()
                    ),
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::{Reconstructor, SequencePredictor};
    use crate::registry::StaticModels;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    struct Identity;

    impl Reconstructor for Identity {
        fn reconstruct(&self, window: &[Frame]) -> Result<Vec<Frame>, PredictorError> {
            Ok(window.to_vec())
        }
    }

    struct Truncating;

    impl Reconstructor for Truncating {
        fn reconstruct(&self, window: &[Frame]) -> Result<Vec<Frame>, PredictorError> {
            Ok(window[1..].to_vec())
        }
    }

    fn request(rows: usize) -> FusionRequest {
        FusionRequest {
            window: vec![vec![0.5; 4]; rows],
            agg: HashMap::from([("temperature_mean".to_string(), 0.25)]),
        }
    }

    #[test]
    fn test_weights() {
        assert_eq!(weighted_risk(1.0, 0.0, 0.0), 0.6);
        assert_eq!(weighted_risk(0.0, 0.0, 0.0), 0.0);
        assert_eq!(weighted_risk(1.0, 1.0, 1.0), 1.0);
        assert_eq!(RiskLevel::from_score(weighted_risk(1.0, 1.0, 1.0)), RiskLevel::High);
        assert!(close(SEQUENCE_WEIGHT + TABULAR_WEIGHT + ANOMALY_WEIGHT, 1.0));
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0.29), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.30), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.60), RiskLevel::High);
        assert_eq!(serde_json::to_string(&RiskLevel::Medium).unwrap(), "\"MEDIUM\"");
    }

    #[test]
    fn test_calibration_maps_shift_to_half() {
        let calibration = AnomalyCalibration::default();
        assert_eq!(calibration.scale_score(calibration.neutral_score()), 0.5);
        assert!(calibration.scale_score(0.05) > 0.98);
        assert!(calibration.scale_score(0.0) < 0.5);
    }

    #[test]
    fn test_fuse_fields() {
        let triple = ModelScoreTriple {
            sequence_prob: 0.8,
            tabular_prob: 0.4,
            anomaly_score: 0.01,
        };
        let fused = fuse(&triple, &AnomalyCalibration::default());
        assert_eq!(fused.ae_scaled, 0.5);
        assert!(close(fused.health_score, 0.6));
        assert!(close(fused.fused_risk, 0.48 + 0.12 + 0.05));
        assert_eq!(fused.risk_level, RiskLevel::High);
    }

    #[test]
    fn test_config_validation() {
        let config = FusionConfig::from_json_str(r#"{"calibration": {"scale": 50.0}}"#).unwrap();
        assert_eq!(config.calibration.shift, 0.01);
        assert_eq!(config.calibration.scale, 50.0);
        assert_eq!(config.window_size, 60);

        let err = FusionConfig::from_json_str(r#"{"calibration": {"scale": 0.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { name: "calibration.scale", .. }));
    }

    #[test]
    fn test_all_models_missing_is_degraded_not_error() {
        let registry = ModelRegistry::new(StaticModels::new());
        let scorer = FusionScorer::with_defaults(&registry);
        let response = scorer.score(&request(60)).unwrap();

        assert!(response.degraded);
        assert_eq!(response.sequence_prob, 0.5);
        assert_eq!(response.tabular_prob, 0.5);
        assert_eq!(response.anomaly_score, 0.01);
        assert_eq!(response.ae_scaled, 0.5);
        assert!(close(response.fused_risk, 0.5));
        assert_eq!(response.risk_level, RiskLevel::Medium);

        let error = response.error.unwrap();
        for name in ["sequence", "tabular", "reconstructor"] {
            assert!(error.contains(name), "{} missing from {}", name, error);
        }
    }

    #[test]
    fn test_healthy_models() {
        let seq = |w: &[Frame]| Ok::<_, PredictorError>(w[0][0]);
        let tab = |f: &[f64; FEATURE_COUNT]| Ok::<_, PredictorError>(f[0]);
        let registry = ModelRegistry::new(
            StaticModels::new()
                .with_sequence(seq)
                .with_tabular(tab)
                .with_reconstructor(Identity),
        );
        let scorer = FusionScorer::with_defaults(&registry);

        // 10 rows padded to 60: the first row is zero padding
        let response = scorer.score(&request(10)).unwrap();
        assert!(!response.degraded);
        assert_eq!(response.error, None);
        assert_eq!(response.sequence_prob, 0.0);
        assert_eq!(response.tabular_prob, 0.25);
        assert_eq!(response.anomaly_score, 0.0);
        assert!(close(response.health_score, 0.75));
        assert_eq!(response.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_out_of_contract_outputs_degrade() {
        struct Overconfident;
        impl SequencePredictor for Overconfident {
            fn predict(&self, _window: &[Frame]) -> Result<f64, PredictorError> {
                Ok(1.5)
            }
        }
        let tab = |_: &[f64; FEATURE_COUNT]| Ok::<_, PredictorError>(f64::NAN);
        let registry = ModelRegistry::new(
            StaticModels::new()
                .with_sequence(Overconfident)
                .with_tabular(tab)
                .with_reconstructor(Truncating),
        );
        let response = FusionScorer::with_defaults(&registry).score(&request(60)).unwrap();

        assert!(response.degraded);
        assert_eq!(response.sequence_prob, 0.5);
        assert_eq!(response.tabular_prob, 0.5);
        assert_eq!(response.ae_scaled, 0.5);
        assert!(response.error.unwrap().contains("59 rows"));
    }

    #[test]
    fn test_malformed_input_propagates() {
        let registry = ModelRegistry::new(StaticModels::new());
        let scorer = FusionScorer::with_defaults(&registry);

        let mut bad = request(5);
        bad.window[2] = vec![1.0; 5];
        assert!(matches!(scorer.score(&bad), Err(FusionError::Shape(_))));

        let mut bad = request(5);
        bad.agg.insert("rpm_max".to_string(), f64::INFINITY);
        assert!(matches!(scorer.score(&bad), Err(FusionError::NonFiniteFeature { .. })));
    }

    #[test]
    fn test_request_and_response_wire_format() {
        let request = FusionRequest::from_json_str(
            r#"{"window": [[1, 2, 3, 4]], "agg": {"rpm_mean": 1500.0, "extra": 1}}"#,
        )
        .unwrap();
        let features = feature_vector(&request.agg).unwrap();
        assert_eq!(features[10], 1500.0);
        assert_eq!(features.iter().filter(|v| **v != 0.0).count(), 1);

        assert!(FusionRequest::from_json_str(r#"{"window": [], "agg": {}, "x": 1}"#).is_err());

        let registry = ModelRegistry::new(StaticModels::new());
        let response = FusionScorer::with_defaults(&registry).score(&request).unwrap();
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["risk_level"], "MEDIUM");
        assert_eq!(json["degraded"], true);
    }
}
