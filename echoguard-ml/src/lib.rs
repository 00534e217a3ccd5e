//! Multi-Model Failure-Risk Fusion for EchoGuard
//!
//! ## Overview
//!
//! This crate combines three externally trained models into one calibrated
//! failure risk per device window. The models themselves are opaque: this
//! crate only fixes their call contracts, how they are loaded, and the
//! arithmetic that fuses their outputs.
//!
//! ## Components
//!
//! - `predictor`: the three model contracts and the reconstruction error
//! - `registry`: explicit model registry with guarded, once-only loading
//! - `shape`: window length adaptation (left-pad or keep last T rows)
//! - `fusion`: calibration, the fusion law, risk levels and the scorer
//!
//! ## Usage
//!
//! ```rust
//! use echoguard_ml::{FusionRequest, FusionScorer, ModelRegistry, StaticModels};
//!
//! // Build once per process, share by reference
//! let registry = ModelRegistry::new(StaticModels::new());
//! let scorer = FusionScorer::with_defaults(&registry);
//!
//! let request = FusionRequest::from_json_str(
//!     r#"{"window": [[0.1, 0.2, 0.3, 0.4]], "agg": {"rpm_mean": 0.5}}"#,
//! ).unwrap();
//!
//! // No models provided: the response is complete but degraded
//! let response = scorer.score(&request).unwrap();
//! assert!(response.degraded);
//! ```
//!
//! ## Failure Policy
//!
//! Malformed input (wrong channel count, empty window, non-finite values)
//! is returned as `FusionError`. Model failures never are: the scorer
//! substitutes neutral defaults and marks the response degraded.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod fusion;
pub mod predictor;
pub mod registry;
pub mod shape;

pub use errors::{FusionError, FusionResult};
pub use fusion::{
    feature_vector, fuse, weighted_risk, AnomalyCalibration, FusedRisk, FusionConfig,
    FusionRequest, FusionResponse, FusionScorer, ModelScoreTriple, RiskLevel,
};
pub use predictor::{
    reconstruction_error, PredictorError, Reconstructor, SequencePredictor, TabularPredictor,
};
pub use registry::{
    LoadResult, ModelKind, ModelLoader, ModelRegistry, ModelStatus, ModelUnavailableError,
    StaticModels,
};
pub use shape::{adapt_window, fit_length};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
