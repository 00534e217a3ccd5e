//! Contracts for the external predictive models
//!
//! The three models are opaque numeric functions. Their training,
//! architecture and runtime are owned elsewhere; the fusion path only relies
//! on these signatures.
//!
//! | Predictor      | Input                     | Output                         |
//! |----------------|---------------------------|--------------------------------|
//! | Sequence       | T × F window              | failure probability in [0, 1]  |
//! | Tabular        | 20 features, fixed order  | failure probability in [0, 1]  |
//! | Reconstructor  | T × F window              | T × F reconstruction           |
//!
//! Handles are loaded once and then shared read-only across threads, hence
//! the `Send + Sync` bounds.

use thiserror::Error;

use echoguard_core::constants::channels::FEATURE_COUNT;
use echoguard_core::Frame;

/// A predictor call failed at runtime
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PredictorError {
    /// The model rejected its input
    #[error("predictor rejected input: {0}")]
    InvalidInput(String),

    /// The model failed while evaluating
    #[error("predictor failed: {0}")]
    Runtime(String),
}

/// Sequence classifier over a full window
pub trait SequencePredictor: Send + Sync {
    /// Failure probability for a T × F window
    fn predict(&self, window: &[Frame]) -> Result<f64, PredictorError>;
}

/// Tabular classifier over the aggregate feature vector
pub trait TabularPredictor: Send + Sync {
    /// Failure probability for features in `FEATURE_NAMES` order
    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, PredictorError>;
}

/// Autoencoder returning a reconstruction of its input
pub trait Reconstructor: Send + Sync {
    /// Reconstruction with the same shape as `window`
    fn reconstruct(&self, window: &[Frame]) -> Result<Vec<Frame>, PredictorError>;
}

impl<F> SequencePredictor for F
where
    F: Fn(&[Frame]) -> Result<f64, PredictorError> + Send + Sync,
{
    fn predict(&self, window: &[Frame]) -> Result<f64, PredictorError> {
        self(window)
    }
}

impl<F> TabularPredictor for F
where
    F: Fn(&[f64; FEATURE_COUNT]) -> Result<f64, PredictorError> + Send + Sync,
{
    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, PredictorError> {
        self(features)
    }
}

/// Mean squared error between a window and its reconstruction, over all
/// timesteps and channels. `None` when the shapes differ or the window is
/// empty.
pub fn reconstruction_error(window: &[Frame], reconstruction: &[Frame]) -> Option<f64> {
    if window.is_empty() || window.len() != reconstruction.len() {
        return None;
    }

    let mut sum = 0.0;
    let mut cells = 0usize;
    for (row, recon) in window.iter().zip(reconstruction) {
        for (a, b) in row.iter().zip(recon) {
            sum += (a - b) * (a - b);
            cells += 1;
        }
    }
    Some(sum / cells as f64)
}
