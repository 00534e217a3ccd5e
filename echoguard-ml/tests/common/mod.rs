//! Shared fixtures for fusion integration tests
//!
//! - Seeded one-reading-per-minute device telemetry, optionally degrading
//! - Deterministic stand-ins for the three external models

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use echoguard_core::constants::channels::FEATURE_COUNT;
use echoguard_core::{AggregateFeatureRow, Frame, Label, Reading};
use echoguard_ml::{
    LoadResult, ModelKind, ModelLoader, ModelUnavailableError, PredictorError, Reconstructor,
    SequencePredictor, TabularPredictor,
};

/// 2024-03-01T12:00:00Z
pub const START: i64 = 1_709_294_400_000;

const MINUTE: i64 = 60_000;

/// `minutes` readings for one device, one per minute bin.
///
/// With `degrade`, vibration and temperature ramp over the last 30 minutes
/// and those readings are labeled pre-failure.
pub fn device_readings(device_id: &str, minutes: i64, degrade: bool, seed: u64) -> Vec<Reading> {
    let mut rng = StdRng::seed_from_u64(seed);
    let ramp_start = minutes - 30;

    (0..minutes)
        .map(|m| {
            let ramp = if degrade && m >= ramp_start {
                (m - ramp_start) as f64 / 30.0
            } else {
                0.0
            };
            let humidity = if rng.gen_bool(0.05) {
                None
            } else {
                Some(45.0 + rng.gen_range(-1.0..1.0))
            };
            Reading {
                device_id: device_id.to_string(),
                device_type: "pump".to_string(),
                timestamp: START + m * MINUTE + 30_000 + rng.gen_range(-5_000..5_000),
                values: [
                    Some(60.0 + 15.0 * ramp + rng.gen_range(-0.5..0.5)),
                    Some(0.3 + 1.2 * ramp + rng.gen_range(-0.02..0.02)),
                    Some(1500.0 - 80.0 * ramp + rng.gen_range(-10.0..10.0)),
                    humidity,
                ],
                label: Some(if ramp > 0.0 { Label::PreFailure } else { Label::Normal }),
            }
        })
        .collect()
}

/// Aggregate row as a request mapping
pub fn agg_map(row: &AggregateFeatureRow) -> HashMap<String, f64> {
    row.named_features().map(|(name, v)| (name.to_string(), v)).collect()
}

/// Frames as request rows
pub fn window_rows(frames: &[Frame]) -> Vec<Vec<f64>> {
    frames.iter().map(|f| f.to_vec()).collect()
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Logistic of the mean scaled vibration over the last ten rows
pub struct VibrationTrend;

impl SequencePredictor for VibrationTrend {
    fn predict(&self, window: &[Frame]) -> Result<f64, PredictorError> {
        let tail = &window[window.len().saturating_sub(10)..];
        if tail.is_empty() {
            return Err(PredictorError::InvalidInput("empty window".into()));
        }
        let mean = tail.iter().map(|f| f[1]).sum::<f64>() / tail.len() as f64;
        Ok(logistic(mean))
    }
}

/// Logistic of the scaled vibration mean feature
pub struct VibrationMean;

impl TabularPredictor for VibrationMean {
    fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> Result<f64, PredictorError> {
        Ok(logistic(features[5]))
    }
}

/// Reconstruction that shrinks every value by a fixed factor
pub struct Shrink(pub f64);

impl Reconstructor for Shrink {
    fn reconstruct(&self, window: &[Frame]) -> Result<Vec<Frame>, PredictorError> {
        Ok(window.iter().map(|f| f.map(|v| v * self.0)).collect())
    }
}

/// Loader counting how often each model is built
pub struct CountingLoader {
    pub loads: Arc<AtomicUsize>,
    pub with_reconstructor: bool,
}

impl CountingLoader {
    pub fn new(with_reconstructor: bool) -> (Self, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        (
            Self {
                loads: loads.clone(),
                with_reconstructor,
            },
            loads,
        )
    }
}

impl ModelLoader for CountingLoader {
    fn load_sequence(&self) -> LoadResult<dyn SequencePredictor> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(10));
        Ok(Arc::new(VibrationTrend))
    }

    fn load_tabular(&self) -> LoadResult<dyn TabularPredictor> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(VibrationMean))
    }

    fn load_reconstructor(&self) -> LoadResult<dyn Reconstructor> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.with_reconstructor {
            Ok(Arc::new(Shrink(0.9)))
        } else {
            Err(ModelUnavailableError::new(ModelKind::Reconstructor, "weights missing"))
        }
    }
}
