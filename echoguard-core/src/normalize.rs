//! Frozen Imputation and Robust Scaling
//!
//! ## Phases
//!
//! ```text
//! fit:        rows ──► per-channel median ──► impute ──► median / IQR ──► NormalizationState
//! transform:  row  ──► replace None with median ──► (x - center) / scale
//! ```
//!
//! Fitting happens once per training cycle and produces an immutable
//! `NormalizationState`. Refitting is an explicit call that replaces the
//! state; transform never fits on its own and fails with `NotFittedError`
//! when no state is loaded.
//!
//! ## Parameters
//!
//! - Imputation value: median of the observed values of each channel
//! - Center: median of the imputed column
//! - Scale: interquartile range (q75 - q25, linear interpolation between
//!   order statistics) of the imputed column. A zero range is replaced by 1
//!   so constant channels pass through centered
//!
//! ## Payload Shapes
//!
//! Windows are transformed row by row and keep their T × F shape. Aggregate
//! rows are transformed one statistic at a time: the mean of every channel
//! forms one F-row, the std of every channel another, and so on. Identity
//! and label fields are never touched.

use log::info;
use serde::{Deserialize, Serialize};

use crate::aggregate::AggregateFeatureRow;
use crate::constants::channels::{CHANNEL_COUNT, STATISTIC_COUNT};
use crate::errors::{NormalizerError, NotFittedError};
use crate::reading::{Channel, ChannelRow, Frame};
use crate::window::Window;

/// Format version written into every parameter blob
pub const NORMALIZATION_VERSION: u32 = 1;

/// Per-channel imputation values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputerParams {
    /// Blob format version
    pub version: u32,
    /// Median of observed values, in channel order
    pub medians: [f64; CHANNEL_COUNT],
}

/// Per-channel robust scaling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Blob format version
    pub version: u32,
    /// Median of the imputed column
    pub center: [f64; CHANNEL_COUNT],
    /// Interquartile range of the imputed column, never zero
    pub scale: [f64; CHANNEL_COUNT],
}

/// Frozen parameters for the transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationState {
    /// Missing-value replacement
    pub imputer: ImputerParams,
    /// Centering and scaling
    pub scaler: ScalerParams,
}

impl NormalizationState {
    /// Impute then scale one row
    pub fn apply(&self, row: &ChannelRow) -> Frame {
        let mut out = [0.0; CHANNEL_COUNT];
        for c in 0..CHANNEL_COUNT {
            let value = row[c].unwrap_or(self.imputer.medians[c]);
            out[c] = (value - self.scaler.center[c]) / self.scaler.scale[c];
        }
        out
    }

    /// Fit parameters on a concatenation of per-bin rows
    pub fn fit(rows: &[ChannelRow]) -> Result<Self, NormalizerError> {
        if rows.is_empty() {
            return Err(NormalizerError::EmptyInput);
        }

        let mut medians = [0.0; CHANNEL_COUNT];
        let mut center = [0.0; CHANNEL_COUNT];
        let mut scale = [1.0; CHANNEL_COUNT];
        let mut column = Vec::with_capacity(rows.len());

        for channel in Channel::ALL {
            let c = channel.index();

            column.clear();
            column.extend(rows.iter().filter_map(|r| r[c]));
            if column.is_empty() {
                return Err(NormalizerError::NoObservations {
                    channel: channel.name(),
                });
            }
            column.sort_by(f64::total_cmp);
            medians[c] = quantile(&column, 0.5);

            column.clear();
            column.extend(rows.iter().map(|r| r[c].unwrap_or(medians[c])));
            column.sort_by(f64::total_cmp);
            center[c] = quantile(&column, 0.5);
            let iqr = quantile(&column, 0.75) - quantile(&column, 0.25);
            if iqr > 0.0 {
                scale[c] = iqr;
            }
        }

        Ok(Self {
            imputer: ImputerParams {
                version: NORMALIZATION_VERSION,
                medians,
            },
            scaler: ScalerParams {
                version: NORMALIZATION_VERSION,
                center,
                scale,
            },
        })
    }
}

/// Linear-interpolated quantile of sorted, non-empty data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Holds an optional frozen state and applies it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalizer {
    state: Option<NormalizationState>,
}

impl Normalizer {
    /// Unfitted normalizer; every transform fails until fit or load
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizer over a previously fit state
    pub fn from_state(state: NormalizationState) -> Self {
        Self { state: Some(state) }
    }

    /// Fit on `rows`, replacing any existing state
    pub fn fit(&mut self, rows: &[ChannelRow]) -> Result<&NormalizationState, NormalizerError> {
        let state = NormalizationState::fit(rows)?;
        info!(
            "normalizer fit on {} rows: medians {:?}, scale {:?}",
            rows.len(),
            state.imputer.medians,
            state.scaler.scale
        );
        Ok(self.state.insert(state))
    }

    /// Frozen state, if fit or loaded
    pub fn state(&self) -> Option<&NormalizationState> {
        self.state.as_ref()
    }

    /// True once a state is present
    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn require(&self) -> Result<&NormalizationState, NotFittedError> {
        self.state.as_ref().ok_or(NotFittedError)
    }

    /// Transform one row
    pub fn transform_row(&self, row: &ChannelRow) -> Result<Frame, NotFittedError> {
        Ok(self.require()?.apply(row))
    }

    /// Transform a block of rows, preserving order
    pub fn transform_rows(&self, rows: &[ChannelRow]) -> Result<Vec<Frame>, NotFittedError> {
        let state = self.require()?;
        Ok(rows.iter().map(|r| state.apply(r)).collect())
    }

    /// Transform a window's T × F block
    pub fn transform_window(&self, window: &Window) -> Result<Vec<Frame>, NotFittedError> {
        self.transform_rows(&window.rows)
    }

    /// Transform the statistic columns of an aggregate row
    pub fn transform_aggregate(
        &self,
        row: &AggregateFeatureRow,
    ) -> Result<AggregateFeatureRow, NotFittedError> {
        let state = self.require()?;
        let mut out = row.clone();
        for s in 0..STATISTIC_COUNT {
            let group: ChannelRow = std::array::from_fn(|c| row.stats[c][s]);
            let scaled = state.apply(&group);
            for c in 0..CHANNEL_COUNT {
                out.stats[c][s] = Some(scaled[c]);
            }
        }
        Ok(out)
    }
}
