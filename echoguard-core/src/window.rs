//! Sliding Windows with Severity Labels and Completeness Gating
//!
//! ## Overview
//!
//! The sequence model and the autoencoder consume T consecutive bins at a
//! time. The Windower slides a T-bin window over a resampled series with
//! stride 1:
//!
//! ```text
//! bins:    b0 b1 b2 b3 b4 b5 b6 ... b(n-1)
//! start 0: [b0 ........ b(T-1)]
//! start 1:    [b1 ........ bT]
//! ...
//! last:                 [b(n-T) ... b(n-1)]
//! ```
//!
//! For each candidate:
//! - `label` is the maximum bin label in range, so a window touching a
//!   failure bin is a failure window
//! - `validity_ratio` is the fraction of non-missing cells out of T × F
//!
//! A candidate is kept iff `validity_ratio >= min_valid_ratio`. Dropped
//! candidates are counted in `WindowSet::discarded`; dropping is a normal
//! filtering outcome, not an error. A series shorter than T yields no windows.

use log::debug;

use crate::config::PipelineConfig;
use crate::constants::channels::CHANNEL_COUNT;
use crate::reading::{ChannelRow, Label};
use crate::resample::ResampledSeries;
use crate::time::Timestamp;

/// T consecutive bins × F channels with one severity label
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Start of the first bin
    pub start: Timestamp,
    /// Channel rows in chronological order, length T
    pub rows: Vec<ChannelRow>,
    /// Maximum bin label in range
    pub label: Label,
    /// Non-missing cells / (T × F)
    pub validity_ratio: f64,
}

/// Windows kept from one series plus the number dropped by the gate
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSet {
    /// Device the windows were cut from
    pub device_id: String,
    /// Kept windows in start order
    pub windows: Vec<Window>,
    /// Candidates below the completeness gate
    pub discarded: usize,
}

impl WindowSet {
    /// Number of candidate windows (kept + discarded)
    pub fn candidates(&self) -> usize {
        self.windows.len() + self.discarded
    }
}

/// Slides, labels and gates windows
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Windower {
    window_size: usize,
    min_valid_ratio: f64,
}

impl Default for Windower {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Windower {
    /// Windower using the config's T and gate
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_params(config.window_size, config.min_valid_ratio)
    }

    /// Windower with explicit T and gate
    pub fn with_params(window_size: usize, min_valid_ratio: f64) -> Self {
        Self {
            window_size: window_size.max(1),
            min_valid_ratio,
        }
    }

    /// Window length T
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Cut every window from `series`
    pub fn extract(&self, series: &ResampledSeries) -> WindowSet {
        let t = self.window_size;
        let n = series.len();
        let mut set = WindowSet {
            device_id: series.device_id.clone(),
            windows: Vec::new(),
            discarded: 0,
        };

        if n < t {
            debug!("device {}: {} bins < window size {}, no windows", series.device_id, n, t);
            return set;
        }

        // observed[i] = non-missing cells in bins[..i]
        let mut observed = Vec::with_capacity(n + 1);
        observed.push(0usize);
        for bin in &series.bins {
            let prev = observed[observed.len() - 1];
            observed.push(prev + bin.observed());
        }

        let cells = (t * CHANNEL_COUNT) as f64;
        for start in 0..=n - t {
            let range = &series.bins[start..start + t];
            let validity_ratio = (observed[start + t] - observed[start]) as f64 / cells;

            if validity_ratio < self.min_valid_ratio {
                set.discarded += 1;
                continue;
            }

            let label = range.iter().map(|b| b.label).max().unwrap_or_default();
            set.windows.push(Window {
                start: range[0].start,
                rows: range.iter().map(|b| b.values).collect(),
                label,
                validity_ratio,
            });
        }

        debug!(
            "device {}: kept {} windows, discarded {}",
            series.device_id,
            set.windows.len(),
            set.discarded
        );
        set
    }
}

/// Fraction of non-missing cells in a block of rows
pub fn validity_ratio(rows: &[ChannelRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let observed: usize = rows
        .iter()
        .map(|row| row.iter().filter(|v| v.is_some()).count())
        .sum();
    observed as f64 / (rows.len() * CHANNEL_COUNT) as f64
}
