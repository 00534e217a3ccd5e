//! Batch preparation of training datasets
//!
//! ## Flow
//!
//! ```text
//! readings ─► group by device ─► per device: Resampler ─┬─► Windower ─┐
//!                                                      └─► Aggregator ┤
//!                                                                    ▼
//!                 fit Normalizer once on all resampled bins ─► transform
//! ```
//!
//! Devices are processed in sorted id order so repeated runs over the same
//! input produce identical artifacts. The cancellation token is checked
//! between devices only; a device that has started always finishes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::aggregate::{AggregateFeatureRow, Aggregator};
use crate::config::PipelineConfig;
use crate::constants::channels::CHANNEL_COUNT;
use crate::errors::{PipelineError, PipelineResult};
use crate::normalize::{NormalizationState, Normalizer};
use crate::reading::{ChannelRow, Frame, Label, Reading};
use crate::resample::Resampler;
use crate::window::Windower;

/// Cooperative stop signal for long batch jobs
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Fresh token, not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop at the next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether a stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// N windows of T × F normalized values with a parallel label array
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowArtifact {
    /// Rows per window (T)
    pub window_size: usize,
    /// Window values, each exactly `window_size` frames
    pub windows: Vec<Vec<Frame>>,
    /// One label per window
    pub labels: Vec<Label>,
}

impl WindowArtifact {
    /// Empty artifact for windows of `window_size` rows
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            windows: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Number of windows (N)
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// True when no window was kept
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Channels per row (F)
    pub fn channel_count(&self) -> usize {
        CHANNEL_COUNT
    }

    /// Append one window
    pub fn push(&mut self, window: Vec<Frame>, label: Label) {
        self.windows.push(window);
        self.labels.push(label);
    }
}

/// Counters describing one preparation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreparationReport {
    /// Devices processed
    pub devices: usize,
    /// Resampled bins across all devices
    pub bins: usize,
    /// Windows passing the completeness gate
    pub kept_windows: usize,
    /// Windows dropped by the completeness gate
    pub discarded_windows: usize,
}

/// Output of `prepare_dataset`
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedDataset {
    /// Normalized windows and labels
    pub windows: WindowArtifact,
    /// Normalized aggregate rows, device order then time order
    pub aggregates: Vec<AggregateFeatureRow>,
    /// Frozen parameters fit during this run
    pub state: NormalizationState,
    /// Counters
    pub report: PreparationReport,
}

/// Resample, window, aggregate and normalize readings from many devices
pub fn prepare_dataset(
    readings: &[Reading],
    config: &PipelineConfig,
    cancel: &CancellationToken,
) -> PipelineResult<PreparedDataset> {
    config.validate()?;

    let mut by_device: BTreeMap<&str, Vec<Reading>> = BTreeMap::new();
    for reading in readings {
        by_device
            .entry(reading.device_id.as_str())
            .or_default()
            .push(reading.clone());
    }
    if by_device.is_empty() {
        return Err(PipelineError::NoReadings);
    }

    info!(
        "preparing {} readings from {} devices",
        readings.len(),
        by_device.len()
    );

    let resampler = Resampler::new(config);
    let windower = Windower::new(config);
    let aggregator = Aggregator::new(config.window_size);

    let mut report = PreparationReport::default();
    let mut fit_rows: Vec<ChannelRow> = Vec::new();
    let mut raw_windows = Vec::new();
    let mut raw_aggregates = Vec::new();

    for (device_id, device_readings) in &by_device {
        if cancel.is_cancelled() {
            info!("preparation cancelled after {} devices", report.devices);
            return Err(PipelineError::Cancelled);
        }

        let series = resampler.resample(device_readings)?;
        let set = windower.extract(&series);
        let aggregates = aggregator.aggregate(&series);

        debug!(
            "device {}: {} bins, {} windows kept, {} discarded",
            device_id,
            series.len(),
            set.windows.len(),
            set.discarded
        );

        report.devices += 1;
        report.bins += series.len();
        report.kept_windows += set.windows.len();
        report.discarded_windows += set.discarded;

        fit_rows.extend(series.rows().copied());
        raw_windows.extend(set.windows);
        raw_aggregates.extend(aggregates);
    }

    let mut normalizer = Normalizer::new();
    let state = normalizer.fit(&fit_rows)?.clone();

    let mut windows = WindowArtifact::new(config.window_size);
    for window in &raw_windows {
        windows.push(normalizer.transform_window(window)?, window.label);
    }

    let aggregates = raw_aggregates
        .iter()
        .map(|row| normalizer.transform_aggregate(row))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        "prepared {} windows ({} discarded) and {} aggregate rows from {} devices",
        report.kept_windows,
        report.discarded_windows,
        aggregates.len(),
        report.devices
    );

    Ok(PreparedDataset {
        windows,
        aggregates,
        state,
        report,
    })
}
