//! Fixed-Interval Resampling of Irregular Telemetry
//!
//! ## Overview
//!
//! Devices report every 30-60 seconds with jitter, duplicate timestamps and
//! dropped channels. Models need a regular grid. The Resampler turns one
//! device's readings into consecutive, epoch-aligned bins:
//!
//! ```text
//! readings:  •   •  •     •   •       •  •        (irregular, unordered)
//!            |-----|-----|-----|-----|-----|-----|
//! bins:        b0    b1    b2    b3    b4    b5   (fixed width, none dropped)
//! ```
//!
//! ## Contract
//!
//! 1. Readings are sorted by timestamp before binning
//! 2. Each channel in a bin is the arithmetic mean of the values present
//! 3. A bin's label is the maximum raw label seen in it (Normal if none)
//! 4. Every bin between the first and last reading exists, even if empty,
//!    up to `max_bins`; a longer span is rejected before anything is allocated
//! 5. Runs of missing cells are linearly interpolated, but only within
//!    `interpolation_limit` bins of a known value on either side. Cells
//!    further away stay missing; they are never guessed
//!
//! Missing cells are `None`, never zero.

use log::debug;

use crate::config::PipelineConfig;
use crate::constants::channels::CHANNEL_COUNT;
use crate::errors::{PipelineError, PipelineResult};
use crate::reading::{ChannelRow, Label, Reading};
use crate::time::{bin_start, Timestamp};

/// One fixed-width interval of the grid
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    /// Inclusive start of the interval
    pub start: Timestamp,
    /// Mean value per channel, possibly missing
    pub values: ChannelRow,
    /// Maximum raw label observed in the interval
    pub label: Label,
}

impl Bin {
    /// Number of non-missing channel values
    pub fn observed(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }
}

/// A device's readings on a fixed-interval grid, strictly increasing in time
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledSeries {
    /// Device identifier
    pub device_id: String,
    /// Device family
    pub device_type: String,
    /// Width of each bin in milliseconds
    pub bin_width_ms: i64,
    /// Consecutive bins
    pub bins: Vec<Bin>,
}

impl ResampledSeries {
    /// Number of bins
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// True when there are no bins
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Channel rows in chronological order
    pub fn rows(&self) -> impl Iterator<Item = &ChannelRow> + '_ {
        self.bins.iter().map(|b| &b.values)
    }

    /// Labels in chronological order
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.bins.iter().map(|b| b.label)
    }
}

/// Converts one device's readings into a `ResampledSeries`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resampler {
    bin_width_ms: i64,
    interpolation_limit: usize,
    max_bins: usize,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl Resampler {
    /// Resampler using the config's bin width and interpolation limit
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            bin_width_ms: config.bin_width_ms.max(1),
            interpolation_limit: config.interpolation_limit,
            max_bins: config.max_bins,
        }
    }

    /// Bin, then fill bounded gaps.
    ///
    /// All readings must belong to the same device.
    pub fn resample(&self, readings: &[Reading]) -> PipelineResult<ResampledSeries> {
        let mut series = self.bin(readings)?;
        interpolate(&mut series, self.interpolation_limit);
        Ok(series)
    }

    /// Mean-aggregate readings into bins without gap filling
    pub fn bin(&self, readings: &[Reading]) -> PipelineResult<ResampledSeries> {
        let first = readings.first().ok_or(PipelineError::NoReadings)?;
        if let Some(stranger) = readings.iter().find(|r| r.device_id != first.device_id) {
            return Err(PipelineError::MixedDevices {
                expected: first.device_id.clone(),
                found: stranger.device_id.clone(),
            });
        }

        let mut sorted: Vec<&Reading> = readings.iter().collect();
        sorted.sort_by_key(|r| r.timestamp);

        let width = self.bin_width_ms;
        // Non-empty: checked above
        let origin = bin_start(sorted[0].timestamp, width);
        let end = bin_start(sorted[sorted.len() - 1].timestamp, width);
        let span = (end as i128 - origin as i128) / width as i128 + 1;
        let bin_count = usize::try_from(span)
            .ok()
            .filter(|&n| n <= self.max_bins)
            .ok_or_else(|| PipelineError::SeriesTooLong {
                device_id: first.device_id.clone(),
                bins: span as u128,
                max_bins: self.max_bins,
            })?;

        let mut sums = vec![[0.0_f64; CHANNEL_COUNT]; bin_count];
        let mut counts = vec![[0_usize; CHANNEL_COUNT]; bin_count];
        let mut labels = vec![Label::Normal; bin_count];

        for reading in &sorted {
            let idx = ((bin_start(reading.timestamp, width) - origin) / width) as usize;
            for (c, value) in reading.values.iter().enumerate() {
                if let Some(v) = value {
                    sums[idx][c] += v;
                    counts[idx][c] += 1;
                }
            }
            if let Some(label) = reading.label {
                labels[idx] = labels[idx].max(label);
            }
        }

        let bins: Vec<Bin> = (0..bin_count)
            .map(|idx| {
                let mut values: ChannelRow = [None; CHANNEL_COUNT];
                for c in 0..CHANNEL_COUNT {
                    if counts[idx][c] > 0 {
                        values[c] = Some(sums[idx][c] / counts[idx][c] as f64);
                    }
                }
                Bin {
                    start: origin + idx as i64 * width,
                    values,
                    label: labels[idx],
                }
            })
            .collect();

        debug!(
            "device {}: {} readings -> {} bins of {} ms",
            first.device_id,
            readings.len(),
            bins.len(),
            width
        );

        Ok(ResampledSeries {
            device_id: first.device_id.clone(),
            device_type: first.device_type.clone(),
            bin_width_ms: width,
            bins,
        })
    }
}

/// Fill bounded gaps in every channel of the series
pub fn interpolate(series: &mut ResampledSeries, limit: usize) {
    for c in 0..CHANNEL_COUNT {
        let mut column: Vec<Option<f64>> = series.bins.iter().map(|b| b.values[c]).collect();
        fill_gaps(&mut column, limit);
        for (bin, value) in series.bins.iter_mut().zip(column) {
            bin.values[c] = value;
        }
    }
}

/// Linear interpolation limited to `limit` cells from a known value, in
/// both directions.
///
/// Interior gaps: a missing cell is filled when it lies within `limit` of the
/// known value on its left or on its right, using the straight line between
/// the two. Leading and trailing gaps take the nearest known value, again only
/// within `limit`. A column with no known value is left untouched.
pub fn fill_gaps(column: &mut [Option<f64>], limit: usize) {
    if limit == 0 {
        return;
    }

    let known: Vec<(usize, f64)> = column
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let (Some(&(first, first_value)), Some(&(last, last_value))) = (known.first(), known.last())
    else {
        return;
    };

    for cell in &mut column[first.saturating_sub(limit)..first] {
        *cell = Some(first_value);
    }

    let trailing_end = (last + limit + 1).min(column.len());
    for cell in &mut column[last + 1..trailing_end] {
        *cell = Some(last_value);
    }

    for pair in known.windows(2) {
        let (left, left_value) = pair[0];
        let (right, right_value) = pair[1];
        let span = right - left;
        if span <= 1 {
            continue;
        }
        for i in left + 1..right {
            if i - left <= limit || right - i <= limit {
                let t = (i - left) as f64 / span as f64;
                column[i] = Some(left_value + (right_value - left_value) * t);
            }
        }
    }
}
