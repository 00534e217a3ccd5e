//! Rolling per-channel statistics for the tabular model
//!
//! For every bin, the five statistics are computed over the trailing T-bin
//! window that ends at that bin (fewer bins at the start of the series).
//! A channel's statistics are missing when fewer than T/2 of those bins hold
//! a value. The output has exactly one row per bin, and each row carries the
//! bin's own label rather than a windowed one.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::constants::channels::{
    CHANNEL_COUNT, FEATURE_COUNT, FEATURE_NAMES, STATISTIC_COUNT, STATISTIC_NAMES,
};
use crate::constants::pipeline::MIN_PERIODS_DIVISOR;
use crate::reading::{Channel, Label};
use crate::resample::ResampledSeries;
use crate::time::Timestamp;

/// Rolling statistic, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Arithmetic mean
    Mean,
    /// Sample standard deviation (n - 1)
    Std,
    /// Minimum
    Min,
    /// Maximum
    Max,
    /// Median
    Median,
}

impl Statistic {
    /// All statistics in column order
    pub const ALL: [Statistic; STATISTIC_COUNT] = [
        Statistic::Mean,
        Statistic::Std,
        Statistic::Min,
        Statistic::Max,
        Statistic::Median,
    ];

    /// Position within a channel's statistic group
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column suffix
    pub fn name(self) -> &'static str {
        STATISTIC_NAMES[self.index()]
    }
}

/// Statistic values for one channel
pub type StatisticGroup = [Option<f64>; STATISTIC_COUNT];

/// Position of `{channel}_{statistic}` in the flat feature vector
pub fn feature_index(channel: Channel, statistic: Statistic) -> usize {
    channel.index() * STATISTIC_COUNT + statistic.index()
}

/// One bin's rolling statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateFeatureRow {
    /// Device identifier
    pub device_id: String,
    /// Device family
    pub device_type: String,
    /// Bin start
    pub timestamp: Timestamp,
    /// The bin's own label
    pub label: Label,
    /// `stats[channel][statistic]`
    pub stats: [StatisticGroup; CHANNEL_COUNT],
}

impl AggregateFeatureRow {
    /// One statistic of one channel
    pub fn stat(&self, channel: Channel, statistic: Statistic) -> Option<f64> {
        self.stats[channel.index()][statistic.index()]
    }

    /// Look up a column by its `{channel}_{statistic}` name
    pub fn get(&self, name: &str) -> Option<f64> {
        let idx = FEATURE_NAMES.iter().position(|n| *n == name)?;
        self.stats[idx / STATISTIC_COUNT][idx % STATISTIC_COUNT]
    }

    /// Flat vector in `FEATURE_NAMES` order
    pub fn feature_vector(&self) -> [Option<f64>; FEATURE_COUNT] {
        let mut out = [None; FEATURE_COUNT];
        for (c, group) in self.stats.iter().enumerate() {
            out[c * STATISTIC_COUNT..(c + 1) * STATISTIC_COUNT].copy_from_slice(group);
        }
        out
    }

    /// Name/value pairs, with missing statistics omitted
    pub fn named_features(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .zip(self.feature_vector())
            .filter_map(|(name, value)| value.map(|v| (*name, v)))
    }
}

/// Computes trailing-window statistics per bin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregator {
    window_size: usize,
    min_periods: usize,
}

impl Aggregator {
    /// Aggregator over a trailing window of `window_size` bins with
    /// `window_size / 2` minimum populated periods
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            min_periods: (window_size / MIN_PERIODS_DIVISOR).max(1),
        }
    }

    /// Minimum populated bins for a statistic to be reported
    pub fn min_periods(&self) -> usize {
        self.min_periods
    }

    /// One row per bin of `series`
    pub fn aggregate(&self, series: &ResampledSeries) -> Vec<AggregateFeatureRow> {
        let mut rows = Vec::with_capacity(series.len());
        let mut scratch = Vec::with_capacity(self.window_size);

        for (i, bin) in series.bins.iter().enumerate() {
            let from = (i + 1).saturating_sub(self.window_size);
            let trailing = &series.bins[from..=i];

            let mut stats = [[None; STATISTIC_COUNT]; CHANNEL_COUNT];
            for (c, group) in stats.iter_mut().enumerate() {
                scratch.clear();
                scratch.extend(trailing.iter().filter_map(|b| b.values[c]));
                if scratch.len() >= self.min_periods {
                    *group = summarize(&mut scratch);
                }
            }

            rows.push(AggregateFeatureRow {
                device_id: series.device_id.clone(),
                device_type: series.device_type.clone(),
                timestamp: bin.start,
                label: bin.label,
                stats,
            });
        }

        debug!(
            "device {}: {} aggregate rows (window {}, min periods {})",
            series.device_id,
            rows.len(),
            self.window_size,
            self.min_periods
        );
        rows
    }
}

/// Statistics of a non-empty sample; reorders `values`
fn summarize(values: &mut [f64]) -> StatisticGroup {
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some((ss / (n - 1) as f64).sqrt())
    } else {
        None
    };

    values.sort_by(f64::total_cmp);
    let median = if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    };

    [Some(mean), std, Some(values[0]), Some(values[n - 1]), Some(median)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::ChannelRow;
    use crate::resample::Bin;

    fn series(temps: &[Option<f64>]) -> ResampledSeries {
        let bins = temps
            .iter()
            .enumerate()
            .map(|(i, &t)| {
                let values: ChannelRow = [t, Some(1.0), None, Some(i as f64)];
                Bin {
                    start: i as i64 * 60_000,
                    values,
                    label: if i == 3 { Label::Failure } else { Label::Normal },
                }
            })
            .collect();
        ResampledSeries {
            device_id: "cmp_4".into(),
            device_type: "compressor".into(),
            bin_width_ms: 60_000,
            bins,
        }
    }

    #[test]
    fn test_one_row_per_bin_with_own_label() {
        let s = series(&[Some(1.0), None, Some(3.0), Some(4.0), None]);
        let rows = Aggregator::new(4).aggregate(&s);

        assert_eq!(rows.len(), 5);
        assert_eq!(rows[3].label, Label::Failure);
        assert_eq!(rows[4].label, Label::Normal);
        assert_eq!(rows[2].timestamp, 2 * 60_000);
        assert_eq!(rows[0].device_type, "compressor");
    }

    #[test]
    fn test_min_periods_is_half_the_window() {
        let config = crate::config::PipelineConfig::default();
        assert_eq!(Aggregator::new(config.window_size).min_periods(), 30);
        assert_eq!(Aggregator::new(4).min_periods(), 2);
        assert_eq!(Aggregator::new(3).min_periods(), 1);
        assert_eq!(Aggregator::new(1).min_periods(), 1);
    }

    #[test]
    fn test_min_periods_gate() {
        let s = series(&[Some(1.0), None, Some(3.0), Some(4.0), None]);
        let rows = Aggregator::new(4).aggregate(&s);

        // Two populated temperature bins are needed
        assert_eq!(rows[0].stat(Channel::Temperature, Statistic::Mean), None);
        assert_eq!(rows[1].stat(Channel::Temperature, Statistic::Mean), None);
        assert_eq!(rows[2].stat(Channel::Temperature, Statistic::Mean), Some(2.0));
        // rpm is never observed
        assert!(rows.iter().all(|r| r.stat(Channel::Rpm, Statistic::Max).is_none()));
    }

    #[test]
    fn test_trailing_window_statistics() {
        let s = series(&[Some(1.0), None, Some(3.0), Some(4.0), None]);
        let rows = Aggregator::new(4).aggregate(&s);

        // Row 4 covers bins 1..=4: temperatures 3, 4
        let row = &rows[4];
        assert_eq!(row.stat(Channel::Temperature, Statistic::Mean), Some(3.5));
        assert_eq!(row.stat(Channel::Temperature, Statistic::Min), Some(3.0));
        assert_eq!(row.stat(Channel::Temperature, Statistic::Max), Some(4.0));
        assert_eq!(row.stat(Channel::Temperature, Statistic::Median), Some(3.5));
        let std = row.stat(Channel::Temperature, Statistic::Std).unwrap();
        assert!((std - 0.5_f64.sqrt()).abs() < 1e-12);

        // Humidity holds the bin index: bins 1..=4
        assert_eq!(row.get("humidity_mean"), Some(2.5));
        assert_eq!(row.get("humidity_median"), Some(2.5));
        assert_eq!(row.get("vibration_std"), Some(0.0));
        assert_eq!(row.get("pressure_mean"), None);
    }

    #[test]
    fn test_feature_vector_order() {
        let s = series(&[Some(2.0), Some(2.0)]);
        let rows = Aggregator::new(2).aggregate(&s);
        let v = rows[1].feature_vector();

        assert_eq!(v[feature_index(Channel::Temperature, Statistic::Mean)], Some(2.0));
        assert_eq!(v[feature_index(Channel::Humidity, Statistic::Max)], Some(1.0));
        assert_eq!(rows[1].named_features().count(), 15);
    }

    #[test]
    fn test_single_value_has_no_std() {
        let s = series(&[Some(5.0)]);
        let rows = Aggregator::new(2).aggregate(&s);
        assert_eq!(rows[0].stat(Channel::Temperature, Statistic::Mean), Some(5.0));
        assert_eq!(rows[0].stat(Channel::Temperature, Statistic::Std), None);
    }
}
