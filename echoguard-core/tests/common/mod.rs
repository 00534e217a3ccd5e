//! Common test utilities and data generators for integration tests
//!
//! This module provides:
//! - Seeded synthetic device telemetry with an injected failure
//! - Assertion helpers for windows and aggregate rows

#![allow(dead_code)]

pub mod generators;

use echoguard_core::{AggregateFeatureRow, Label, ResampledSeries, Window};

/// 2024-03-01T12:00:00Z
pub const START: i64 = 1_709_294_400_000;

/// Assert every window's label is the maximum bin label over its range
pub fn assert_max_labels(series: &ResampledSeries, windows: &[Window]) {
    for window in windows {
        let first = series
            .bins
            .iter()
            .position(|b| b.start == window.start)
            .expect("window start must be a bin start");
        let expected = series.bins[first..first + window.rows.len()]
            .iter()
            .map(|b| b.label)
            .max()
            .unwrap_or(Label::Normal);
        assert_eq!(window.label, expected, "window at {}", window.start);
    }
}

/// Assert aggregate rows line up one-to-one with bins
pub fn assert_one_row_per_bin(series: &ResampledSeries, rows: &[AggregateFeatureRow]) {
    assert_eq!(rows.len(), series.len());
    for (row, bin) in rows.iter().zip(&series.bins) {
        assert_eq!(row.timestamp, bin.start);
        assert_eq!(row.label, bin.label);
        assert_eq!(row.device_id, series.device_id);
    }
}
