//! Preparation configuration
//!
//! Every field has a default matching the constants module, so a partial
//! JSON document only needs to name what it overrides:
//!
//! ```rust
//! use echoguard_core::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{ "min_valid_ratio": 0.5 }"#).unwrap();
//! assert_eq!(config.window_size, 60);
//! assert_eq!(config.min_valid_ratio, 0.5);
//! ```
//!
//! Where the document comes from (environment, file, service) is the
//! caller's concern.

use serde::{Deserialize, Serialize};

use crate::constants::pipeline::{
    INTERPOLATION_LIMIT, MAX_SERIES_BINS, MIN_VALID_RATIO, WINDOW_SIZE,
};
use crate::constants::time::DEFAULT_BIN_WIDTH_MS;
use crate::errors::ConfigError;

/// Parameters for Resampler, Windower/Labeler and Aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resampling bin width in milliseconds
    pub bin_width_ms: i64,
    /// Longest run of missing bins filled from each side
    pub interpolation_limit: usize,
    /// Window length in bins (T)
    pub window_size: usize,
    /// Completeness gate for windows
    pub min_valid_ratio: f64,
    /// Upper bound on bins per device series
    pub max_bins: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bin_width_ms: DEFAULT_BIN_WIDTH_MS,
            interpolation_limit: INTERPOLATION_LIMIT,
            window_size: WINDOW_SIZE,
            min_valid_ratio: MIN_VALID_RATIO,
            max_bins: MAX_SERIES_BINS,
        }
    }
}

impl PipelineConfig {
    /// Decode from JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Builder-style override of the completeness gate
    pub fn with_min_valid_ratio(mut self, ratio: f64) -> Self {
        self.min_valid_ratio = ratio;
        self
    }

    /// Builder-style override of the window length
    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size;
        self
    }

    /// Builder-style override of the series length bound
    pub fn with_max_bins(mut self, max_bins: usize) -> Self {
        self.max_bins = max_bins;
        self
    }

    /// Check every parameter against its domain
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bin_width_ms <= 0 {
            return Err(ConfigError::OutOfRange {
                name: "bin_width_ms",
                value: self.bin_width_ms as f64,
                expected: "> 0",
            });
        }
        if self.window_size < 2 {
            return Err(ConfigError::OutOfRange {
                name: "window_size",
                value: self.window_size as f64,
                expected: ">= 2",
            });
        }
        if self.max_bins < self.window_size {
            return Err(ConfigError::OutOfRange {
                name: "max_bins",
                value: self.max_bins as f64,
                expected: ">= window_size",
            });
        }
        if !(0.0..=1.0).contains(&self.min_valid_ratio) {
            return Err(ConfigError::OutOfRange {
                name: "min_valid_ratio",
                value: self.min_valid_ratio,
                expected: "within [0, 1]",
            });
        }
        Ok(())
    }
}
