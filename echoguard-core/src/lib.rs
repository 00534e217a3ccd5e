//! Telemetry preparation engine for EchoGuard
//!
//! Turns irregular multi-sensor device readings into the fixed-shape inputs
//! consumed by the sequence, tabular and reconstruction models.
//!
//! Pipeline stages, leaves first:
//! - `resample`: fixed-interval grid with bounded interpolation
//! - `window`: stride-1 windows, max-severity labels, completeness gate
//! - `aggregate`: trailing rolling statistics, one row per bin
//! - `normalize`: frozen median imputation and robust scaling
//! - `prepare`: batch job over many devices
//!
//! Every stage is a pure function of its input (plus the frozen
//! `NormalizationState`), so devices can be processed on separate threads
//! without locking.
//!
//! ```no_run
//! use echoguard_core::{parse_batch, prepare_dataset, CancellationToken, PipelineConfig, SystemTime};
//!
//! let json = std::fs::read_to_string("readings.json").unwrap();
//! let readings = parse_batch(&json, &SystemTime).unwrap();
//!
//! let dataset = prepare_dataset(&readings, &PipelineConfig::default(), &CancellationToken::new()).unwrap();
//! println!("{} windows, {} discarded", dataset.report.kept_windows, dataset.report.discarded_windows);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregate;
pub mod config;
pub mod constants;
pub mod errors;
pub mod normalize;
pub mod prepare;
pub mod reading;
pub mod resample;
pub mod time;
pub mod window;

// Public API
pub use aggregate::{AggregateFeatureRow, Aggregator, Statistic};
pub use config::PipelineConfig;
pub use errors::{
    ConfigError, NormalizerError, NotFittedError, PipelineError, PipelineResult, SchemaError,
    ShapeError,
};
pub use normalize::{ImputerParams, NormalizationState, Normalizer, ScalerParams};
pub use prepare::{
    prepare_dataset, CancellationToken, PreparationReport, PreparedDataset, WindowArtifact,
};
pub use reading::{
    parse_batch, parse_reading, Channel, ChannelRow, Frame, Label, Reading, ReadingPayload,
    WireTimestamp,
};
pub use resample::{ResampledSeries, Resampler};
pub use time::{FixedTime, SystemTime, TimeSource, Timestamp};
pub use window::{Window, WindowSet, Windower};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
