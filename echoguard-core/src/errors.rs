//! Error Types for Telemetry Preparation
//!
//! ## Error Categories
//!
//! Errors fall into a few groups, each with its own type so callers can
//! match on exactly the contract that was violated:
//!
//! ### Ingestion
//! - `SchemaError`: a reading is missing a required field, carries an
//!   invalid value, or has an unparsable timestamp
//!
//! ### Shape
//! - `ShapeError`: a row carries a channel count other than F. Only the
//!   window length is ever adapted, never the channel count
//!
//! ### Normalization
//! - `NotFittedError`: transform called before fit
//! - `NormalizerError`: fit could not produce parameters
//!
//! ### Configuration
//! - `ConfigError`: a parameter is outside its valid domain
//!
//! A window dropped by the completeness gate is not an error. It is counted
//! in `WindowSet::discarded` and never surfaces here.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use echoguard_core::PipelineError;
//!
//! fn handle(result: Result<(), PipelineError>) {
//!     match result {
//!         Ok(()) => {}
//!         Err(PipelineError::Schema(e)) => {
//!             // Reject the offending reading at the ingest boundary
//!             eprintln!("bad reading: {}", e);
//!         }
//!         Err(PipelineError::NotFitted(_)) => {
//!             // Deployment is missing its normalization artifacts
//!         }
//!         Err(PipelineError::Cancelled) => {
//!             // Batch job stopped between devices
//!         }
//!         Err(_) => {}
//!     }
//! }
//! ```

use thiserror::Error;

/// Result type for preparation operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// A reading failed validation at the ingest boundary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Required field absent
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// Field present but its value violates the schema
    #[error("invalid value for field '{field}': {reason}")]
    InvalidField {
        /// Offending field name
        field: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Timestamp present but not parseable
    #[error("unparsable timestamp '{value}'")]
    InvalidTimestamp {
        /// Raw timestamp text
        value: String,
    },

    /// Payload could not be decoded at all
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Element of a batch payload failed
    #[error("reading #{index}: {source}")]
    InBatch {
        /// Zero-based index in the batch
        index: usize,
        /// Underlying failure
        #[source]
        source: Box<SchemaError>,
    },
}

/// Channel count mismatch in a row of feature values
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("row {row} has {actual} channels, expected {expected}")]
pub struct ShapeError {
    /// Zero-based row index
    pub row: usize,
    /// Channels required (F)
    pub expected: usize,
    /// Channels supplied
    pub actual: usize,
}

/// Transform was invoked on a normalizer that was never fit
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("normalizer has not been fit; load or fit a NormalizationState first")]
pub struct NotFittedError;

/// Fitting could not produce normalization parameters
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizerError {
    /// No rows supplied
    #[error("cannot fit normalizer on an empty dataset")]
    EmptyInput,

    /// A channel had no observed value in any row
    #[error("channel '{channel}' has no observed values")]
    NoObservations {
        /// Channel wire name
        channel: &'static str,
    },
}

/// Configuration parameter outside its domain
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Numeric parameter out of range
    #[error("{name} = {value} is out of range: {expected}")]
    OutOfRange {
        /// Parameter name
        name: &'static str,
        /// Supplied value
        value: f64,
        /// Human-readable valid domain
        expected: &'static str,
    },

    /// Configuration document failed to decode
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Umbrella error for the preparation path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// Ingest validation failure
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Channel count mismatch
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Normalizer used before fit
    #[error(transparent)]
    NotFitted(#[from] NotFittedError),

    /// Normalizer fit failure
    #[error(transparent)]
    Normalizer(#[from] NormalizerError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Resampler given no readings
    #[error("no readings supplied for device series")]
    NoReadings,

    /// Resampler given readings from more than one device
    #[error("series for device '{expected}' contains a reading from '{found}'")]
    MixedDevices {
        /// Device the series belongs to
        expected: String,
        /// Foreign device id
        found: String,
    },

    /// Device readings span more bins than the configured bound
    #[error("series for device '{device_id}' spans {bins} bins, limit is {max_bins}")]
    SeriesTooLong {
        /// Device the series belongs to
        device_id: String,
        /// Bins the span would need
        bins: u128,
        /// Configured bound
        max_bins: usize,
    },

    /// Batch job cancelled at a device boundary
    #[error("preparation cancelled")]
    Cancelled,
}
