//! Caller-visible fusion errors
//!
//! Only malformed input reaches the caller. A predictor that failed to load
//! or misbehaved is absorbed by the scorer and reported through
//! `FusionResponse::degraded` instead.

use thiserror::Error;

use echoguard_core::{ConfigError, ShapeError};

/// Result type for fusion operations
pub type FusionResult<T> = Result<T, FusionError>;

/// The request itself is invalid
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    /// A window row has the wrong channel count
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// The window has no rows at all
    #[error("window has no rows")]
    EmptyWindow,

    /// A window cell is NaN or infinite
    #[error("window row {row}, channel {channel} is not finite")]
    NonFiniteWindow {
        /// Zero-based row in the supplied window
        row: usize,
        /// Zero-based channel
        channel: usize,
    },

    /// An aggregate feature is NaN or infinite
    #[error("aggregate feature '{name}' is not finite")]
    NonFiniteFeature {
        /// Feature column name
        name: String,
    },

    /// Scorer configuration out of range
    #[error(transparent)]
    Config(#[from] ConfigError),
}
