//! Window shape adaptation
//!
//! Windows arriving at the scorer come from any source and may be shorter or
//! longer than T. Only the row count is adapted:
//!
//! ```text
//!   40 rows  ──►  [20 zero rows][40 original rows]      (left-pad)
//!   90 rows  ──►  [rows 30..90]                         (keep last T)
//! ```
//!
//! A row whose channel count is not F is rejected.

use log::debug;

use echoguard_core::constants::channels::CHANNEL_COUNT;
use echoguard_core::{Frame, ShapeError};

use crate::errors::{FusionError, FusionResult};

/// Adapt `window` to exactly `window_size` rows of F channels
pub fn adapt_window(window: &[Vec<f64>], window_size: usize) -> FusionResult<Vec<Frame>> {
    if window.is_empty() {
        return Err(FusionError::EmptyWindow);
    }

    let mut frames = Vec::with_capacity(window.len());
    for (row, values) in window.iter().enumerate() {
        let frame: Frame = values.as_slice().try_into().map_err(|_| ShapeError {
            row,
            expected: CHANNEL_COUNT,
            actual: values.len(),
        })?;
        if let Some(channel) = frame.iter().position(|v| !v.is_finite()) {
            return Err(FusionError::NonFiniteWindow { row, channel });
        }
        frames.push(frame);
    }

    Ok(fit_length(frames, window_size))
}

/// Left-pad with zero rows or keep the trailing `window_size` rows
pub fn fit_length(mut frames: Vec<Frame>, window_size: usize) -> Vec<Frame> {
    let len = frames.len();
    if len > window_size {
        debug!("trimming window from {} to {} rows", len, window_size);
        frames.drain(..len - window_size);
        frames
    } else if len < window_size {
        debug!("padding window from {} to {} rows", len, window_size);
        let mut padded = vec![[0.0; CHANNEL_COUNT]; window_size - len];
        padded.extend(frames);
        padded
    } else {
        frames
    }
}
