//! Pipeline Processing Parameters
//!
//! Window shape, completeness gating and gap-filling bounds for the
//! preparation path.

// ===== WINDOWING =====

/// Window length in bins (T).
///
/// One hour of one-minute bins. The sequence classifier and the autoencoder
/// are built for exactly this many timesteps; the fusion path pads or trims
/// to it.
///
/// Source: Sequence model input contract
pub const WINDOW_SIZE: usize = 60;

/// Minimum fraction of non-missing cells for a window to be kept.
///
/// Windows below the ratio are dropped and counted, never reported as errors.
///
/// Source: Empirical; 3% sensor dropout keeps nearly all windows above 0.8
pub const MIN_VALID_RATIO: f64 = 0.8;

// ===== GAP FILLING =====

/// Longest run of missing bins filled by linear interpolation, per side.
///
/// Gaps up to this many bins from a known value are filled from both
/// directions; cells further away stay missing and are handled by the
/// completeness gate and imputation.
pub const INTERPOLATION_LIMIT: usize = 5;

/// Largest grid a single device series may span, in bins.
///
/// Bins are allocated for the whole span between the first and last reading,
/// so one stray timestamp decades away would otherwise allocate millions of
/// empty bins. About 694 days at the default one-minute width.
pub const MAX_SERIES_BINS: usize = 1_000_000;

// ===== ROLLING AGGREGATION =====

/// Divisor applied to the window length to get the minimum populated
/// periods for a rolling statistic (T / 2).
pub const MIN_PERIODS_DIVISOR: usize = 2;
