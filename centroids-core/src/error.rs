//! Error types for centroids-core.

use thiserror::Error;

/// Result type alias for centroids operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for centroids operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Detection parameters failed validation.
    #[error("invalid parameters: {0}")]
    Parameter(#[from] ParameterError),

    /// Frame buffer does not describe a valid image.
    #[error("invalid frame: {0}")]
    Frame(#[from] FrameError),
}

/// Inconsistent detection configuration.
///
/// Reported before any pixel is read; the frame is dropped with zero events.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A window size was zero or negative.
    #[error("{name} must be positive (got {value})")]
    NonPositiveSize { name: &'static str, value: i32 },

    /// The fitting window is larger than the search neighborhood.
    #[error("box ({box_size}) must not exceed search_box ({search_box})")]
    BoxExceedsSearchBox { box_size: i32, search_box: i32 },

    /// `sum_min` is greater than `sum_max`, or either bound is NaN.
    #[error("sum range is inverted or undefined: sum_min={min}, sum_max={max}")]
    InvertedSumRange { min: f64, max: f64 },

    /// A calibration divisor was zero or negative.
    #[error("{name} must be positive (got {value})")]
    NonPositiveDivisor { name: &'static str, value: i32 },

    /// The per-pixel background level was negative.
    #[error("pixel_bgnd_num must not be negative (got {0})")]
    NegativeBackground(i32),

    /// `overlap_max` must allow at least an isolated event.
    #[error("overlap_max must be at least 1 (got {0})")]
    InvalidOverlapMax(i32),

    /// `fit_pixels` carries bits that name no fit routine.
    #[error("unknown fit mode bits: {0:#04x}")]
    UnknownFitModes(u8),

    /// Window size or background floor does not fit the working integer width.
    #[error("calibration overflows: box={box_size}, pixel_bgnd_num={pixel_bgnd_num}")]
    CalibrationOverflow { box_size: i32, pixel_bgnd_num: i32 },

    /// Frame dimensions or frame count are zero.
    #[error("frame dimensions must be positive (x={x}, y={y}, n={n})")]
    EmptyDimensions { x: usize, y: usize, n: usize },

    /// Configured dimensions disagree with the supplied buffers.
    #[error(
        "configured shape {expected_x}x{expected_y}x{expected_n} does not match \
         buffer shape {actual_x}x{actual_y}x{actual_n}"
    )]
    ShapeMismatch {
        expected_x: usize,
        expected_y: usize,
        expected_n: usize,
        actual_x: usize,
        actual_y: usize,
        actual_n: usize,
    },
}

/// Malformed frame buffer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Width or height is zero.
    #[error("frame has zero extent ({width}x{height})")]
    ZeroExtent { width: usize, height: usize },

    /// `width * height * frames` does not fit in `usize`.
    #[error("frame dimensions overflow ({width}x{height}x{frames})")]
    DimensionOverflow {
        width: usize,
        height: usize,
        frames: usize,
    },

    /// The slice length is not `width * height * frames`.
    #[error("buffer holds {actual} samples, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Reason a single candidate was dropped.
///
/// These never fail a frame; they are tallied in
/// [`FrameStatistics`](crate::FrameStatistics).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameReject {
    /// The fitting window would extend past the frame boundary.
    #[error("fitting window crosses the frame edge")]
    EdgeClipped,

    /// The candidate belongs to an overlap group larger than `overlap_max`.
    #[error("overlap group of {group_size} exceeds overlap_max")]
    PileUp { group_size: usize },

    /// Window sum is below `sum_min`.
    #[error("window sum below sum_min")]
    SumBelowMin,

    /// Window sum is above `sum_max`.
    #[error("window sum above sum_max")]
    SumAboveMax,

    /// Window sum does not exceed the background floor.
    #[error("window sum at or below background floor")]
    BelowBackground,

    /// Calibration truncated to zero photons.
    #[error("calibrated photon count is zero")]
    ZeroCount,
}

impl FrameReject {
    /// Returns true for geometric rejections (edge clipping, pile-up).
    #[must_use]
    pub fn is_geometry(&self) -> bool {
        matches!(self, Self::EdgeClipped | Self::PileUp { .. })
    }

    /// Returns true for calibration rejections (sum range, background, zero count).
    #[must_use]
    pub fn is_calibration(&self) -> bool {
        !self.is_geometry()
    }
}
