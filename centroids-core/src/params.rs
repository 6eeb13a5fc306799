//! Detection parameters and their validation.
//!
//! [`ParameterSet`] is the plain snapshot a host hands over for each frame.
//! [`ParameterSet::validate`] turns it into [`ValidatedParams`], which carries
//! typed and derived fields and is the only form the engine accepts.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions
)]

use crate::error::ParameterError;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Bit enabling the 2D center-of-mass fit.
pub const FIT_2D: u8 = 0x01;
/// Bit enabling the 1D fit along X.
pub const FIT_1D_X: u8 = 0x02;
/// Bit enabling the 1D fit along Y.
pub const FIT_1D_Y: u8 = 0x04;

/// A single position estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FitMode {
    /// Full two-dimensional intensity-weighted center of mass.
    Com2D,
    /// Center of mass of the column-sum projection (X only).
    Marginal1DX,
    /// Center of mass of the row-sum projection (Y only).
    Marginal1DY,
}

impl FitMode {
    /// All modes, in evaluation order.
    pub const ALL: [FitMode; 3] = [FitMode::Com2D, FitMode::Marginal1DX, FitMode::Marginal1DY];

    /// Configuration bit for this mode.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            FitMode::Com2D => FIT_2D,
            FitMode::Marginal1DX => FIT_1D_X,
            FitMode::Marginal1DY => FIT_1D_Y,
        }
    }
}

/// Set of enabled fit modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FitModes(u8);

impl FitModes {
    /// No fit enabled.
    pub const EMPTY: FitModes = FitModes(0);

    const KNOWN: u8 = FIT_2D | FIT_1D_X | FIT_1D_Y;

    /// Builds a set from configuration bits, rejecting unknown bits.
    #[must_use]
    pub fn from_bits(bits: u8) -> Option<Self> {
        if bits & !Self::KNOWN == 0 {
            Some(Self(bits))
        } else {
            None
        }
    }

    /// Configuration bits.
    #[must_use]
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if `mode` is enabled.
    #[must_use]
    pub fn contains(self, mode: FitMode) -> bool {
        self.0 & mode.bit() != 0
    }

    /// Enables `mode`.
    pub fn insert(&mut self, mode: FitMode) {
        self.0 |= mode.bit();
    }

    /// Returns true if no mode is enabled.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates over enabled modes in [`FitMode::ALL`] order.
    pub fn iter(self) -> impl Iterator<Item = FitMode> {
        FitMode::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<FitMode> for FitModes {
    fn from_iter<I: IntoIterator<Item = FitMode>>(iter: I) -> Self {
        let mut modes = FitModes::EMPTY;
        for mode in iter {
            modes.insert(mode);
        }
        modes
    }
}

/// What raw pixel data to keep with each photon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PixelStore {
    /// Keep nothing.
    #[default]
    None,
    /// Copy the full fitting window.
    Window,
    /// Keep the row-sum and column-sum projections of the window.
    Marginals,
}

/// Detection configuration snapshot.
///
/// Integer fields are signed because hosts may write any integer into them;
/// [`ParameterSet::validate`] rejects the values that make no sense.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParameterSet {
    /// Minimum intensity for a pixel to seed a candidate.
    pub threshold: u32,
    /// Fitting window half-size.
    #[cfg_attr(feature = "serde", serde(rename = "box"))]
    pub box_size: i32,
    /// Radius of the local-maximum search.
    pub search_box: i32,
    /// Window intensity per photon (COM calibration divisor).
    pub com_photon_num: i32,
    /// Peak intensity per photon (single-pixel calibration divisor).
    pub pixel_photon_num: i32,
    /// Per-pixel background level subtracted before calibration.
    pub pixel_bgnd_num: i32,
    /// Largest overlap group that is still accepted.
    pub overlap_max: i32,
    /// Smallest accepted window sum (inclusive).
    pub sum_min: f64,
    /// Largest accepted window sum (inclusive).
    pub sum_max: f64,
    /// Enabled fit modes as configuration bits.
    pub fit_pixels: u8,
    /// Number of frames in the call.
    pub n: usize,
    /// Frame width.
    pub x: usize,
    /// Frame height.
    pub y: usize,
    /// Render the annotated output frame.
    pub return_map: bool,
    /// Raw pixel retention per photon.
    pub return_pixels: PixelStore,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            threshold: 100,
            box_size: 2,
            search_box: 2,
            com_photon_num: 1,
            pixel_photon_num: 1,
            pixel_bgnd_num: 0,
            overlap_max: 1,
            sum_min: 0.0,
            sum_max: 1.0e12,
            fit_pixels: FIT_2D,
            n: 1,
            x: 0,
            y: 0,
            return_map: true,
            return_pixels: PixelStore::None,
        }
    }
}

impl ParameterSet {
    /// Creates a parameter set with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the seed threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the fitting window half-size and the search radius.
    #[must_use]
    pub fn with_boxes(mut self, box_size: i32, search_box: i32) -> Self {
        self.box_size = box_size;
        self.search_box = search_box;
        self
    }

    /// Sets the calibration divisors and background level.
    #[must_use]
    pub fn with_calibration(mut self, com_photon: i32, pixel_photon: i32, pixel_bgnd: i32) -> Self {
        self.com_photon_num = com_photon;
        self.pixel_photon_num = pixel_photon;
        self.pixel_bgnd_num = pixel_bgnd;
        self
    }

    /// Sets the maximum overlap group size.
    #[must_use]
    pub fn with_overlap_max(mut self, overlap_max: i32) -> Self {
        self.overlap_max = overlap_max;
        self
    }

    /// Sets the accepted window-sum range.
    #[must_use]
    pub fn with_sum_range(mut self, min: f64, max: f64) -> Self {
        self.sum_min = min;
        self.sum_max = max;
        self
    }

    /// Sets the enabled fit modes.
    #[must_use]
    pub fn with_fit_modes(mut self, modes: FitModes) -> Self {
        self.fit_pixels = modes.bits();
        self
    }

    /// Sets frame width, height and count.
    #[must_use]
    pub fn with_shape(mut self, x: usize, y: usize, n: usize) -> Self {
        self.x = x;
        self.y = y;
        self.n = n;
        self
    }

    /// Enables or disables the annotated output frame.
    #[must_use]
    pub fn with_return_map(mut self, return_map: bool) -> Self {
        self.return_map = return_map;
        self
    }

    /// Sets raw pixel retention.
    #[must_use]
    pub fn with_return_pixels(mut self, store: PixelStore) -> Self {
        self.return_pixels = store;
        self
    }

    /// Assigns a value through its host-side name.
    ///
    /// Integer parameters truncate `value`; fit flags treat any non-zero
    /// value as enabled.
    pub fn set_named(&mut self, name: ParameterName, value: f64) {
        match name {
            ParameterName::Threshold => self.threshold = value.max(0.0) as u32,
            ParameterName::Box => self.box_size = value as i32,
            ParameterName::SearchBox => self.search_box = value as i32,
            ParameterName::PixelPhoton => self.pixel_photon_num = value as i32,
            ParameterName::PixelBgnd => self.pixel_bgnd_num = value as i32,
            ParameterName::ComPhoton => self.com_photon_num = value as i32,
            ParameterName::OverlapMax => self.overlap_max = value as i32,
            ParameterName::SumMin => self.sum_min = value,
            ParameterName::SumMax => self.sum_max = value,
            ParameterName::Fit2D => self.set_fit_bit(FIT_2D, value != 0.0),
            ParameterName::Fit1DX => self.set_fit_bit(FIT_1D_X, value != 0.0),
            ParameterName::Fit1DY => self.set_fit_bit(FIT_1D_Y, value != 0.0),
        }
    }

    /// Reads a value through its host-side name.
    #[must_use]
    pub fn get_named(&self, name: ParameterName) -> f64 {
        let flag = |bit: u8| if self.fit_pixels & bit != 0 { 1.0 } else { 0.0 };
        match name {
            ParameterName::Threshold => f64::from(self.threshold),
            ParameterName::Box => f64::from(self.box_size),
            ParameterName::SearchBox => f64::from(self.search_box),
            ParameterName::PixelPhoton => f64::from(self.pixel_photon_num),
            ParameterName::PixelBgnd => f64::from(self.pixel_bgnd_num),
            ParameterName::ComPhoton => f64::from(self.com_photon_num),
            ParameterName::OverlapMax => f64::from(self.overlap_max),
            ParameterName::SumMin => self.sum_min,
            ParameterName::SumMax => self.sum_max,
            ParameterName::Fit2D => flag(FIT_2D),
            ParameterName::Fit1DX => flag(FIT_1D_X),
            ParameterName::Fit1DY => flag(FIT_1D_Y),
        }
    }

    fn set_fit_bit(&mut self, bit: u8, enabled: bool) {
        if enabled {
            self.fit_pixels |= bit;
        } else {
            self.fit_pixels &= !bit;
        }
    }

    /// Checks internal consistency and derives the engine's working values.
    ///
    /// Never touches pixel data.
    ///
    /// # Errors
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<ValidatedParams, ParameterError> {
        for (name, value) in [("box", self.box_size), ("search_box", self.search_box)] {
            if value <= 0 {
                return Err(ParameterError::NonPositiveSize { name, value });
            }
        }
        if self.box_size > self.search_box {
            return Err(ParameterError::BoxExceedsSearchBox {
                box_size: self.box_size,
                search_box: self.search_box,
            });
        }
        // NaN fails this comparison too.
        if !(self.sum_min <= self.sum_max) {
            return Err(ParameterError::InvertedSumRange {
                min: self.sum_min,
                max: self.sum_max,
            });
        }
        for (name, value) in [
            ("com_photon_num", self.com_photon_num),
            ("pixel_photon_num", self.pixel_photon_num),
        ] {
            if value <= 0 {
                return Err(ParameterError::NonPositiveDivisor { name, value });
            }
        }
        if self.pixel_bgnd_num < 0 {
            return Err(ParameterError::NegativeBackground(self.pixel_bgnd_num));
        }
        if self.overlap_max < 1 {
            return Err(ParameterError::InvalidOverlapMax(self.overlap_max));
        }
        let fit_modes = FitModes::from_bits(self.fit_pixels)
            .ok_or(ParameterError::UnknownFitModes(self.fit_pixels))?;
        if self.x == 0 || self.y == 0 || self.n == 0 {
            return Err(ParameterError::EmptyDimensions {
                x: self.x,
                y: self.y,
                n: self.n,
            });
        }

        let box_size = self.box_size as usize;
        let pixel_bgnd_num = self.pixel_bgnd_num as u64;
        let overflow = ParameterError::CalibrationOverflow {
            box_size: self.box_size,
            pixel_bgnd_num: self.pixel_bgnd_num,
        };
        let window_width = box_size
            .checked_mul(2)
            .and_then(|w| w.checked_add(1))
            .ok_or_else(|| overflow.clone())?;
        let window_area = window_width
            .checked_mul(window_width)
            .ok_or_else(|| overflow.clone())?;
        let background_floor = u64::try_from(window_area)
            .ok()
            .and_then(|area| pixel_bgnd_num.checked_mul(area))
            .ok_or(overflow)?;

        Ok(ValidatedParams {
            threshold: u64::from(self.threshold),
            box_size,
            search_box: self.search_box as usize,
            window_width,
            window_area,
            com_photon_num: self.com_photon_num as u64,
            pixel_photon_num: self.pixel_photon_num as u64,
            pixel_bgnd_num,
            background_floor,
            overlap_max: self.overlap_max as usize,
            sum_min: self.sum_min,
            sum_max: self.sum_max,
            fit_modes,
            frames: self.n,
            width: self.x,
            height: self.y,
            return_map: self.return_map,
            return_pixels: self.return_pixels,
        })
    }
}

/// Detection parameters after validation, with derived fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParams {
    /// Seed threshold.
    pub threshold: u64,
    /// Fitting window half-size.
    pub box_size: usize,
    /// Local-maximum search radius.
    pub search_box: usize,
    /// Fitting window edge length, `2 * box_size + 1`.
    pub window_width: usize,
    /// Pixels in the fitting window.
    pub window_area: usize,
    /// COM calibration divisor.
    pub com_photon_num: u64,
    /// Single-pixel calibration divisor.
    pub pixel_photon_num: u64,
    /// Per-pixel background level.
    pub pixel_bgnd_num: u64,
    /// Background over the whole window, `pixel_bgnd_num * window_area`.
    pub background_floor: u64,
    /// Largest accepted overlap group.
    pub overlap_max: usize,
    /// Smallest accepted window sum.
    pub sum_min: f64,
    /// Largest accepted window sum.
    pub sum_max: f64,
    /// Enabled fit modes.
    pub fit_modes: FitModes,
    /// Frames per call.
    pub frames: usize,
    /// Frame width.
    pub width: usize,
    /// Frame height.
    pub height: usize,
    /// Render the annotated output frame.
    pub return_map: bool,
    /// Raw pixel retention.
    pub return_pixels: PixelStore,
}

impl ValidatedParams {
    /// Checks the configured shape against the buffers actually supplied.
    ///
    /// # Errors
    /// Returns [`ParameterError::ShapeMismatch`] if any extent differs.
    pub fn ensure_shape(
        &self,
        width: usize,
        height: usize,
        frames: usize,
    ) -> Result<(), ParameterError> {
        if (self.width, self.height, self.frames) != (width, height, frames) {
            return Err(ParameterError::ShapeMismatch {
                expected_x: self.width,
                expected_y: self.height,
                expected_n: self.frames,
                actual_x: width,
                actual_y: height,
                actual_n: frames,
            });
        }
        Ok(())
    }

    /// Two windows overlap when their seeds are at most this far apart on both axes.
    #[must_use]
    pub fn overlap_reach(&self) -> usize {
        2 * self.box_size
    }
}

/// Host-side names of the configurable parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterName {
    Threshold,
    Box,
    SearchBox,
    PixelPhoton,
    PixelBgnd,
    ComPhoton,
    OverlapMax,
    SumMin,
    SumMax,
    Fit2D,
    Fit1DX,
    Fit1DY,
}

impl ParameterName {
    /// All names in registry order.
    pub const ALL: [ParameterName; 12] = [
        ParameterName::Threshold,
        ParameterName::Box,
        ParameterName::SearchBox,
        ParameterName::PixelPhoton,
        ParameterName::PixelBgnd,
        ParameterName::ComPhoton,
        ParameterName::OverlapMax,
        ParameterName::SumMin,
        ParameterName::SumMax,
        ParameterName::Fit2D,
        ParameterName::Fit1DX,
        ParameterName::Fit1DY,
    ];

    /// Registry string for this parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ParameterName::Threshold => "THRESHOLD",
            ParameterName::Box => "BOX",
            ParameterName::SearchBox => "SEARCH_BOX",
            ParameterName::PixelPhoton => "PIXEL_PHOTON",
            ParameterName::PixelBgnd => "PIXEL_BGND",
            ParameterName::ComPhoton => "PIXEL_COM",
            ParameterName::OverlapMax => "OVERLAP_MAX",
            ParameterName::SumMin => "SUM_MIN",
            ParameterName::SumMax => "SUM_MAX",
            ParameterName::Fit2D => "FIT_2D",
            ParameterName::Fit1DX => "FIT_1D_X",
            ParameterName::Fit1DY => "FIT_1D_Y",
        }
    }
}

impl fmt::Display for ParameterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParameterName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        ParameterName::ALL
            .into_iter()
            .find(|name| name.as_str() == wanted)
            .ok_or_else(|| format!("unknown parameter name: {s}"))
    }
}
