//! Fitting windows and sub-pixel position estimates.
//!
//! Each seed gets a `(2 * box + 1)^2` window. Windows that would cross the
//! frame edge are never partially fit; the seed is rejected instead.
#![allow(clippy::cast_precision_loss)]

use crate::calibrate::Calibration;
use centroids_core::{FitMode, FitModes, FitResults, Frame, FrameReject, Pixel, Seed, ValidatedParams};

/// Square pixel window fully inside a frame.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a, P> {
    frame: Frame<'a, P>,
    x0: usize,
    y0: usize,
    size: usize,
}

impl<'a, P: Pixel> Window<'a, P> {
    /// Window of half-size `box_size` centered on `seed`, or `None` if it
    /// would extend past the frame boundary.
    #[must_use]
    pub fn around(frame: Frame<'a, P>, seed: &Seed, box_size: usize) -> Option<Self> {
        if seed.x < box_size
            || seed.y < box_size
            || seed.x + box_size >= frame.width()
            || seed.y + box_size >= frame.height()
        {
            return None;
        }
        Some(Self {
            frame,
            x0: seed.x - box_size,
            y0: seed.y - box_size,
            size: 2 * box_size + 1,
        })
    }

    /// Frame coordinate of the top-left window pixel.
    #[must_use]
    pub fn origin(&self) -> (usize, usize) {
        (self.x0, self.y0)
    }

    /// Edge length.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Frame coordinate of the window center.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        let half = self.size / 2;
        ((self.x0 + half) as f64, (self.y0 + half) as f64)
    }

    fn row(&self, dy: usize) -> &'a [P] {
        &self.frame.row(self.y0 + dy)[self.x0..self.x0 + self.size]
    }

    /// Sample at window offset `(dx, dy)`.
    #[must_use]
    pub fn value(&self, dx: usize, dy: usize) -> u64 {
        self.frame.value(self.x0 + dx, self.y0 + dy)
    }

    /// Total intensity.
    #[must_use]
    pub fn sum(&self) -> u64 {
        (0..self.size)
            .map(|dy| self.row(dy).iter().map(|p| p.to_u64()).sum::<u64>())
            .sum()
    }

    /// Sum of each window row, top to bottom.
    #[must_use]
    pub fn row_sums(&self) -> Vec<u64> {
        (0..self.size)
            .map(|dy| self.row(dy).iter().map(|p| p.to_u64()).sum())
            .collect()
    }

    /// Sum of each window column, left to right.
    #[must_use]
    pub fn col_sums(&self) -> Vec<u64> {
        let mut cols = vec![0u64; self.size];
        for dy in 0..self.size {
            for (acc, p) in cols.iter_mut().zip(self.row(dy)) {
                *acc += p.to_u64();
            }
        }
        cols
    }

    /// Row-major copy of the window samples.
    #[must_use]
    pub fn to_pixels(&self) -> Vec<u64> {
        (0..self.size)
            .flat_map(|dy| self.row(dy).iter().map(|p| p.to_u64()))
            .collect()
    }
}

/// Output of one fit mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Estimate {
    /// Both coordinates.
    Point {
        /// Column.
        x: f64,
        /// Row.
        y: f64,
    },
    /// Column only.
    X(f64),
    /// Row only.
    Y(f64),
}

/// Position estimation from a fitting window.
pub trait PositionEstimator {
    /// Estimates the event position in frame coordinates.
    fn estimate<P: Pixel>(&self, window: &Window<'_, P>) -> Estimate;
}

impl PositionEstimator for FitMode {
    fn estimate<P: Pixel>(&self, window: &Window<'_, P>) -> Estimate {
        let (x0, y0) = window.origin();
        let (cx, cy) = window.center();
        match self {
            FitMode::Com2D => {
                let mut sx = 0.0;
                let mut sy = 0.0;
                let mut sw = 0.0;
                for dy in 0..window.size() {
                    for dx in 0..window.size() {
                        let w = window.value(dx, dy) as f64;
                        sx += (x0 + dx) as f64 * w;
                        sy += (y0 + dy) as f64 * w;
                        sw += w;
                    }
                }
                if sw > 0.0 {
                    Estimate::Point {
                        x: sx / sw,
                        y: sy / sw,
                    }
                } else {
                    Estimate::Point { x: cx, y: cy }
                }
            }
            FitMode::Marginal1DX => {
                Estimate::X(weighted_mean(&window.col_sums(), x0).unwrap_or(cx))
            }
            FitMode::Marginal1DY => {
                Estimate::Y(weighted_mean(&window.row_sums(), y0).unwrap_or(cy))
            }
        }
    }
}

/// Center of mass of a 1D profile starting at `offset`; `None` if the profile is empty.
fn weighted_mean(profile: &[u64], offset: usize) -> Option<f64> {
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &w) in profile.iter().enumerate() {
        num += (offset + i) as f64 * w as f64;
        den += w as f64;
    }
    (den > 0.0).then(|| num / den)
}

/// A seed that has been fit but not yet accepted.
#[derive(Debug, Clone)]
pub struct Candidate<'a, P> {
    /// Originating seed.
    pub seed: Seed,
    /// Fitting window.
    pub window: Window<'a, P>,
    /// Window sum.
    pub sum: u64,
    /// Per-mode estimates.
    pub fits: FitResults,
    /// Primary position `(x, y)`.
    pub position: (f64, f64),
    /// Photon counts, filled in by the calibrator.
    pub calibration: Calibration,
}

impl<P> Candidate<'_, P> {
    /// Attaches the calibrated counts.
    #[must_use]
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }
}

/// Window extraction and center-of-mass fitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentroidFitter {
    box_size: usize,
    modes: FitModes,
}

impl CentroidFitter {
    /// Creates a fitter for the given half-size and modes.
    #[must_use]
    pub fn new(box_size: usize, modes: FitModes) -> Self {
        Self { box_size, modes }
    }

    /// Creates a fitter from validated parameters.
    #[must_use]
    pub fn from_params(params: &ValidatedParams) -> Self {
        Self::new(params.box_size, params.fit_modes)
    }

    /// Fits one seed.
    ///
    /// # Errors
    /// Returns [`FrameReject::EdgeClipped`] if the window leaves the frame.
    pub fn fit<'a, P: Pixel>(
        &self,
        frame: Frame<'a, P>,
        seed: Seed,
    ) -> Result<Candidate<'a, P>, FrameReject> {
        let window = Window::around(frame, &seed, self.box_size).ok_or(FrameReject::EdgeClipped)?;

        let mut fits = FitResults::default();
        for mode in self.modes.iter() {
            match mode.estimate(&window) {
                Estimate::Point { x, y } => fits.com_2d = Some((x, y)),
                Estimate::X(x) => fits.marginal_x = Some(x),
                Estimate::Y(y) => fits.marginal_y = Some(y),
            }
        }

        Ok(Candidate {
            seed,
            sum: window.sum(),
            position: fits.primary(seed.center()),
            window,
            fits,
            calibration: Calibration::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_relative_eq;

    fn frame_with(width: usize, height: usize, pixels: &[(usize, usize, u16)]) -> Vec<u16> {
        let mut data = vec![0u16; width * height];
        for &(x, y, v) in pixels {
            data[y * width + x] = v;
        }
        data
    }

    fn all_modes() -> FitModes {
        FitMode::ALL.into_iter().collect()
    }

    #[test]
    fn test_window_edge_rejection() {
        let data = vec![1u16; 100];
        let frame = Frame::new(&data, 10, 10).unwrap();
        let fitter = CentroidFitter::new(2, all_modes());

        assert!(fitter.fit(frame, Seed::new(2, 2, 1)).is_ok());
        assert!(fitter.fit(frame, Seed::new(7, 7, 1)).is_ok());
        for (x, y) in [(1, 5), (5, 1), (8, 5), (5, 8), (0, 0), (9, 9)] {
            assert_eq!(
                fitter.fit(frame, Seed::new(x, y, 1)).unwrap_err(),
                FrameReject::EdgeClipped
            );
        }
    }

    #[test]
    fn test_window_sums_and_projections() {
        let data = frame_with(7, 7, &[(3, 3, 10), (4, 3, 6), (3, 2, 4)]);
        let frame = Frame::new(&data, 7, 7).unwrap();
        let window = Window::around(frame, &Seed::new(3, 3, 10), 1).unwrap();

        assert_eq!(window.origin(), (2, 2));
        assert_eq!(window.sum(), 20);
        assert_eq!(window.row_sums(), vec![4, 16, 0]);
        assert_eq!(window.col_sums(), vec![0, 14, 6]);
        assert_eq!(window.to_pixels(), vec![0, 4, 0, 0, 10, 6, 0, 0, 0]);
    }

    #[test]
    fn test_com_2d() {
        let data = frame_with(7, 7, &[(3, 3, 30), (4, 3, 10)]);
        let frame = Frame::new(&data, 7, 7).unwrap();
        let candidate = CentroidFitter::new(1, FitModes::from_bits(0x01).unwrap())
            .fit(frame, Seed::new(3, 3, 30))
            .unwrap();

        let (x, y) = candidate.fits.com_2d.unwrap();
        assert_relative_eq!(x, 3.25);
        assert_relative_eq!(y, 3.0);
        assert_eq!(candidate.position, (x, y));
        assert_eq!(candidate.sum, 40);
        assert!(candidate.fits.marginal_x.is_none());
    }

    #[test]
    fn test_marginals_match_2d() {
        let data = frame_with(9, 9, &[(4, 4, 50), (5, 4, 20), (4, 5, 10), (3, 3, 5)]);
        let frame = Frame::new(&data, 9, 9).unwrap();
        let candidate = CentroidFitter::new(2, all_modes())
            .fit(frame, Seed::new(4, 4, 50))
            .unwrap();

        let (x, y) = candidate.fits.com_2d.unwrap();
        assert_relative_eq!(candidate.fits.marginal_x.unwrap(), x, epsilon = 1e-12);
        assert_relative_eq!(candidate.fits.marginal_y.unwrap(), y, epsilon = 1e-12);
    }

    #[test]
    fn test_single_axis_primary_uses_seed_for_other_axis() {
        let data = frame_with(7, 7, &[(3, 3, 30), (4, 3, 10), (3, 4, 10)]);
        let frame = Frame::new(&data, 7, 7).unwrap();
        let fitter = CentroidFitter::new(1, [FitMode::Marginal1DX].into_iter().collect());
        let candidate = fitter.fit(frame, Seed::new(3, 3, 30)).unwrap();

        assert_relative_eq!(candidate.position.0, 3.2);
        assert_relative_eq!(candidate.position.1, 3.0);
    }

    #[test]
    fn test_no_modes_falls_back_to_seed_center() {
        let data = frame_with(7, 7, &[(3, 3, 30), (4, 3, 10)]);
        let frame = Frame::new(&data, 7, 7).unwrap();
        let candidate = CentroidFitter::new(1, FitModes::EMPTY)
            .fit(frame, Seed::new(3, 3, 30))
            .unwrap();

        assert!(candidate.fits.is_empty());
        assert_eq!(candidate.position, (3.0, 3.0));
        assert_eq!(candidate.sum, 40);
    }

    #[test]
    fn test_zero_window_uses_center() {
        let data = vec![0u16; 49];
        let frame = Frame::new(&data, 7, 7).unwrap();
        let candidate = CentroidFitter::new(1, all_modes())
            .fit(frame, Seed::new(3, 3, 0))
            .unwrap();

        assert_eq!(candidate.fits.com_2d, Some((3.0, 3.0)));
        assert_eq!(candidate.fits.marginal_x, Some(3.0));
        assert_eq!(candidate.fits.marginal_y, Some(3.0));
    }
}
