//! Intensity-to-photon-count calibration.
#![allow(clippy::cast_precision_loss)]

use centroids_core::{FrameReject, ValidatedParams};

/// Calibrated counts for one candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    /// Photons from the background-subtracted window sum.
    pub photons: u64,
    /// Photons from the background-subtracted peak pixel.
    pub pixel_photons: u64,
}

/// Converts window sums into photon counts and applies the sum range filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonCalibrator {
    sum_min: f64,
    sum_max: f64,
    com_photon_num: u64,
    pixel_photon_num: u64,
    pixel_bgnd_num: u64,
    background_floor: u64,
}

impl PhotonCalibrator {
    /// Creates a calibrator from validated parameters.
    #[must_use]
    pub fn from_params(params: &ValidatedParams) -> Self {
        Self {
            sum_min: params.sum_min,
            sum_max: params.sum_max,
            com_photon_num: params.com_photon_num,
            pixel_photon_num: params.pixel_photon_num,
            pixel_bgnd_num: params.pixel_bgnd_num,
            background_floor: params.background_floor,
        }
    }

    /// Calibrates a window sum and its peak pixel.
    ///
    /// Bounds are inclusive. The window photon count is
    /// `(sum - background_floor) / com_photon_num`, truncated.
    ///
    /// # Errors
    /// Returns the calibration reject reason when the candidate must be dropped.
    pub fn calibrate(&self, sum: u64, peak: u64) -> Result<Calibration, FrameReject> {
        let total = sum as f64;
        if total < self.sum_min {
            return Err(FrameReject::SumBelowMin);
        }
        if total > self.sum_max {
            return Err(FrameReject::SumAboveMax);
        }
        if sum <= self.background_floor {
            return Err(FrameReject::BelowBackground);
        }

        let photons = (sum - self.background_floor) / self.com_photon_num;
        if photons == 0 {
            return Err(FrameReject::ZeroCount);
        }

        Ok(Calibration {
            photons,
            pixel_photons: peak.saturating_sub(self.pixel_bgnd_num) / self.pixel_photon_num,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use centroids_core::ParameterSet;

    fn calibrator(com: i32, pixel: i32, bgnd: i32, min: f64, max: f64) -> PhotonCalibrator {
        let params = ParameterSet::default()
            .with_shape(16, 16, 1)
            .with_boxes(1, 1)
            .with_calibration(com, pixel, bgnd)
            .with_sum_range(min, max)
            .validate()
            .unwrap();
        PhotonCalibrator::from_params(&params)
    }

    #[test]
    fn test_identity_calibration() {
        let cal = calibrator(1, 1, 0, 0.0, 1e6).calibrate(250, 250).unwrap();
        assert_eq!(cal.photons, 250);
        assert_eq!(cal.pixel_photons, 250);
    }

    #[test]
    fn test_sum_range_inclusive() {
        let c = calibrator(1, 1, 0, 100.0, 200.0);
        assert!(c.calibrate(100, 100).is_ok());
        assert!(c.calibrate(200, 100).is_ok());
        assert_eq!(c.calibrate(99, 99).unwrap_err(), FrameReject::SumBelowMin);
        assert_eq!(c.calibrate(201, 100).unwrap_err(), FrameReject::SumAboveMax);
    }

    #[test]
    fn test_background_floor_and_truncation() {
        // 3x3 window, 5 per pixel -> floor of 45
        let c = calibrator(10, 4, 5, 0.0, 1e6);
        assert_eq!(c.calibrate(45, 20).unwrap_err(), FrameReject::BelowBackground);
        assert_eq!(c.calibrate(30, 20).unwrap_err(), FrameReject::BelowBackground);
        assert_eq!(c.calibrate(54, 20).unwrap_err(), FrameReject::ZeroCount);

        let cal = c.calibrate(79, 25).unwrap();
        assert_eq!(cal.photons, 3);
        assert_eq!(cal.pixel_photons, 5);
    }

    #[test]
    fn test_pixel_photons_saturate_at_zero() {
        let cal = calibrator(1, 1, 10, 0.0, 1e6).calibrate(500, 4).unwrap();
        assert_eq!(cal.pixel_photons, 0);
        assert_eq!(cal.photons, 410);
    }
}
