//! Annotated map rendering and photon table assembly.

use crate::fit::Candidate;
use centroids_core::{
    OutputFrame, PhotonRecord, PhotonTable, Pixel, PixelStore, ValidatedParams, WindowPixels,
};

/// Builds the output frame and photon table from accepted candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputAssembler {
    return_map: bool,
    return_pixels: PixelStore,
}

impl OutputAssembler {
    /// Creates an assembler.
    #[must_use]
    pub fn new(return_map: bool, return_pixels: PixelStore) -> Self {
        Self {
            return_map,
            return_pixels,
        }
    }

    /// Creates an assembler from validated parameters.
    #[must_use]
    pub fn from_params(params: &ValidatedParams) -> Self {
        Self::new(params.return_map, params.return_pixels)
    }

    /// Renders the map (if requested) and the table for frame `frame_index`.
    ///
    /// The map is a fresh zeroed allocation; each photon adds its count at
    /// its rounded primary position.
    #[must_use]
    pub fn assemble<P: Pixel>(
        &self,
        width: usize,
        height: usize,
        frame_index: usize,
        accepted: &[Candidate<'_, P>],
    ) -> (Option<OutputFrame<P>>, PhotonTable) {
        let table: PhotonTable = accepted
            .iter()
            .map(|c| self.record(frame_index, c))
            .collect();

        let map = self.return_map.then(|| {
            let mut map = OutputFrame::zeros(width, height);
            for record in &table {
                let (x, y) = record.marker_pixel(width, height);
                map.add_count(x, y, record.photons);
            }
            map
        });

        (map, table)
    }

    fn record<P: Pixel>(&self, frame_index: usize, candidate: &Candidate<'_, P>) -> PhotonRecord {
        let pixels = match self.return_pixels {
            PixelStore::None => None,
            PixelStore::Window => Some(WindowPixels::Window {
                width: candidate.window.size(),
                pixels: candidate.window.to_pixels(),
            }),
            PixelStore::Marginals => Some(WindowPixels::Marginals {
                rows: candidate.window.row_sums(),
                cols: candidate.window.col_sums(),
            }),
        };

        PhotonRecord {
            frame: frame_index,
            x: candidate.position.0,
            y: candidate.position.1,
            seed_x: candidate.seed.x,
            seed_y: candidate.seed.y,
            peak: candidate.seed.value,
            sum: candidate.sum,
            photons: candidate.calibration.photons,
            pixel_photons: candidate.calibration.pixel_photons,
            fits: candidate.fits,
            pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibrate::Calibration;
    use crate::fit::CentroidFitter;
    use centroids_core::{FitMode, Frame, Seed};

    fn accepted<'a>(frame: Frame<'a, u16>, seeds: &[(usize, usize, u64)]) -> Vec<Candidate<'a, u16>> {
        let fitter = CentroidFitter::new(1, [FitMode::Com2D].into_iter().collect());
        seeds
            .iter()
            .map(|&(x, y, photons)| {
                fitter
                    .fit(frame, Seed::new(x, y, frame.value(x, y)))
                    .unwrap()
                    .with_calibration(Calibration {
                        photons,
                        pixel_photons: 1,
                    })
            })
            .collect()
    }

    #[test]
    fn test_map_marks_counts() {
        let mut data = vec![0u16; 100];
        data[3 * 10 + 3] = 40;
        data[7 * 10 + 6] = 12;
        let frame = Frame::new(&data, 10, 10).unwrap();
        let cands = accepted(frame, &[(3, 3, 4), (6, 7, 2)]);

        let (map, table) = OutputAssembler::new(true, PixelStore::None).assemble(10, 10, 0, &cands);
        let map = map.unwrap();
        assert_eq!(map.get(3, 3), 4);
        assert_eq!(map.get(6, 7), 2);
        assert_eq!(map.as_slice().iter().map(|&v| u32::from(v)).sum::<u32>(), 6);

        assert_eq!(table.len(), 2);
        assert_eq!((table[0].seed_x, table[0].seed_y), (3, 3));
        assert_eq!(table[0].peak, 40);
        assert!(table[0].pixels.is_none());
    }

    #[test]
    fn test_no_map_when_disabled() {
        let mut data = vec![0u16; 100];
        data[55] = 9;
        let frame = Frame::new(&data, 10, 10).unwrap();
        let cands = accepted(frame, &[(5, 5, 1)]);
        let (map, table) = OutputAssembler::new(false, PixelStore::None).assemble(10, 10, 3, &cands);
        assert!(map.is_none());
        assert_eq!(table[0].frame, 3);
    }

    #[test]
    fn test_pixel_retention() {
        let mut data = vec![0u16; 100];
        data[55] = 9;
        data[56] = 3;
        let frame = Frame::new(&data, 10, 10).unwrap();
        let cands = accepted(frame, &[(5, 5, 1)]);

        let (_, table) = OutputAssembler::new(false, PixelStore::Window).assemble(10, 10, 0, &cands);
        assert_eq!(
            table[0].pixels,
            Some(WindowPixels::Window {
                width: 3,
                pixels: vec![0, 0, 0, 0, 9, 3, 0, 0, 0]
            })
        );

        let (_, table) = OutputAssembler::new(true, PixelStore::Marginals).assemble(10, 10, 0, &cands);
        assert_eq!(
            table[0].pixels,
            Some(WindowPixels::Marginals {
                rows: vec![0, 12, 0],
                cols: vec![0, 9, 3]
            })
        );
    }
}
