//! Per-frame orchestration: validate, scan, fit, calibrate, resolve, assemble.

use crate::assemble::OutputAssembler;
use crate::calibrate::PhotonCalibrator;
use crate::fit::CentroidFitter;
use crate::overlap::OverlapResolver;
use crate::scan::NeighborhoodScanner;
use centroids_core::{
    Frame, FrameStack, FrameStatistics, OutputFrame, ParameterError, ParameterSet, PhotonTable,
    Pixel, ValidatedParams,
};
use rayon::prelude::*;

/// Outcome of one engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// The frame was fully processed.
    Ok,
    /// Parameters failed validation; no pixel was read.
    ParameterInvalid(ParameterError),
}

/// Result of processing a single frame.
#[derive(Debug, Clone)]
pub struct FrameOutput<P> {
    /// Call status.
    pub status: Status,
    /// Annotated frame, present when requested and the call succeeded.
    pub map: Option<OutputFrame<P>>,
    /// Accepted photons in scan order.
    pub photons: PhotonTable,
    /// Detection counters.
    pub stats: FrameStatistics,
}

impl<P> FrameOutput<P> {
    fn invalid(err: ParameterError) -> Self {
        Self {
            status: Status::ParameterInvalid(err),
            map: None,
            photons: PhotonTable::new(),
            stats: FrameStatistics::default(),
        }
    }

    /// Returns true if the frame was processed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Number of accepted photon events.
    #[must_use]
    pub fn n_photons(&self) -> usize {
        self.photons.len()
    }

    /// Converts the status into a `Result`.
    ///
    /// # Errors
    /// Returns the validation error for a `ParameterInvalid` status.
    pub fn into_result(self) -> Result<Self, ParameterError> {
        match self.status {
            Status::Ok => Ok(self),
            Status::ParameterInvalid(err) => Err(err),
        }
    }
}

/// Result of processing a stack of frames.
#[derive(Debug, Clone)]
pub struct StackOutput<P> {
    /// Call status.
    pub status: Status,
    /// One annotated frame per input frame, when requested.
    pub maps: Vec<OutputFrame<P>>,
    /// Accepted photons, ordered by frame then scan order.
    pub photons: PhotonTable,
    /// Counters merged over all frames.
    pub stats: FrameStatistics,
}

impl<P> StackOutput<P> {
    /// Returns true if the stack was processed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Number of accepted photon events.
    #[must_use]
    pub fn n_photons(&self) -> usize {
        self.photons.len()
    }
}

/// Stateless centroiding engine.
///
/// Every call validates its parameters afresh; nothing is kept between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidEngine;

impl CentroidEngine {
    /// Creates an engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Processes one frame. `params.n` must be 1 and `params.x`/`params.y`
    /// must match the frame.
    #[must_use]
    pub fn process<P: Pixel>(&self, frame: Frame<'_, P>, params: &ParameterSet) -> FrameOutput<P> {
        let validated = match validate_for(params, frame.width(), frame.height(), 1) {
            Ok(validated) => validated,
            Err(err) => return FrameOutput::invalid(err),
        };

        let (map, photons, stats) = run_frame(frame, &validated, 0);
        FrameOutput {
            status: Status::Ok,
            map,
            photons,
            stats,
        }
    }

    /// Processes `params.n` frames, in parallel across frames.
    #[must_use]
    pub fn process_stack<P: Pixel>(
        &self,
        stack: FrameStack<'_, P>,
        params: &ParameterSet,
    ) -> StackOutput<P> {
        let validated =
            match validate_for(params, stack.width(), stack.height(), stack.frames()) {
                Ok(validated) => validated,
                Err(err) => {
                    return StackOutput {
                        status: Status::ParameterInvalid(err),
                        maps: Vec::new(),
                        photons: PhotonTable::new(),
                        stats: FrameStatistics::default(),
                    }
                }
            };

        let per_frame: Vec<_> = (0..stack.frames())
            .into_par_iter()
            .filter_map(|i| stack.frame(i).map(|frame| run_frame(frame, &validated, i)))
            .collect();

        let mut maps = Vec::with_capacity(if validated.return_map { per_frame.len() } else { 0 });
        let mut photons = PhotonTable::new();
        let mut stats = FrameStatistics::default();
        for (map, mut table, frame_stats) in per_frame {
            maps.extend(map);
            photons.append(&mut table);
            stats.merge(&frame_stats);
        }

        StackOutput {
            status: Status::Ok,
            maps,
            photons,
            stats,
        }
    }
}

fn validate_for(
    params: &ParameterSet,
    width: usize,
    height: usize,
    frames: usize,
) -> Result<ValidatedParams, ParameterError> {
    let validated = params.validate()?;
    validated.ensure_shape(width, height, frames)?;
    Ok(validated)
}

fn run_frame<P: Pixel>(
    frame: Frame<'_, P>,
    params: &ValidatedParams,
    frame_index: usize,
) -> (Option<OutputFrame<P>>, PhotonTable, FrameStatistics) {
    let scanner = NeighborhoodScanner::from_params(params);
    let fitter = CentroidFitter::from_params(params);
    let calibrator = PhotonCalibrator::from_params(params);

    let mut stats = FrameStatistics {
        frames: 1,
        ..FrameStatistics::default()
    };

    let mut seeds = scanner.scan(frame);
    let mut candidates = Vec::new();
    for seed in seeds.by_ref() {
        stats.seeds += 1;
        let calibrated = fitter.fit(frame, seed).and_then(|candidate| {
            calibrator
                .calibrate(candidate.sum, seed.value)
                .map(|cal| candidate.with_calibration(cal))
        });
        match calibrated {
            Ok(candidate) => candidates.push(candidate),
            Err(reject) => {
                log::trace!("frame {frame_index}: seed ({}, {}) rejected: {reject}", seed.x, seed.y);
                stats.record_reject(reject);
            }
        }
    }
    stats.pixels_scanned = seeds.pixels_visited();

    let resolution = OverlapResolver::from_params(params).resolve(candidates);
    for &reject in &resolution.rejected {
        stats.record_reject(reject);
    }
    stats.pileup_groups = resolution.groups_discarded;

    let (map, photons) = OutputAssembler::from_params(params).assemble(
        frame.width(),
        frame.height(),
        frame_index,
        &resolution.accepted,
    );
    stats.accepted = photons.len();

    log::debug!(
        "frame {frame_index}: {} seeds, {} photons ({} edge, {} sum, {} count, {} pile-up rejected)",
        stats.seeds,
        stats.accepted,
        stats.edge_rejected,
        stats.sum_rejected,
        stats.count_rejected,
        stats.pileup_rejected
    );

    (map, photons, stats)
}
