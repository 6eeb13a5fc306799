//! Per-invocation detection counters.

use crate::error::FrameReject;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters collected while processing one frame (or a merged batch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStatistics {
    /// Frames processed.
    pub frames: usize,
    /// Pixels visited by the scanner.
    pub pixels_scanned: usize,
    /// Seeds produced by the scanner.
    pub seeds: usize,
    /// Seeds whose window crossed the frame edge.
    pub edge_rejected: usize,
    /// Candidates outside `[sum_min, sum_max]`.
    pub sum_rejected: usize,
    /// Candidates at or below background, or calibrated to zero photons.
    pub count_rejected: usize,
    /// Overlap groups discarded as pile-up.
    pub pileup_groups: usize,
    /// Candidates discarded as members of pile-up groups.
    pub pileup_rejected: usize,
    /// Photons in the output table.
    pub accepted: usize,
}

impl FrameStatistics {
    /// Tallies one rejected candidate.
    pub fn record_reject(&mut self, reject: FrameReject) {
        match reject {
            FrameReject::EdgeClipped => self.edge_rejected += 1,
            FrameReject::PileUp { .. } => self.pileup_rejected += 1,
            FrameReject::SumBelowMin | FrameReject::SumAboveMax => self.sum_rejected += 1,
            FrameReject::BelowBackground | FrameReject::ZeroCount => self.count_rejected += 1,
        }
    }

    /// Total geometric rejections (edge, pile-up).
    #[must_use]
    pub fn geometry_rejected(&self) -> usize {
        self.edge_rejected + self.pileup_rejected
    }

    /// Total calibration rejections (sum range, background, zero count).
    #[must_use]
    pub fn calibration_rejected(&self) -> usize {
        self.sum_rejected + self.count_rejected
    }

    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: &FrameStatistics) {
        self.frames += other.frames;
        self.pixels_scanned += other.pixels_scanned;
        self.seeds += other.seeds;
        self.edge_rejected += other.edge_rejected;
        self.sum_rejected += other.sum_rejected;
        self.count_rejected += other.count_rejected;
        self.pileup_groups += other.pileup_groups;
        self.pileup_rejected += other.pileup_rejected;
        self.accepted += other.accepted;
    }
}
