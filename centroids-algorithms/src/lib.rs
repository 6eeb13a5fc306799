//! centroids-algorithms: Per-frame photon centroiding.
//!
//! The engine runs a fixed pipeline on each frame:
//! - **Scan** - threshold plus square non-maximum suppression
//! - **Fit** - window sum and center-of-mass estimates (2D, 1D-X, 1D-Y)
//! - **Calibrate** - window sum to integer photon count, sum range filter
//! - **Resolve** - union-find overlap groups, pile-up rejection
//! - **Assemble** - annotated map and ordered photon table
//!
//! [`CentroidStage`] wraps the engine for hosts that share configuration
//! across threads.
//!
#![warn(missing_docs)]

mod assemble;
mod calibrate;
mod engine;
mod fit;
mod overlap;
mod scan;
pub mod stage;

pub use assemble::OutputAssembler;
pub use calibrate::{Calibration, PhotonCalibrator};
pub use engine::{CentroidEngine, FrameOutput, StackOutput, Status};
pub use fit::{Candidate, CentroidFitter, Estimate, PositionEstimator, Window};
pub use overlap::{OverlapResolver, Resolution};
pub use scan::{NeighborhoodScanner, Seeds};
pub use stage::{CentroidStage, StageStatus};

// Re-export core types used in the public API
pub use centroids_core::{
    Frame, FrameStack, FrameStatistics, OutputFrame, ParameterError, ParameterSet, PhotonTable,
    Pixel, ValidatedParams,
};
