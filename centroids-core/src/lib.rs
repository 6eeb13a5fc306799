//! centroids-core: Core types for photon centroiding on area detectors.
//!
//! This crate provides the frame views, detection parameters, photon
//! records and error types shared by the centroiding engine, the I/O layer
//! and the command line front end.
//!

pub mod error;
pub mod frame;
pub mod params;
pub mod photon;
pub mod statistics;

pub use error::{Error, FrameError, FrameReject, ParameterError, Result};
pub use frame::{Frame, FrameStack, OutputFrame, Pixel};
pub use params::{
    FitMode, FitModes, ParameterName, ParameterSet, PixelStore, ValidatedParams,
};
pub use photon::{FitResults, PhotonRecord, PhotonTable, Seed, WindowPixels};
pub use statistics::FrameStatistics;
