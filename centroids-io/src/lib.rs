//! centroids-io: raw frame input and photon table output.
//!
//! Frames are read from headerless little-endian files through memmap2;
//! photon tables are written as CSV or as fixed-size binary records.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::{load_params, save_params};
pub use error::{Error, Result};
pub use reader::{FrameIter, MappedFileReader, RawFrameReader};
pub use writer::{PhotonFileWriter, BINARY_RECORD_SIZE};
