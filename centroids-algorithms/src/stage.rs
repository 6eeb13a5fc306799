//! Host-side wrapper around the engine.
//!
//! A stage owns the live configuration and the published results behind one
//! lock. Each frame goes through two short critical sections: a snapshot of
//! the configuration before the engine runs, and publication of the photon
//! count after. The engine itself always runs with the lock released.

use crate::engine::{CentroidEngine, FrameOutput, Status};
use centroids_core::{Frame, ParameterName, ParameterSet, Pixel};
use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Values a stage publishes after each frame.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StageStatus {
    /// Photons accepted in the most recent frame.
    pub n_photons: usize,
    /// Whether the most recent frame's parameters validated.
    pub params_valid: bool,
    /// Human-readable status of the most recent frame.
    pub status_msg: String,
    /// Frames handed to the stage, including rejected ones.
    pub frames_processed: u64,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self {
            n_photons: 0,
            params_valid: true,
            status_msg: String::new(),
            frames_processed: 0,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    params: ParameterSet,
    status: StageStatus,
}

/// Thread-safe centroiding stage.
#[derive(Debug, Default)]
pub struct CentroidStage {
    engine: CentroidEngine,
    shared: Mutex<Shared>,
}

impl CentroidStage {
    /// Creates a stage with the given configuration.
    #[must_use]
    pub fn new(params: ParameterSet) -> Self {
        Self {
            engine: CentroidEngine::new(),
            shared: Mutex::new(Shared {
                params,
                status: StageStatus::default(),
            }),
        }
    }

    /// Copy of the current configuration.
    #[must_use]
    pub fn params(&self) -> ParameterSet {
        self.shared.lock().params.clone()
    }

    /// Mutates the configuration; takes effect from the next frame.
    pub fn update<F: FnOnce(&mut ParameterSet)>(&self, f: F) {
        f(&mut self.shared.lock().params);
    }

    /// Sets one parameter by its host-side name.
    pub fn set_named(&self, name: ParameterName, value: f64) {
        self.update(|params| params.set_named(name, value));
    }

    /// Last published status.
    #[must_use]
    pub fn status(&self) -> StageStatus {
        self.shared.lock().status.clone()
    }

    /// Processes one frame.
    ///
    /// Frame dimensions come from the frame itself; the configured
    /// thresholds, boxes and calibration come from the live configuration.
    pub fn process_frame<P: Pixel>(&self, frame: Frame<'_, P>) -> FrameOutput<P> {
        let snapshot = {
            let shared = self.shared.lock();
            shared
                .params
                .clone()
                .with_shape(frame.width(), frame.height(), 1)
        };

        let output = self.engine.process(frame, &snapshot);

        let mut shared = self.shared.lock();
        let status = &mut shared.status;
        status.frames_processed += 1;
        status.n_photons = output.n_photons();
        match &output.status {
            Status::Ok => {
                status.params_valid = true;
                status.status_msg = format!("{} photons", output.n_photons());
            }
            Status::ParameterInvalid(err) => {
                log::warn!("centroid stage: error in parameters: {err}");
                status.params_valid = false;
                status.status_msg = err.to_string();
            }
        }

        output
    }
}
