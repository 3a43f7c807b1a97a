//! Sampling loop orchestration: restorer, per-image results and the dataset
//! driver.

mod dataset;
mod guidance;
mod params;
mod restorer;
mod result;
mod state;

pub use dataset::{DatasetItem, GroundTruthSource, ItemOutcome};
pub use guidance::PhysicsGuidance;
pub use params::{GlobalSelection, RestoreParams};
pub use restorer::Restorer;
pub use result::{
    final_norm_loss, GroundTruth, RestorationReport, RestorationResult, DEPTH_PERCENTILE_HIGH,
    DEPTH_PERCENTILE_LOW,
};
pub use state::DiffusionState;
