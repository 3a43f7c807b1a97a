#![doc = include_str!("../README.md")]

// Public modules (stable-ish surface)
pub mod config;
pub mod diagnostics;
pub mod diffusion;
pub mod error;
pub mod image;
pub mod restore;
pub mod schedule;

// Building blocks of the guidance step, public for tools and tests.
pub mod depth;
pub mod estimator;
pub mod measurement;
pub mod noise;
pub mod physics;

// --- High-level re-exports -------------------------------------------------

// Main entry points: restorer + results.
pub use crate::restore::{
    DatasetItem, GlobalSelection, ItemOutcome, RestorationReport, RestorationResult,
    RestoreParams, Restorer,
};

// Generative-network boundary.
pub use crate::diffusion::{CleanPredictor, Conditioning, DdimSampler, Denoiser};

pub use crate::error::{ConfigError, RestoreError};
pub use crate::schedule::{decide, GuidanceDecision, SamplePattern};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use osmosis::prelude::*;
/// use std::path::Path;
///
/// struct Identity;
///
/// impl CleanPredictor for Identity {
///     fn predict_clean(&self, x_t: &RgbdImage, _t: usize) -> Result<RgbdImage, RestoreError> {
///         Ok(x_t.clone())
///     }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let params = load_config(Path::new("restore.json"))?.resolve()?;
/// let sampler = DdimSampler::new(Identity, &params.diffusion);
/// let restorer = Restorer::new(params)?;
///
/// let degraded = RgbImage::filled(64, 48, 0.0);
/// let report = restorer.restore_image(&sampler, &degraded)?;
/// println!("loss={:.4} degraded={}", report.result.final_norm_loss, report.degraded);
/// # Ok(())
/// # }
/// ```
pub mod prelude {
    pub use crate::config::load_config;
    pub use crate::image::{ImageF32, RgbImage, RgbdImage};
    pub use crate::{
        CleanPredictor, ConfigError, DdimSampler, Denoiser, RestorationReport, RestoreError,
        Restorer,
    };
}

// --- Stage-level diagnostics API (for tools & advanced users) --------------

pub mod stages {
    // Single-step building blocks.
    pub use crate::estimator::{ParameterEstimator, RefineOutcome};
    pub use crate::measurement::Measurement;
    pub use crate::physics::{backpropagate, forward, invert, Degradation};
    pub use crate::restore::{DiffusionState, PhysicsGuidance};

    // Structured diagnostics types.
    pub use crate::diagnostics::{
        GlobalSummary, InputDescriptor, ParameterEntry, ParameterReport, RunTrace, StageTiming,
        StepRecord, TimingBreakdown,
    };
}
