//! Boundary to the generative network.
//!
//! The network itself is external. [`Denoiser`] is the one-step interface the
//! orchestrator drives; [`Conditioning`] is the callback the orchestrator
//! hands back so that guidance can replace the clean estimate inside the step.
//! [`DdimSampler`] is a reference denoiser built from any [`CleanPredictor`];
//! [`ScenePredictor`] is one for synthetic scenes.

mod ddim;
mod oracle;

pub use ddim::{CleanPredictor, DdimSampler, DiffusionParams, NoiseSchedule};
pub use oracle::ScenePredictor;

use crate::error::RestoreError;
use crate::image::RgbdImage;

/// Guidance callback invoked once per denoising step.
pub trait Conditioning {
    /// Return the refined clean estimate for timestep `t`. Must not fail for
    /// any in-range timestep unless the inputs themselves are malformed.
    fn condition(
        &mut self,
        x_t: &RgbdImage,
        clean_estimate: &RgbdImage,
        t: usize,
    ) -> Result<RgbdImage, RestoreError>;
}

/// Conditioning that leaves the clean estimate untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unconditioned;

impl Conditioning for Unconditioned {
    fn condition(
        &mut self,
        _x_t: &RgbdImage,
        clean_estimate: &RgbdImage,
        _t: usize,
    ) -> Result<RgbdImage, RestoreError> {
        Ok(clean_estimate.clone())
    }
}

/// Output of one reverse step.
#[derive(Clone, Debug)]
pub struct DenoiseStep {
    /// Noisy state for timestep `t - 1` (the final sample when `t == 0`).
    pub next: RgbdImage,
    /// Clean estimate after conditioning.
    pub clean_estimate: RgbdImage,
    /// Clean estimate as predicted by the network, before conditioning.
    pub unguided_estimate: RgbdImage,
}

/// One-step reverse diffusion. Implementations hold read-only weights and
/// may be shared between threads.
pub trait Denoiser: Send + Sync {
    /// Number of timesteps `T`; sampling runs `t = T - 1, ..., 0`.
    fn num_timesteps(&self) -> usize;

    fn denoise_step(
        &self,
        x_t: &RgbdImage,
        t: usize,
        conditioning: &mut dyn Conditioning,
    ) -> Result<DenoiseStep, RestoreError>;
}
