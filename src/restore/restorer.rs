//! Sampling loop orchestrator.
//!
//! For every image the restorer prepares the measurement once, then runs
//! `global_N` complete reverse-diffusion passes. Each pass starts from fresh
//! seeded noise while the physical parameters carry over, so later passes
//! refine the estimate of earlier ones. One pass is kept per the configured
//! [`GlobalSelection`].
use super::guidance::PhysicsGuidance;
use super::params::{GlobalSelection, RestoreParams};
use super::result::{final_norm_loss, RestorationReport, RestorationResult};
use super::state::DiffusionState;
use crate::diagnostics::{
    elapsed_ms, GlobalSummary, InputDescriptor, ParameterReport, RunTrace, StepRecord,
    TimingBreakdown,
};
use crate::diffusion::Denoiser;
use crate::error::{ConfigError, RestoreError};
use crate::estimator::ParameterEstimator;
use crate::image::{RgbImage, RgbdImage};
use crate::measurement::Measurement;
use crate::noise::gaussian_planes;
use crate::physics::PhysicalParameters;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Instant;

/// Drives physics-guided sampling for single images and datasets.
#[derive(Clone, Debug)]
pub struct Restorer {
    params: RestoreParams,
}

struct Candidate {
    index: usize,
    sample: RgbdImage,
    parameters: PhysicalParameters,
    losses: Vec<f32>,
    final_loss: f32,
}

impl Restorer {
    pub fn new(params: RestoreParams) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &RestoreParams {
        &self.params
    }

    /// Restore one degraded RGB image given in `[-1, 1]`.
    pub fn restore_image<D: Denoiser + ?Sized>(
        &self,
        denoiser: &D,
        reference: &RgbImage,
    ) -> Result<RestorationReport, RestoreError> {
        let total_start = Instant::now();
        let mut timings = TimingBreakdown::default();
        let total = denoiser.num_timesteps();
        if total == 0 {
            return Err(RestoreError::Denoiser {
                timestep: 0,
                message: "denoiser has no timesteps".to_string(),
            });
        }
        let (w, h) = reference.dims();
        let globals = self.params.pattern.global_iterations();
        log::info!(
            "restoring {}x{} image: {} timesteps, {} global iteration(s)",
            w,
            h,
            total,
            globals
        );

        let stage = Instant::now();
        let measurement = Measurement::prepare(
            reference,
            &self.params.noise,
            self.params.degamma_input,
            self.params.measurement_seed(),
        )?;
        timings.push_since("measurement", stage);

        let mut estimator = ParameterEstimator::new(
            self.params.estimator.clone(),
            self.params.initial_parameters.clone(),
        );
        let mut steps: Vec<StepRecord> = Vec::with_capacity(total * globals);
        let mut summaries = Vec::with_capacity(globals);
        let mut kept: Option<Candidate> = None;

        for g in 0..globals {
            let stage = Instant::now();
            let seed = self.params.global_seed(g);
            let updates_before = estimator.update_count();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = DiffusionState::new(gaussian_planes::<4>(w, h, &mut rng), total);

            let mut guidance =
                PhysicsGuidance::new(&mut estimator, &measurement, &self.params.pattern, total, g);
            while let Some(t) = state.timestep {
                let step = denoiser.denoise_step(&state.x_t, t, &mut guidance)?;
                RestoreError::check_dims((w, h), step.next.dims())?;
                let losses = guidance.drain_losses();
                state.advance(step, losses);
            }
            let records = guidance.into_records();
            let degenerate_steps = records.iter().filter(|r| r.degenerate).count();
            steps.extend(records);

            let sample = state.x_t.clone();
            let final_loss = final_norm_loss(
                &sample,
                estimator.parameters(),
                &self.params.estimator.depth_conversion,
                &measurement,
            )?;
            timings.push_since("sampling", stage);
            log::info!(
                "global iteration {}/{} seed={} final loss {:.5}",
                g + 1,
                globals,
                seed,
                final_loss
            );
            summaries.push(GlobalSummary {
                index: g,
                seed,
                final_norm_loss: final_loss,
                parameter_updates: estimator.update_count() - updates_before,
                degenerate_steps,
            });

            let candidate = Candidate {
                index: g,
                sample,
                parameters: estimator.parameters().clone(),
                losses: state.loss_trajectory,
                final_loss,
            };
            kept = match (kept, self.params.selection) {
                (Some(best), GlobalSelection::LowestResidual)
                    if best.final_loss <= candidate.final_loss =>
                {
                    Some(best)
                }
                _ => Some(candidate),
            };
        }

        let Some(kept) = kept else {
            return Err(RestoreError::Denoiser {
                timestep: 0,
                message: "no global iteration completed".to_string(),
            });
        };

        let stage = Instant::now();
        let result = RestorationResult::assemble(
            &kept.sample,
            kept.parameters,
            &self.params.estimator.depth_conversion,
            &measurement,
            kept.losses,
            kept.index,
        )?;
        timings.push_since("postprocess", stage);
        timings.total_ms = elapsed_ms(total_start);

        for p in result.parameters.iter() {
            log::info!("{} = {:?}", p.name, p.value.as_slice());
        }

        let trace = RunTrace {
            input: InputDescriptor {
                width: w,
                height: h,
                timesteps: total,
                global_iterations: globals,
            },
            timings,
            parameters: ParameterReport::compare(&self.params.initial_parameters, &result.parameters),
            steps,
            globals: summaries,
            selected_global: kept.index,
        };
        let degraded =
            !result.final_norm_loss.is_finite() || trace.selected_steps().any(|s| s.degenerate);
        if degraded {
            log::warn!(
                "restoration degraded: final loss {}, {} degenerate step(s)",
                result.final_norm_loss,
                trace.degenerate_steps()
            );
        }
        Ok(RestorationReport {
            result,
            trace,
            degraded,
            ground_truth: None,
        })
    }
}
