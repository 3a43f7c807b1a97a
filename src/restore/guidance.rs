//! Physics guidance plugged into the denoiser as its conditioning callback.
use crate::diagnostics::StepRecord;
use crate::diffusion::Conditioning;
use crate::error::RestoreError;
use crate::estimator::ParameterEstimator;
use crate::image::RgbdImage;
use crate::measurement::Measurement;
use crate::schedule::{self, SamplePattern};

pub struct PhysicsGuidance<'a> {
    estimator: &'a mut ParameterEstimator,
    measurement: &'a Measurement,
    pattern: &'a SamplePattern,
    total: usize,
    global_iteration: usize,
    records: Vec<StepRecord>,
    pending_losses: Vec<f32>,
}

impl<'a> PhysicsGuidance<'a> {
    pub fn new(
        estimator: &'a mut ParameterEstimator,
        measurement: &'a Measurement,
        pattern: &'a SamplePattern,
        total: usize,
        global_iteration: usize,
    ) -> Self {
        Self {
            estimator,
            measurement,
            pattern,
            total,
            global_iteration,
            records: Vec::with_capacity(total),
            pending_losses: Vec::new(),
        }
    }

    /// Residuals produced since the last call.
    pub fn drain_losses(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.pending_losses)
    }

    pub fn into_records(self) -> Vec<StepRecord> {
        self.records
    }
}

impl Conditioning for PhysicsGuidance<'_> {
    fn condition(
        &mut self,
        _x_t: &RgbdImage,
        clean_estimate: &RgbdImage,
        t: usize,
    ) -> Result<RgbdImage, RestoreError> {
        let decision = schedule::decide(self.pattern, t, self.total);
        let (iterations, update_params) = decision.refine_plan();

        let mut estimate = clean_estimate.clone();
        let mut residual = None;
        let mut degenerate = false;
        let mut executed = 0;
        for _ in 0..iterations {
            let out = self
                .estimator
                .refine(&estimate, self.measurement, update_params)?;
            executed += 1;
            residual = Some(out.residual);
            self.pending_losses.push(out.residual);
            if out.degenerate {
                degenerate = true;
                break;
            }
            estimate = out.estimate;
        }

        log::debug!(
            "t={} decision={:?} iterations={} residual={:?}",
            t,
            decision,
            executed,
            residual
        );
        self.records.push(StepRecord {
            global_iteration: self.global_iteration,
            timestep: t,
            decision,
            iterations: executed,
            residual,
            degenerate,
        });
        Ok(estimate)
    }
}
