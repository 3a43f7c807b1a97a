use crate::diffusion::DenoiseStep;
use crate::image::RgbdImage;

/// Mutable state of one reverse-diffusion run, owned by the restorer.
#[derive(Clone, Debug)]
pub struct DiffusionState {
    /// Current noisy state `x_t`; after the last step, the final sample.
    pub x_t: RgbdImage,
    /// Clean estimate produced by the last step.
    pub clean_estimate: Option<RgbdImage>,
    /// Next timestep to process; `None` once sampling reached `t = 0`.
    pub timestep: Option<usize>,
    /// Residual of every refine call, in execution order.
    pub loss_trajectory: Vec<f32>,
}

impl DiffusionState {
    pub fn new(x_t: RgbdImage, total: usize) -> Self {
        Self {
            x_t,
            clean_estimate: None,
            timestep: total.checked_sub(1),
            loss_trajectory: Vec::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.timestep.is_none()
    }

    /// Apply the output of the step at the current timestep.
    pub fn advance(&mut self, step: DenoiseStep, losses: impl IntoIterator<Item = f32>) {
        self.x_t = step.next;
        self.clean_estimate = Some(step.clean_estimate);
        self.loss_trajectory.extend(losses);
        self.timestep = self.timestep.and_then(|t| t.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_to_done() {
        let mut state = DiffusionState::new(RgbdImage::zeros(1, 1), 2);
        assert_eq!(state.timestep, Some(1));
        for expected in [Some(0), None] {
            let step = DenoiseStep {
                next: RgbdImage::filled(1, 1, 0.5),
                clean_estimate: RgbdImage::filled(1, 1, 0.5),
                unguided_estimate: RgbdImage::zeros(1, 1),
            };
            state.advance(step, [1.0]);
            assert_eq!(state.timestep, expected);
        }
        assert!(state.is_done());
        assert_eq!(state.loss_trajectory, vec![1.0, 1.0]);
        assert!(DiffusionState::new(RgbdImage::zeros(1, 1), 0).is_done());
    }
}
