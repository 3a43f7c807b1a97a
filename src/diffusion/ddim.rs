//! Deterministic DDIM (η = 0) over a clean-image predictor.
use super::{Conditioning, DenoiseStep, Denoiser};
use crate::error::{ConfigError, RestoreError};
use crate::image::RgbdImage;
use serde::{Deserialize, Serialize};

/// Sampler settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffusionParams {
    pub steps: usize,
    pub beta_start: f64,
    pub beta_end: f64,
    /// Clamp the predicted clean image to `[-1, 1]` before conditioning.
    pub clip_denoised: bool,
}

impl Default for DiffusionParams {
    fn default() -> Self {
        Self {
            steps: 100,
            beta_start: 1e-4,
            beta_end: 0.02,
            clip_denoised: true,
        }
    }
}

impl DiffusionParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steps == 0 {
            return Err(ConfigError::invalid("diffusion.steps", "must be at least 1"));
        }
        if !(self.beta_start > 0.0 && self.beta_start <= self.beta_end) {
            return Err(ConfigError::invalid(
                "diffusion.beta_start",
                format!(
                    "expected 0 < beta_start <= beta_end, got {} / {}",
                    self.beta_start, self.beta_end
                ),
            ));
        }
        Ok(())
    }
}

/// Cumulative noise schedule `ᾱ_t`.
#[derive(Clone, Debug)]
pub struct NoiseSchedule {
    alphas_cumprod: Vec<f64>,
}

impl NoiseSchedule {
    /// Linear betas, rescaled so that schedules with fewer than 1000 steps
    /// cover the same noise range.
    pub fn linear(steps: usize, beta_start: f64, beta_end: f64) -> Self {
        let scale = 1000.0 / steps.max(1) as f64;
        let (b0, b1) = (scale * beta_start, (scale * beta_end).min(0.999));
        let mut alphas_cumprod = Vec::with_capacity(steps);
        let mut acc = 1.0f64;
        for i in 0..steps {
            let frac = if steps > 1 {
                i as f64 / (steps - 1) as f64
            } else {
                0.0
            };
            let beta = (b0 + (b1 - b0) * frac).clamp(0.0, 0.999);
            acc *= 1.0 - beta;
            alphas_cumprod.push(acc);
        }
        Self { alphas_cumprod }
    }

    pub fn len(&self) -> usize {
        self.alphas_cumprod.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alphas_cumprod.is_empty()
    }

    /// `ᾱ_t`; `ᾱ_{-1}` is 1.
    pub fn alpha_bar(&self, t: Option<usize>) -> f64 {
        match t {
            Some(t) => self.alphas_cumprod.get(t).copied().unwrap_or(0.0),
            None => 1.0,
        }
    }
}

/// Network that predicts the clean image `x̂₀` from `x_t`.
pub trait CleanPredictor: Send + Sync {
    fn predict_clean(&self, x_t: &RgbdImage, t: usize) -> Result<RgbdImage, RestoreError>;
}

pub struct DdimSampler<P> {
    predictor: P,
    schedule: NoiseSchedule,
    clip_denoised: bool,
}

impl<P: CleanPredictor> DdimSampler<P> {
    pub fn new(predictor: P, params: &DiffusionParams) -> Self {
        Self {
            predictor,
            schedule: NoiseSchedule::linear(params.steps, params.beta_start, params.beta_end),
            clip_denoised: params.clip_denoised,
        }
    }

    pub fn schedule(&self) -> &NoiseSchedule {
        &self.schedule
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }
}

impl<P: CleanPredictor> Denoiser for DdimSampler<P> {
    fn num_timesteps(&self) -> usize {
        self.schedule.len()
    }

    fn denoise_step(
        &self,
        x_t: &RgbdImage,
        t: usize,
        conditioning: &mut dyn Conditioning,
    ) -> Result<DenoiseStep, RestoreError> {
        if t >= self.schedule.len() {
            return Err(RestoreError::Denoiser {
                timestep: t,
                message: format!("timestep outside schedule of {}", self.schedule.len()),
            });
        }
        let mut x0 = self.predictor.predict_clean(x_t, t)?;
        RestoreError::check_dims(x_t.dims(), x0.dims())?;
        if self.clip_denoised {
            x0 = x0.map(|v| v.clamp(-1.0, 1.0));
        }

        let ab = self.schedule.alpha_bar(Some(t));
        let ab_prev = self.schedule.alpha_bar(t.checked_sub(1));
        let (sa, sna) = (ab.sqrt() as f32, (1.0 - ab).max(1e-12).sqrt() as f32);
        let eps = x_t.zip_map(&x0, |x, c| (x - sa * c) / sna);

        let refined = conditioning.condition(x_t, &x0, t)?;
        RestoreError::check_dims(x_t.dims(), refined.dims())?;

        let (sp, snp) = (ab_prev.sqrt() as f32, (1.0 - ab_prev).max(0.0).sqrt() as f32);
        let next = refined.zip_map(&eps, |c, e| sp * c + snp * e);
        Ok(DenoiseStep {
            next,
            clean_estimate: refined,
            unguided_estimate: x0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diffusion::Unconditioned;

    struct Constant(RgbdImage);

    impl CleanPredictor for Constant {
        fn predict_clean(&self, _x_t: &RgbdImage, _t: usize) -> Result<RgbdImage, RestoreError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn linear_schedule_decreases_from_near_one() {
        let s = NoiseSchedule::linear(50, 1e-4, 0.02);
        assert_eq!(s.len(), 50);
        assert!(s.alpha_bar(Some(0)) > 0.99);
        assert!(s.alpha_bar(Some(49)) < 0.05);
        for t in 1..50 {
            assert!(s.alpha_bar(Some(t)) < s.alpha_bar(Some(t - 1)));
        }
        assert_eq!(s.alpha_bar(None), 1.0);
    }

    #[test]
    fn last_step_returns_the_clean_estimate() {
        let clean = RgbdImage::filled(3, 3, 0.25);
        let sampler = DdimSampler::new(
            Constant(clean.clone()),
            &DiffusionParams {
                steps: 10,
                ..Default::default()
            },
        );
        let mut x = RgbdImage::filled(3, 3, 0.9);
        for t in (0..sampler.num_timesteps()).rev() {
            let step = sampler.denoise_step(&x, t, &mut Unconditioned).unwrap();
            assert_eq!(step.clean_estimate, clean);
            x = step.next;
        }
        assert!(x.max_abs_diff(&clean) < 1e-6);
    }

    #[test]
    fn out_of_range_timestep_is_a_denoiser_error() {
        let sampler = DdimSampler::new(
            Constant(RgbdImage::zeros(2, 2)),
            &DiffusionParams {
                steps: 4,
                ..Default::default()
            },
        );
        let err = sampler
            .denoise_step(&RgbdImage::zeros(2, 2), 4, &mut Unconditioned)
            .unwrap_err();
        assert!(matches!(err, RestoreError::Denoiser { timestep: 4, .. }));
    }
}
