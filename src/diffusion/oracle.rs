//! Predictor for synthetic runs where the clean scene is known.
use super::ddim::{CleanPredictor, DiffusionParams, NoiseSchedule};
use crate::error::RestoreError;
use crate::image::RgbdImage;

/// Predicts `√ᾱ_t · scene + (1 − √ᾱ_t) · x_t`: exact at low noise, vague at
/// high noise. Stands in for a trained network in demos and tests.
#[derive(Clone, Debug)]
pub struct ScenePredictor {
    scene: RgbdImage,
    schedule: NoiseSchedule,
}

impl ScenePredictor {
    pub fn new(scene: RgbdImage, diffusion: &DiffusionParams) -> Self {
        Self {
            scene,
            schedule: NoiseSchedule::linear(diffusion.steps, diffusion.beta_start, diffusion.beta_end),
        }
    }
}

impl CleanPredictor for ScenePredictor {
    fn predict_clean(&self, x_t: &RgbdImage, t: usize) -> Result<RgbdImage, RestoreError> {
        RestoreError::check_dims(self.scene.dims(), x_t.dims())?;
        let k = self.schedule.alpha_bar(Some(t)).sqrt() as f32;
        Ok(self.scene.zip_map(x_t, |s, x| k * s + (1.0 - k) * x))
    }
}
