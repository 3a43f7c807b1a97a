use crate::depth::DepthConversion;
use crate::error::ConfigError;
use crate::estimator::{EstimatorParams, GradientClip, LossWeight, OptimizerKind};
use serde::Deserialize;

/// `gradient_clip` accepts a bool or the packed string `"true,<bound>"`.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ClipSetting {
    Flag(bool),
    Packed(String),
}

impl Default for ClipSetting {
    fn default() -> Self {
        Self::Flag(false)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConditioningConfig {
    /// Step size of the clean-image update.
    pub scale: f32,
    pub gradient_clip: ClipSetting,
    pub gradient_clip_bound: Option<f32>,
    pub loss_weight: String,
    pub weight_function: Option<String>,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            gradient_clip: ClipSetting::default(),
            gradient_clip_bound: None,
            loss_weight: "none".to_string(),
            weight_function: None,
        }
    }
}

impl ConditioningConfig {
    pub fn clip(&self) -> Result<GradientClip, ConfigError> {
        match &self.gradient_clip {
            ClipSetting::Flag(false) => Ok(GradientClip::Disabled),
            ClipSetting::Flag(true) => GradientClip::enabled(
                self.gradient_clip_bound
                    .ok_or(ConfigError::MissingField("conditioning.gradient_clip_bound"))?,
            ),
            ClipSetting::Packed(packed) => GradientClip::parse_packed(packed, self.gradient_clip_bound),
        }
    }

    pub fn resolve(
        &self,
        depth_conversion: DepthConversion,
        optimizer: OptimizerKind,
    ) -> Result<EstimatorParams, ConfigError> {
        Ok(EstimatorParams {
            image_step: self.scale,
            depth_conversion,
            clip: self.clip()?,
            loss_weight: LossWeight::parse(&self.loss_weight, self.weight_function.as_deref())?,
            optimizer,
        })
    }
}
