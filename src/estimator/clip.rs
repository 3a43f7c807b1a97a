use crate::error::ConfigError;
use nalgebra::Vector3;
use serde::Serialize;

/// Symmetric element-wise gradient clamp.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum GradientClip {
    Disabled,
    Enabled { bound: f32 },
}

impl Default for GradientClip {
    fn default() -> Self {
        Self::Disabled
    }
}

impl GradientClip {
    pub fn enabled(bound: f32) -> Result<Self, ConfigError> {
        if !(bound.is_finite() && bound > 0.0) {
            return Err(ConfigError::invalid(
                "conditioning.gradient_clip_bound",
                format!("must be finite and positive, got {bound}"),
            ));
        }
        Ok(Self::Enabled { bound })
    }

    /// Parse the packed form `"true,<bound>"` / `"false"`.
    pub fn parse_packed(packed: &str, fallback_bound: Option<f32>) -> Result<Self, ConfigError> {
        let mut parts = packed.split(',').map(str::trim);
        match parts.next() {
            Some("false") => Ok(Self::Disabled),
            Some("true") => {
                let bound = match parts.next() {
                    Some(b) => b.parse::<f32>().map_err(|e| {
                        ConfigError::invalid("conditioning.gradient_clip", format!("`{b}`: {e}"))
                    })?,
                    None => fallback_bound
                        .ok_or(ConfigError::MissingField("conditioning.gradient_clip_bound"))?,
                };
                Self::enabled(bound)
            }
            _ => Err(ConfigError::invalid(
                "conditioning.gradient_clip",
                format!("expected `true,<bound>` or `false`, got `{packed}`"),
            )),
        }
    }

    #[inline]
    pub fn clip(&self, g: f32) -> f32 {
        match *self {
            Self::Disabled => g,
            Self::Enabled { bound } => g.clamp(-bound, bound),
        }
    }

    pub fn clip_vec(&self, g: Vector3<f32>) -> Vector3<f32> {
        g.map(|v| self.clip(v))
    }

    /// Bound a parameter step to `±bound · lr`. Gradient descent already
    /// satisfies this after [`Self::clip_vec`]; Adam normalizes the gradient
    /// away and needs the step itself clamped.
    pub fn clip_step(&self, delta: Vector3<f32>, lr: f32) -> Vector3<f32> {
        match *self {
            Self::Disabled => delta,
            Self::Enabled { bound } => {
                let limit = bound * lr.abs();
                delta.map(|d| d.clamp(-limit, limit))
            }
        }
    }
}
