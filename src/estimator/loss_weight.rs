use crate::depth::DepthConversion;
use crate::error::ConfigError;
use crate::image::ImageF32;
use serde::Serialize;

/// Per-pixel weight applied to the residual.
///
/// `Depth` evaluates a depth conversion on the raw depth channel so that far
/// pixels, whose gradients are damped by attenuation, count for more. The
/// weight is treated as a constant during the reverse pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LossWeight {
    None,
    Depth { function: DepthConversion },
}

impl Default for LossWeight {
    fn default() -> Self {
        Self::None
    }
}

impl LossWeight {
    pub fn parse(name: &str, weight_function: Option<&str>) -> Result<Self, ConfigError> {
        match name {
            "none" => Ok(Self::None),
            "depth" => {
                let packed = weight_function
                    .ok_or(ConfigError::MissingField("conditioning.weight_function"))?;
                Ok(Self::Depth {
                    function: DepthConversion::parse_packed(packed)?,
                })
            }
            other => Err(ConfigError::UnknownLossWeight(other.to_string())),
        }
    }

    /// Weight map for a raw depth channel, or `None` for unit weights.
    pub fn weights(&self, raw_depth: &ImageF32) -> Option<ImageF32> {
        match self {
            Self::None => None,
            Self::Depth { function } => Some(raw_depth.map(|d| {
                let w = function.apply(d);
                if w.is_finite() {
                    w
                } else {
                    0.0
                }
            })),
        }
    }
}
