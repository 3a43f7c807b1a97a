//! Depth-conversion policy.
//!
//! The network emits a raw depth channel in the `[-1, 1]` network domain.
//! Before it enters the physical model it is mapped to a metric-like depth by
//! one of three policies:
//!
//! - `original`: `0.5 · (d + 1)` (undo the network normalization)
//! - `move`: `d + v` (additive offset)
//! - `gamma`: `((d + v0) · v1) ^ v2`
//!
//! The same policies double as per-pixel loss weights (see
//! [`crate::estimator::LossWeight`]). Each policy also exposes its derivative
//! so that guidance gradients can reach the raw depth channel.
use crate::error::ConfigError;
use crate::image::ImageF32;
use serde::{Deserialize, Serialize};

const EPS: f32 = 1e-6;

/// Numeric arguments accepted for a depth conversion.
///
/// Configurations write them as a number, a list, or a comma-separated string
/// (`"0.5,1.0,1.2"`).
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum DepthValues {
    Scalar(f32),
    List(Vec<f32>),
    Text(String),
}

impl DepthValues {
    pub fn to_vec(&self) -> Result<Vec<f32>, ConfigError> {
        match self {
            Self::Scalar(v) => Ok(vec![*v]),
            Self::List(v) => Ok(v.clone()),
            Self::Text(s) => parse_list(s),
        }
    }
}

pub(crate) fn parse_list(s: &str) -> Result<Vec<f32>, ConfigError> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f32>()
                .map_err(|e| ConfigError::invalid("value", format!("`{part}`: {e}")))
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DepthConversion {
    Original,
    Move { offset: f32 },
    Gamma { offset: f32, scale: f32, exponent: f32 },
}

impl DepthConversion {
    /// Resolve a selector and its arguments. `None` selects `original`.
    pub fn parse(selector: Option<&str>, values: &[f32]) -> Result<Self, ConfigError> {
        match selector.map(str::trim) {
            None | Some("original") => Ok(Self::Original),
            Some("move") => match values {
                [offset] => Ok(Self::Move { offset: *offset }),
                _ => Err(ConfigError::invalid(
                    "value",
                    format!("`move` expects one value, got {}", values.len()),
                )),
            },
            Some("gamma") => match values {
                [offset, scale, exponent] => Ok(Self::Gamma {
                    offset: *offset,
                    scale: *scale,
                    exponent: *exponent,
                }),
                _ => Err(ConfigError::invalid(
                    "value",
                    format!("`gamma` expects three values, got {}", values.len()),
                )),
            },
            Some(other) => Err(ConfigError::UnknownDepthType(other.to_string())),
        }
    }

    /// Parse the packed form `"<selector>,<v0>,<v1>,..."`.
    pub fn parse_packed(packed: &str) -> Result<Self, ConfigError> {
        let mut parts = packed.splitn(2, ',');
        let selector = parts.next().map(str::trim).filter(|s| !s.is_empty());
        let values = match parts.next() {
            Some(rest) => parse_list(rest)?,
            None => Vec::new(),
        };
        Self::parse(selector, &values)
    }

    #[inline]
    pub fn apply(&self, d: f32) -> f32 {
        match *self {
            Self::Original => 0.5 * (d + 1.0),
            Self::Move { offset } => d + offset,
            Self::Gamma {
                offset,
                scale,
                exponent,
            } => ((d + offset) * scale).max(0.0).powf(exponent),
        }
    }

    /// d(apply)/dd at `d`.
    #[inline]
    pub fn derivative(&self, d: f32) -> f32 {
        match *self {
            Self::Original => 0.5,
            Self::Move { .. } => 1.0,
            Self::Gamma {
                offset,
                scale,
                exponent,
            } => {
                let base = (d + offset) * scale;
                if base <= EPS {
                    return 0.0;
                }
                let g = exponent * scale * base.powf(exponent - 1.0);
                if g.is_finite() {
                    g
                } else {
                    0.0
                }
            }
        }
    }

    pub fn convert(&self, depth: &ImageF32) -> ImageF32 {
        depth.map(|d| self.apply(d))
    }
}

impl Default for DepthConversion {
    fn default() -> Self {
        Self::Original
    }
}
