use crate::depth::{DepthConversion, DepthValues};
use crate::error::ConfigError;
use crate::estimator::OptimizerKind;
use crate::noise::NoiseModel;
use crate::physics::{DegradationModel, Parameter, PhysicalParameters};
use nalgebra::Vector3;
use serde::Deserialize;

/// A parameter value: one scalar broadcast to RGB, or one value per channel.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(untagged)]
pub enum ChannelValue {
    Scalar(f32),
    Rgb([f32; 3]),
}

impl ChannelValue {
    pub fn to_vector(self) -> Vector3<f32> {
        match self {
            Self::Scalar(v) => Vector3::repeat(v),
            Self::Rgb([r, g, b]) => Vector3::new(r, g, b),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorConfig {
    pub name: String,
    #[serde(default)]
    pub depth_type: Option<String>,
    #[serde(default)]
    pub value: Option<DepthValues>,
    #[serde(default)]
    pub phi_a: Option<ChannelValue>,
    #[serde(default)]
    pub phi_a_eta: Option<f32>,
    #[serde(default)]
    pub phi_b: Option<ChannelValue>,
    #[serde(default)]
    pub phi_b_eta: Option<f32>,
    #[serde(default)]
    pub phi_ab: Option<ChannelValue>,
    #[serde(default)]
    pub phi_ab_eta: Option<f32>,
    #[serde(default)]
    pub phi_inf: Option<ChannelValue>,
    #[serde(default)]
    pub phi_inf_eta: Option<f32>,
    #[serde(default)]
    pub optimizer: Option<String>,
}

fn parameter(
    name: &'static str,
    value: Option<ChannelValue>,
    value_field: &'static str,
    lr: Option<f32>,
    lr_field: &'static str,
) -> Result<Parameter, ConfigError> {
    let value = value.ok_or(ConfigError::MissingField(value_field))?;
    let lr = lr.ok_or(ConfigError::MissingField(lr_field))?;
    Ok(Parameter::new(name, value.to_vector(), lr))
}

impl OperatorConfig {
    pub fn model(&self) -> Result<DegradationModel, ConfigError> {
        DegradationModel::from_operator_name(&self.name)
    }

    /// Initial parameter set for the selected model.
    pub fn parameters(&self) -> Result<PhysicalParameters, ConfigError> {
        let phi_inf = || {
            parameter(
                "phi_inf",
                self.phi_inf,
                "measurement.operator.phi_inf",
                self.phi_inf_eta,
                "measurement.operator.phi_inf_eta",
            )
        };
        match self.model()? {
            DegradationModel::RevisedUnderwater => Ok(PhysicalParameters::RevisedUnderwater {
                phi_a: parameter(
                    "phi_a",
                    self.phi_a,
                    "measurement.operator.phi_a",
                    self.phi_a_eta,
                    "measurement.operator.phi_a_eta",
                )?,
                phi_b: parameter(
                    "phi_b",
                    self.phi_b,
                    "measurement.operator.phi_b",
                    self.phi_b_eta,
                    "measurement.operator.phi_b_eta",
                )?,
                phi_inf: phi_inf()?,
            }),
            DegradationModel::SimpleHazeOrUnderwater => {
                Ok(PhysicalParameters::SimpleHazeOrUnderwater {
                    phi_ab: parameter(
                        "phi_ab",
                        self.phi_ab,
                        "measurement.operator.phi_ab",
                        self.phi_ab_eta,
                        "measurement.operator.phi_ab_eta",
                    )?,
                    phi_inf: phi_inf()?,
                })
            }
        }
    }

    pub fn depth_conversion(&self) -> Result<DepthConversion, ConfigError> {
        let values = match &self.value {
            Some(v) => v.to_vec()?,
            None => Vec::new(),
        };
        DepthConversion::parse(self.depth_type.as_deref(), &values)
    }

    pub fn optimizer(&self) -> Result<OptimizerKind, ConfigError> {
        self.optimizer
            .as_deref()
            .map_or(Ok(OptimizerKind::GradientDescent), OptimizerKind::parse)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoiseConfig {
    pub name: String,
    #[serde(default)]
    pub sigma: Option<f32>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            name: "clean".to_string(),
            sigma: None,
        }
    }
}

impl NoiseConfig {
    pub fn resolve(&self) -> Result<NoiseModel, ConfigError> {
        NoiseModel::parse(&self.name, self.sigma)
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MeasurementConfig {
    pub operator: OperatorConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
}
