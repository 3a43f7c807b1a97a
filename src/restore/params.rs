use crate::diffusion::DiffusionParams;
use crate::error::ConfigError;
use crate::estimator::EstimatorParams;
use crate::noise::NoiseModel;
use crate::physics::PhysicalParameters;
use crate::schedule::SamplePattern;
use serde::Serialize;

/// How the kept result is chosen among global iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GlobalSelection {
    #[default]
    Last,
    LowestResidual,
}

impl GlobalSelection {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "last" => Ok(Self::Last),
            "lowest_residual" => Ok(Self::LowestResidual),
            other => Err(ConfigError::UnknownSelection(other.to_string())),
        }
    }
}

/// Immutable, validated parameters of a restoration run.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreParams {
    /// Starting values and learning rates; copied into every image's estimator.
    pub initial_parameters: PhysicalParameters,
    pub estimator: EstimatorParams,
    pub pattern: SamplePattern,
    pub noise: NoiseModel,
    pub degamma_input: bool,
    pub manual_seed: u64,
    pub selection: GlobalSelection,
    /// Process at most this many dataset items.
    pub stop_after: Option<usize>,
    /// Restore dataset items concurrently (requires the `parallel` feature).
    pub parallel: bool,
    /// Settings for the reference DDIM sampler.
    pub diffusion: DiffusionParams,
}

impl RestoreParams {
    pub fn new(initial_parameters: PhysicalParameters, pattern: SamplePattern) -> Self {
        Self {
            initial_parameters,
            estimator: EstimatorParams::default(),
            pattern,
            noise: NoiseModel::Clean,
            degamma_input: false,
            manual_seed: 0,
            selection: GlobalSelection::Last,
            stop_after: None,
            parallel: false,
            diffusion: DiffusionParams::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pattern.validate()?;
        self.diffusion.validate()?;
        if !self.estimator.image_step.is_finite() {
            return Err(ConfigError::invalid(
                "conditioning.scale",
                format!("must be finite, got {}", self.estimator.image_step),
            ));
        }
        for p in self.initial_parameters.iter() {
            if !(p.lr.is_finite() && p.value.iter().all(|v| v.is_finite())) {
                return Err(ConfigError::invalid(
                    "measurement.operator",
                    format!("parameter {} must be finite", p.name),
                ));
            }
        }
        Ok(())
    }

    /// Seed of the initial noise for global iteration `g`.
    pub fn global_seed(&self, g: usize) -> u64 {
        self.manual_seed.wrapping_add(g as u64)
    }

    /// Seed of the one-off measurement noise, decorrelated from the sampling
    /// seeds.
    pub fn measurement_seed(&self) -> u64 {
        self.manual_seed ^ 0x9E37_79B9_7F4A_7C15
    }
}
