//! JSON configuration.
//!
//! [`RestorationConfig`] mirrors the file layout and is deserialized with
//! `serde_json`; every section rejects unknown fields. [`RestorationConfig::resolve`]
//! parses all selector strings into closed enums and validates the schedule,
//! producing the immutable [`RestoreParams`] used by the restorer.

pub mod conditioning;
pub mod demo;
pub mod operator;
pub mod pattern;

pub use conditioning::{ClipSetting, ConditioningConfig};
pub use operator::{ChannelValue, MeasurementConfig, NoiseConfig, OperatorConfig};
pub use pattern::SamplePatternConfig;

use crate::diffusion::DiffusionParams;
use crate::error::ConfigError;
use crate::restore::{GlobalSelection, RestoreParams};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub stop_after: Option<usize>,
    pub parallel: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RestorationConfig {
    #[serde(default)]
    pub manual_seed: u64,
    #[serde(default)]
    pub degamma_input: bool,
    #[serde(default)]
    pub global_selection: Option<String>,
    #[serde(default)]
    pub data: DataConfig,
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub conditioning: ConditioningConfig,
    #[serde(default)]
    pub sample_pattern: SamplePatternConfig,
    #[serde(default)]
    pub diffusion: DiffusionParams,
}

impl RestorationConfig {
    pub fn resolve(&self) -> Result<RestoreParams, ConfigError> {
        let operator = &self.measurement.operator;
        let initial_parameters = operator.parameters()?;
        let estimator = self
            .conditioning
            .resolve(operator.depth_conversion()?, operator.optimizer()?)?;
        let pattern = self.sample_pattern.resolve()?;
        let selection = self
            .global_selection
            .as_deref()
            .map_or(Ok(GlobalSelection::Last), GlobalSelection::parse)?;

        let params = RestoreParams {
            initial_parameters,
            estimator,
            pattern,
            noise: self.measurement.noise.resolve()?,
            degamma_input: self.degamma_input,
            manual_seed: self.manual_seed,
            selection,
            stop_after: self.data.stop_after,
            parallel: self.data.parallel,
            diffusion: self.diffusion.clone(),
        };
        params.validate()?;
        log::debug!(
            "resolved config: model={:?} pattern={:?}",
            params.initial_parameters.model(),
            params.pattern
        );
        Ok(params)
    }
}

/// Read and deserialize a JSON config file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&contents)
        .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))
}

pub fn load_config(path: &Path) -> Result<RestorationConfig, ConfigError> {
    load_json(path)
}

/// Parse and resolve a configuration held in memory.
pub fn resolve_str(json: &str) -> Result<RestoreParams, ConfigError> {
    let config: RestorationConfig =
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::DepthConversion;
    use crate::estimator::{GradientClip, LossWeight, OptimizerKind};
    use crate::physics::{DegradationModel, PhysicalParameters};
    use crate::schedule::SamplePattern;

    const PCGS: &str = r#"{
        "manual_seed": 3,
        "measurement": {
            "operator": {
                "name": "underwater_physical_revised",
                "depth_type": "gamma",
                "value": "0.5,1.0,1.2",
                "phi_a": [0.3, 0.2, 0.1], "phi_a_eta": 1e-3,
                "phi_b": 0.4, "phi_b_eta": 1e-3,
                "phi_inf": [0.1, 0.5, 0.6], "phi_inf_eta": 1e-2,
                "optimizer": "adam"
            },
            "noise": { "name": "gaussian", "sigma": 0.01 }
        },
        "conditioning": {
            "scale": 0.5,
            "gradient_clip": "true,0.05",
            "loss_weight": "depth",
            "weight_function": "move,1.0"
        },
        "sample_pattern": {
            "pattern": "pcgs",
            "global_N": 2, "local_M": 3,
            "start_guidance": 0.8, "stop_guidance": 0.2,
            "update_start": 0.7, "update_end": 0.3,
            "s_start": 0.75, "s_end": 0.25
        },
        "diffusion": { "steps": 20 }
    }"#;

    #[test]
    fn full_config_resolves() {
        let params = resolve_str(PCGS).unwrap();
        assert_eq!(params.manual_seed, 3);
        assert_eq!(
            params.initial_parameters.model(),
            DegradationModel::RevisedUnderwater
        );
        let phi_b = params.initial_parameters.get("phi_b").unwrap();
        assert_eq!(phi_b.value, nalgebra::Vector3::repeat(0.4));
        assert_eq!(
            params.estimator.depth_conversion,
            DepthConversion::Gamma {
                offset: 0.5,
                scale: 1.0,
                exponent: 1.2
            }
        );
        assert_eq!(params.estimator.clip, GradientClip::Enabled { bound: 0.05 });
        assert_eq!(
            params.estimator.loss_weight,
            LossWeight::Depth {
                function: DepthConversion::Move { offset: 1.0 }
            }
        );
        assert_eq!(params.estimator.optimizer, OptimizerKind::Adam);
        assert_eq!(params.pattern.global_iterations(), 2);
        assert_eq!(params.diffusion.steps, 20);
        assert!(matches!(params.pattern, SamplePattern::Pcgs(_)));
    }

    #[test]
    fn minimal_haze_config_uses_defaults() {
        let params = resolve_str(
            r#"{ "measurement": { "operator": {
                "name": "haze", "phi_ab": 0.1, "phi_ab_eta": 0.0,
                "phi_inf": 0.8, "phi_inf_eta": 0.0 } } }"#,
        )
        .unwrap();
        assert!(matches!(
            params.initial_parameters,
            PhysicalParameters::SimpleHazeOrUnderwater { .. }
        ));
        assert_eq!(params.pattern, SamplePattern::Original);
        assert_eq!(params.estimator.depth_conversion, DepthConversion::Original);
        assert_eq!(params.selection, GlobalSelection::Last);
    }

    #[test]
    fn unknown_selectors_are_fatal() {
        let bad_pattern = PCGS.replace("\"pcgs\"", "\"dps\"");
        assert!(matches!(
            resolve_str(&bad_pattern),
            Err(ConfigError::UnknownPattern(_))
        ));
        let bad_depth = PCGS.replace("\"gamma\"", "\"log\"");
        assert!(matches!(
            resolve_str(&bad_depth),
            Err(ConfigError::UnknownDepthType(_))
        ));
        let bad_model = PCGS.replace("underwater_physical_revised", "motion_blur");
        assert!(matches!(
            resolve_str(&bad_model),
            Err(ConfigError::UnknownOperator(_))
        ));
    }

    #[test]
    fn schedule_violation_and_unknown_field_are_rejected() {
        let reversed = PCGS.replace("\"update_end\": 0.3", "\"update_end\": 0.72");
        assert!(matches!(
            resolve_str(&reversed),
            Err(ConfigError::ScheduleOrder(_))
        ));
        let typo = PCGS.replace("\"scale\"", "\"scael\"");
        assert!(matches!(resolve_str(&typo), Err(ConfigError::Parse(_))));
        let missing = PCGS.replace("\"phi_b\": 0.4, ", "");
        assert!(matches!(
            resolve_str(&missing),
            Err(ConfigError::MissingField("measurement.operator.phi_b"))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Path::new("/nonexistent/osmosis.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
