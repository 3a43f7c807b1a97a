use crate::error::ConfigError;
use serde::Serialize;

/// Closed set of supported single-scattering degradation models.
///
/// Selected once from the operator name when the configuration is resolved;
/// the sampling loop never looks at the name again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DegradationModel {
    /// Distinct attenuation (`phi_a`) and backscatter (`phi_b`) coefficients.
    RevisedUnderwater,
    /// One coefficient (`phi_ab`) drives both attenuation and backscatter.
    SimpleHazeOrUnderwater,
}

impl DegradationModel {
    /// Map an operator name onto a model.
    ///
    /// Names containing `underwater_physical_revised` select the revised
    /// model; otherwise `haze` or `underwater_physical` select the
    /// single-coefficient model.
    pub fn from_operator_name(name: &str) -> Result<Self, ConfigError> {
        if name.contains("underwater_physical_revised") {
            Ok(Self::RevisedUnderwater)
        } else if name.contains("haze") || name.contains("underwater_physical") {
            Ok(Self::SimpleHazeOrUnderwater)
        } else {
            Err(ConfigError::UnknownOperator(name.to_string()))
        }
    }
}
