//! Configuration of the `synthetic_demo` binary.
use super::RestorationConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Ground-truth scene the demo degrades and then restores.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    pub width: usize,
    pub height: usize,
    /// Coefficients used to synthesize the measurement.
    pub phi_a: [f32; 3],
    pub phi_b: [f32; 3],
    pub phi_inf: [f32; 3],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 48,
            phi_a: [0.45, 0.18, 0.12],
            phi_b: [0.35, 0.3, 0.25],
            phi_inf: [0.1, 0.45, 0.55],
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoOutputConfig {
    pub dir: PathBuf,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoConfig {
    #[serde(default)]
    pub scene: SceneConfig,
    pub restoration: RestorationConfig,
    pub output: DemoOutputConfig,
}
