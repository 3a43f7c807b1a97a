//! Update rules for the physical parameters.
use crate::error::ConfigError;
use nalgebra::Vector3;
use serde::Serialize;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const ADAM_EPS: f32 = 1e-8;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OptimizerKind {
    #[default]
    GradientDescent,
    Adam,
}

impl OptimizerKind {
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name {
            "gd" | "sgd" => Ok(Self::GradientDescent),
            "adam" => Ok(Self::Adam),
            other => Err(ConfigError::UnknownOptimizer(other.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Moments {
    m: Vector3<f32>,
    v: Vector3<f32>,
}

/// Per-parameter optimizer state. Slots are indexed in the stable order of
/// [`crate::physics::PhysicalParameters::with_gradients`].
#[derive(Clone, Debug)]
pub struct ParamOptimizer {
    kind: OptimizerKind,
    step: i32,
    moments: Vec<Moments>,
}

impl ParamOptimizer {
    pub fn new(kind: OptimizerKind, slots: usize) -> Self {
        Self {
            kind,
            step: 0,
            moments: vec![Moments::default(); slots],
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    /// Start a new update round; Adam bias correction counts rounds.
    pub fn begin_step(&mut self) {
        self.step = self.step.saturating_add(1);
    }

    /// Delta to add to parameter `slot` for the (already clipped) gradient.
    pub fn delta(&mut self, slot: usize, lr: f32, grad: Vector3<f32>) -> Vector3<f32> {
        match self.kind {
            OptimizerKind::GradientDescent => -grad * lr,
            OptimizerKind::Adam => {
                let t = self.step.max(1);
                let Some(state) = self.moments.get_mut(slot) else {
                    return -grad * lr;
                };
                state.m = state.m * BETA1 + grad * (1.0 - BETA1);
                state.v = state.v * BETA2 + grad.component_mul(&grad) * (1.0 - BETA2);
                let m_hat = state.m / (1.0 - BETA1.powi(t));
                let v_hat = state.v / (1.0 - BETA2.powi(t));
                -m_hat.zip_map(&v_hat, |m, v| lr * m / (v.sqrt() + ADAM_EPS))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_descent_scales_by_lr() {
        let mut opt = ParamOptimizer::new(OptimizerKind::GradientDescent, 1);
        opt.begin_step();
        let d = opt.delta(0, 0.1, Vector3::new(1.0, -2.0, 0.0));
        assert_eq!(d, Vector3::new(-0.1, 0.2, 0.0));
    }

    #[test]
    fn first_adam_step_has_magnitude_lr() {
        let mut opt = ParamOptimizer::new(OptimizerKind::Adam, 2);
        opt.begin_step();
        let d = opt.delta(1, 0.01, Vector3::new(5.0, -0.3, 0.0));
        assert!((d[0] + 0.01).abs() < 1e-5, "{d:?}");
        assert!((d[1] - 0.01).abs() < 1e-5, "{d:?}");
        assert_eq!(d[2], 0.0);
    }

    #[test]
    fn sgd_alias_and_unknown_name() {
        assert_eq!(OptimizerKind::parse("sgd").unwrap(), OptimizerKind::GradientDescent);
        assert!(matches!(
            OptimizerKind::parse("lbfgs"),
            Err(ConfigError::UnknownOptimizer(_))
        ));
    }
}
