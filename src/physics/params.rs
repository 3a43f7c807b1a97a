//! Learnable physical parameters.
//!
//! Every parameter is a per-channel RGB vector with its own learning rate.
//! Scalars from the configuration are broadcast to all three channels.
use super::forward::Coefficients;
use super::DegradationModel;
use nalgebra::Vector3;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: &'static str,
    pub value: Vector3<f32>,
    pub lr: f32,
}

impl Parameter {
    pub fn new(name: &'static str, value: Vector3<f32>, lr: f32) -> Self {
        Self { name, value, lr }
    }
}

/// Per-channel gradients of the loss with respect to the effective
/// coefficients of the forward model.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CoefficientGradients {
    pub attenuation: Vector3<f32>,
    pub backscatter: Vector3<f32>,
    pub veiling_light: Vector3<f32>,
}

/// Parameter set of one restoration run, shaped by the degradation model.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "model", rename_all = "camelCase")]
pub enum PhysicalParameters {
    RevisedUnderwater {
        phi_a: Parameter,
        phi_b: Parameter,
        phi_inf: Parameter,
    },
    SimpleHazeOrUnderwater {
        phi_ab: Parameter,
        phi_inf: Parameter,
    },
}

impl PhysicalParameters {
    pub fn model(&self) -> DegradationModel {
        match self {
            Self::RevisedUnderwater { .. } => DegradationModel::RevisedUnderwater,
            Self::SimpleHazeOrUnderwater { .. } => DegradationModel::SimpleHazeOrUnderwater,
        }
    }

    /// Effective attenuation / backscatter / veiling-light coefficients.
    pub fn coefficients(&self) -> Coefficients {
        match self {
            Self::RevisedUnderwater {
                phi_a,
                phi_b,
                phi_inf,
            } => Coefficients {
                attenuation: phi_a.value,
                backscatter: phi_b.value,
                veiling_light: phi_inf.value,
            },
            Self::SimpleHazeOrUnderwater { phi_ab, phi_inf } => Coefficients {
                attenuation: phi_ab.value,
                backscatter: phi_ab.value,
                veiling_light: phi_inf.value,
            },
        }
    }

    /// Parameters in a stable order, paired with the gradient that applies to
    /// each one. A shared coefficient receives the sum of both roles.
    pub fn with_gradients<'a>(
        &'a mut self,
        grads: &CoefficientGradients,
    ) -> Vec<(&'a mut Parameter, Vector3<f32>)> {
        match self {
            Self::RevisedUnderwater {
                phi_a,
                phi_b,
                phi_inf,
            } => vec![
                (phi_a, grads.attenuation),
                (phi_b, grads.backscatter),
                (phi_inf, grads.veiling_light),
            ],
            Self::SimpleHazeOrUnderwater { phi_ab, phi_inf } => vec![
                (phi_ab, grads.attenuation + grads.backscatter),
                (phi_inf, grads.veiling_light),
            ],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        let params: Vec<&Parameter> = match self {
            Self::RevisedUnderwater {
                phi_a,
                phi_b,
                phi_inf,
            } => vec![phi_a, phi_b, phi_inf],
            Self::SimpleHazeOrUnderwater { phi_ab, phi_inf } => vec![phi_ab, phi_inf],
        };
        params.into_iter()
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::RevisedUnderwater { .. } => 3,
            Self::SimpleHazeOrUnderwater { .. } => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_coefficient_sums_both_gradient_roles() {
        let mut params = PhysicalParameters::SimpleHazeOrUnderwater {
            phi_ab: Parameter::new("phi_ab", Vector3::repeat(0.1), 1e-3),
            phi_inf: Parameter::new("phi_inf", Vector3::repeat(0.8), 1e-3),
        };
        let coeffs = params.coefficients();
        assert_eq!(coeffs.attenuation, coeffs.backscatter);

        let grads = CoefficientGradients {
            attenuation: Vector3::new(1.0, 2.0, 3.0),
            backscatter: Vector3::new(0.5, 0.5, 0.5),
            veiling_light: Vector3::zeros(),
        };
        let pairs = params.with_gradients(&grads);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0.name, "phi_ab");
        assert_eq!(pairs[0].1, Vector3::new(1.5, 2.5, 3.5));
    }
}
