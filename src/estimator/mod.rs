//! Residual-driven refinement of the clean estimate and the physical
//! parameters.
//!
//! One call to [`ParameterEstimator::refine`] performs a single gradient step
//! on the loss
//!
//! ```text
//! L = ‖ w ⊙ ((2 · forward(rgb01, depth(d), φ) − 1) − y) ‖₂
//! ```
//!
//! where `y` is the measurement in `[-1, 1]`, `rgb01` the clean RGB mapped to
//! `[0, 1]`, `depth(·)` the configured depth conversion and `w` the optional
//! loss weight. The image step uses the conditioning scale; every parameter
//! uses its own learning rate through [`ParamOptimizer`].
//!
//! The estimator never mutates its inputs: it returns a new estimate and keeps
//! the parameters as its own state.

mod clip;
mod loss_weight;
mod optimizer;

pub use clip::GradientClip;
pub use loss_weight::LossWeight;
pub use optimizer::{OptimizerKind, ParamOptimizer};

use crate::depth::DepthConversion;
use crate::error::RestoreError;
use crate::image::{normalize, ImageF32, RgbImage, RgbdImage, DEPTH_PLANE};
use crate::measurement::Measurement;
use crate::physics::{backpropagate, forward, PhysicalParameters};
use serde::Serialize;

/// Static settings of the estimator, resolved from the configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatorParams {
    /// Step size applied to the clean-image gradient.
    pub image_step: f32,
    pub depth_conversion: DepthConversion,
    pub clip: GradientClip,
    pub loss_weight: LossWeight,
    pub optimizer: OptimizerKind,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            image_step: 1.0,
            depth_conversion: DepthConversion::Original,
            clip: GradientClip::Disabled,
            loss_weight: LossWeight::None,
            optimizer: OptimizerKind::GradientDescent,
        }
    }
}

/// Result of one refine call.
#[derive(Clone, Debug)]
pub struct RefineOutcome {
    /// Refined clean RGB-D estimate in the network domain.
    pub estimate: RgbdImage,
    /// Loss evaluated before the update.
    pub residual: f32,
    /// Set when the residual was zero or non-finite; `estimate` is then the
    /// unchanged input and the parameters were not touched.
    pub degenerate: bool,
}

/// Weighted L2 norm of `(2 · predicted − 1) − observed`, accumulated in f64.
pub fn residual_norm(
    predicted_unit: &RgbImage,
    observed: &RgbImage,
    weights: Option<&ImageF32>,
) -> Result<f32, RestoreError> {
    RestoreError::check_dims(observed.dims(), predicted_unit.dims())?;
    let mut acc = 0.0f64;
    for c in 0..3 {
        let p = &predicted_unit.plane(c).data;
        let y = &observed.plane(c).data;
        for i in 0..p.len() {
            let w = weights.map_or(1.0, |w| w.data[i]);
            let r = (w * (normalize::to_network(p[i]) - y[i])) as f64;
            acc += r * r;
        }
    }
    Ok(acc.sqrt() as f32)
}

#[derive(Clone, Debug)]
pub struct ParameterEstimator {
    params: EstimatorParams,
    phi: PhysicalParameters,
    optimizer: ParamOptimizer,
    updates: usize,
}

impl ParameterEstimator {
    pub fn new(params: EstimatorParams, phi: PhysicalParameters) -> Self {
        let optimizer = ParamOptimizer::new(params.optimizer, phi.len());
        Self {
            params,
            phi,
            optimizer,
            updates: 0,
        }
    }

    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    pub fn parameters(&self) -> &PhysicalParameters {
        &self.phi
    }

    /// Number of parameter updates applied so far.
    pub fn update_count(&self) -> usize {
        self.updates
    }

    /// Clean RGB in `[0, 1]` and converted depth of an RGB-D estimate.
    pub fn physical_inputs(&self, x0: &RgbdImage) -> (RgbImage, ImageF32) {
        let rgb = x0.rgb().map(normalize::to_unit);
        let depth = self.params.depth_conversion.convert(x0.depth());
        (rgb, depth)
    }

    /// Current loss of `x0` against the measurement, without any update.
    pub fn evaluate(&self, x0: &RgbdImage, measurement: &Measurement) -> Result<f32, RestoreError> {
        RestoreError::check_dims(measurement.dims(), x0.dims())?;
        let (rgb, depth) = self.physical_inputs(x0);
        let out = forward(&rgb, &depth, &self.phi.coefficients())?;
        let weights = self.params.loss_weight.weights(x0.depth());
        residual_norm(&out.predicted, measurement.observed(), weights.as_ref())
    }

    /// One gradient step on the clean estimate and, when `update_params` is
    /// set, on every physical parameter.
    pub fn refine(
        &mut self,
        x0: &RgbdImage,
        measurement: &Measurement,
        update_params: bool,
    ) -> Result<RefineOutcome, RestoreError> {
        RestoreError::check_dims(measurement.dims(), x0.dims())?;
        let (rgb, depth) = self.physical_inputs(x0);
        let coeffs = self.phi.coefficients();
        let out = forward(&rgb, &depth, &coeffs)?;
        let weights = self.params.loss_weight.weights(x0.depth());
        let residual = residual_norm(&out.predicted, measurement.observed(), weights.as_ref())?;

        if !residual.is_finite() || residual <= 0.0 {
            log::warn!("degenerate residual {residual}; skipping guidance step");
            return Ok(RefineOutcome {
                estimate: x0.clone(),
                residual,
                degenerate: true,
            });
        }

        // dL/dpred = 2 · w² · ((2 pred − 1) − y) / L
        let observed = measurement.observed();
        let mut upstream = RgbImage::zeros(x0.dims().0, x0.dims().1);
        for c in 0..3 {
            let p = &out.predicted.plane(c).data;
            let y = &observed.plane(c).data;
            let g = &mut upstream.plane_mut(c).data;
            for i in 0..p.len() {
                let w = weights.as_ref().map_or(1.0, |w| w.data[i]);
                g[i] = 2.0 * w * w * (normalize::to_network(p[i]) - y[i]) / residual;
            }
        }
        let grads = backpropagate(&rgb, &depth, &coeffs, &upstream)?;

        let clip = self.params.clip;
        let step = self.params.image_step;
        let mut estimate = x0.clone();
        for c in 0..3 {
            let g = &grads.clean.plane(c).data;
            let x = &mut estimate.plane_mut(c).data;
            for (xi, gi) in x.iter_mut().zip(g) {
                *xi -= step * clip.clip(0.5 * gi);
            }
        }
        let conv = self.params.depth_conversion;
        let raw_depth = &x0.planes[DEPTH_PLANE].data;
        let x = &mut estimate.plane_mut(DEPTH_PLANE).data;
        for (i, xi) in x.iter_mut().enumerate() {
            let g = grads.depth.data[i] * conv.derivative(raw_depth[i]);
            *xi -= step * clip.clip(g);
        }

        if update_params {
            self.optimizer.begin_step();
            for (slot, (param, grad)) in self
                .phi
                .with_gradients(&grads.coefficients)
                .into_iter()
                .enumerate()
            {
                let delta = clip.clip_step(
                    self.optimizer.delta(slot, param.lr, clip.clip_vec(grad)),
                    param.lr,
                );
                if delta.iter().all(|v| v.is_finite()) {
                    param.value += delta;
                } else {
                    log::warn!("non-finite update for {}; keeping previous value", param.name);
                }
            }
            self.updates += 1;
        }

        Ok(RefineOutcome {
            estimate,
            residual,
            degenerate: false,
        })
    }
}
