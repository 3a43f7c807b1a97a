//! Physical degradation model for underwater and haze scenes.
//!
//! Overview
//! - [`DegradationModel`] is the closed set of supported models, chosen once
//!   from the operator name in the configuration.
//! - [`PhysicalParameters`] holds the learnable per-channel coefficients with
//!   their learning rates, shaped by the selected model.
//! - [`forward`] maps a clean `[0, 1]` RGB image and a depth map to the
//!   predicted degraded observation; [`invert`] undoes it given a measurement.
//! - [`backpropagate`] is the analytic reverse pass used by the parameter
//!   estimator.
//!
//! The forward model only ever sees [`Coefficients`]; the single-coefficient
//! variant simply reuses one vector for attenuation and backscatter.

mod forward;
mod gradient;
mod model;
mod params;

pub use forward::{forward, invert, stable_exp, Coefficients, Degradation, MAX_EXPONENT};
pub use gradient::{backpropagate, ForwardGradients};
pub use model::DegradationModel;
pub use params::{CoefficientGradients, Parameter, PhysicalParameters};
