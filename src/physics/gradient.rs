//! Analytic reverse pass of the forward model.
//!
//! Given `g = ∂L/∂predicted`, returns the gradients with respect to the clean
//! image, the (converted) depth and the per-channel coefficients. The partial
//! derivatives per channel are
//!
//! ```text
//! ∂pred/∂clean = e^{-a z}
//! ∂pred/∂a     = -clean · z · e^{-a z}
//! ∂pred/∂b     =  inf · z · e^{-b z}
//! ∂pred/∂inf   =  1 - e^{-b z}
//! ∂pred/∂z     = -a · clean · e^{-a z} + inf · b · e^{-b z}
//! ```
use super::forward::{stable_exp, Coefficients};
use super::params::CoefficientGradients;
use crate::error::RestoreError;
use crate::image::{ImageF32, RgbImage};
use nalgebra::Vector3;

#[derive(Clone, Debug)]
pub struct ForwardGradients {
    pub clean: RgbImage,
    /// Summed over the three channels; depth is shared by all of them.
    pub depth: ImageF32,
    pub coefficients: CoefficientGradients,
}

pub fn backpropagate(
    clean: &RgbImage,
    depth: &ImageF32,
    coeffs: &Coefficients,
    upstream: &RgbImage,
) -> Result<ForwardGradients, RestoreError> {
    RestoreError::check_dims(clean.dims(), depth.dims())?;
    RestoreError::check_dims(clean.dims(), upstream.dims())?;
    let (w, h) = clean.dims();
    let mut d_clean = RgbImage::zeros(w, h);
    let mut d_depth = ImageF32::new(w, h);
    let mut d_a = Vector3::<f64>::zeros();
    let mut d_b = Vector3::<f64>::zeros();
    let mut d_inf = Vector3::<f64>::zeros();

    for c in 0..3 {
        let a = coeffs.attenuation[c];
        let b = coeffs.backscatter[c];
        let inf = coeffs.veiling_light[c];
        let x = &clean.plane(c).data;
        let g = &upstream.plane(c).data;
        let out = &mut d_clean.plane_mut(c).data;
        for (i, &z) in depth.data.iter().enumerate() {
            let gi = g[i];
            if gi == 0.0 {
                continue;
            }
            let att = stable_exp(-a * z);
            let eb = stable_exp(-b * z);
            out[i] = gi * att;
            d_a[c] += (gi * (-x[i] * z * att)) as f64;
            d_b[c] += (gi * (inf * z * eb)) as f64;
            d_inf[c] += (gi * (1.0 - eb)) as f64;
            d_depth.data[i] += gi * (-a * x[i] * att + inf * b * eb);
        }
    }

    Ok(ForwardGradients {
        clean: d_clean,
        depth: d_depth,
        coefficients: CoefficientGradients {
            attenuation: d_a.map(|v| v as f32),
            backscatter: d_b.map(|v| v as f32),
            veiling_light: d_inf.map(|v| v as f32),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::forward::forward;

    fn coeffs() -> Coefficients {
        Coefficients {
            attenuation: Vector3::new(0.3, 0.2, 0.1),
            backscatter: Vector3::new(0.5, 0.4, 0.3),
            veiling_light: Vector3::new(0.2, 0.5, 0.7),
        }
    }

    /// Loss = sum of predicted values, so the upstream gradient is all ones.
    fn loss(clean: &RgbImage, depth: &ImageF32, coeffs: &Coefficients) -> f64 {
        let out = forward(clean, depth, coeffs).unwrap();
        out.predicted
            .planes
            .iter()
            .flat_map(|p| p.data.iter())
            .map(|&v| v as f64)
            .sum()
    }

    #[test]
    fn coefficient_gradients_match_finite_differences() {
        let clean = RgbImage::filled(3, 2, 0.4);
        let depth = ImageF32::from_vec(3, 2, vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0]).unwrap();
        let k = coeffs();
        let ones = RgbImage::filled(3, 2, 1.0);
        let grads = backpropagate(&clean, &depth, &k, &ones).unwrap();

        let eps = 1e-3f32;
        for c in 0..3 {
            let mut plus = k;
            let mut minus = k;
            plus.attenuation[c] += eps;
            minus.attenuation[c] -= eps;
            let fd = (loss(&clean, &depth, &plus) - loss(&clean, &depth, &minus)) / (2.0 * eps as f64);
            let an = grads.coefficients.attenuation[c] as f64;
            assert!((fd - an).abs() < 1e-2, "d_a[{c}] fd={fd} analytic={an}");

            let mut plus = k;
            let mut minus = k;
            plus.veiling_light[c] += eps;
            minus.veiling_light[c] -= eps;
            let fd = (loss(&clean, &depth, &plus) - loss(&clean, &depth, &minus)) / (2.0 * eps as f64);
            let an = grads.coefficients.veiling_light[c] as f64;
            assert!((fd - an).abs() < 1e-2, "d_inf[{c}] fd={fd} analytic={an}");
        }
    }

    #[test]
    fn depth_gradient_matches_finite_difference() {
        let clean = RgbImage::filled(1, 1, 0.6);
        let k = coeffs();
        let z = 1.3f32;
        let grads = backpropagate(
            &clean,
            &ImageF32::filled(1, 1, z),
            &k,
            &RgbImage::filled(1, 1, 1.0),
        )
        .unwrap();
        let eps = 1e-3f32;
        let fd = (loss(&clean, &ImageF32::filled(1, 1, z + eps), &k)
            - loss(&clean, &ImageF32::filled(1, 1, z - eps), &k))
            / (2.0 * eps as f64);
        let an = grads.depth.get(0, 0) as f64;
        assert!((fd - an).abs() < 1e-3, "fd={fd} analytic={an}");
    }
}
