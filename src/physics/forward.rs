//! Single-scattering forward model and its inverse.
//!
//! For every channel `c` and pixel with depth `z`:
//!
//! ```text
//! attenuation = exp(-a_c · z)
//! backscatter = inf_c · (1 - exp(-b_c · z))
//! predicted   = clean · attenuation + backscatter
//! clean_recon = exp(a_c · z) · (measurement - backscatter)
//! ```
//!
//! All images are in `[0, 1]`. Exponents are clamped to `±MAX_EXPONENT` so
//! that extreme depths or coefficients saturate instead of overflowing.
use crate::error::RestoreError;
use crate::image::{ImageF32, RgbImage};
use nalgebra::Vector3;
use serde::Serialize;

/// Largest magnitude accepted by [`stable_exp`]; `exp(80)` is still finite in
/// f32 and `exp(-80)` is still a normal number.
pub const MAX_EXPONENT: f32 = 80.0;

#[inline]
pub fn stable_exp(x: f32) -> f32 {
    if x.is_nan() {
        return 1.0;
    }
    x.clamp(-MAX_EXPONENT, MAX_EXPONENT).exp()
}

/// Effective per-channel coefficients seen by the forward model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coefficients {
    pub attenuation: Vector3<f32>,
    pub backscatter: Vector3<f32>,
    pub veiling_light: Vector3<f32>,
}

/// Output of one forward pass, kept together for reconstruction and logging.
#[derive(Clone, Debug)]
pub struct Degradation {
    pub predicted: RgbImage,
    pub backscatter: RgbImage,
    pub attenuation: RgbImage,
}

/// Predict the degraded observation of `clean` seen through `depth`.
pub fn forward(
    clean: &RgbImage,
    depth: &ImageF32,
    coeffs: &Coefficients,
) -> Result<Degradation, RestoreError> {
    RestoreError::check_dims(clean.dims(), depth.dims())?;
    let (w, h) = clean.dims();
    let mut predicted = RgbImage::zeros(w, h);
    let mut backscatter = RgbImage::zeros(w, h);
    let mut attenuation = RgbImage::zeros(w, h);

    for c in 0..3 {
        let a = coeffs.attenuation[c];
        let b = coeffs.backscatter[c];
        let inf = coeffs.veiling_light[c];
        let x = &clean.plane(c).data;
        let pred = &mut predicted.plane_mut(c).data;
        let bs = &mut backscatter.plane_mut(c).data;
        let att = &mut attenuation.plane_mut(c).data;
        for (i, &z) in depth.data.iter().enumerate() {
            att[i] = stable_exp(-a * z);
            bs[i] = inf * (1.0 - stable_exp(-b * z));
            pred[i] = x[i] * att[i] + bs[i];
        }
    }

    Ok(Degradation {
        predicted,
        backscatter,
        attenuation,
    })
}

/// Recover the clean image from a `[0, 1]` measurement by undoing
/// backscatter and attenuation.
pub fn invert(
    measurement: &RgbImage,
    depth: &ImageF32,
    coeffs: &Coefficients,
) -> Result<RgbImage, RestoreError> {
    RestoreError::check_dims(measurement.dims(), depth.dims())?;
    let (w, h) = measurement.dims();
    let mut clean = RgbImage::zeros(w, h);
    for c in 0..3 {
        let a = coeffs.attenuation[c];
        let b = coeffs.backscatter[c];
        let inf = coeffs.veiling_light[c];
        let y = &measurement.plane(c).data;
        let out = &mut clean.plane_mut(c).data;
        for (i, &z) in depth.data.iter().enumerate() {
            let bs = inf * (1.0 - stable_exp(-b * z));
            out[i] = stable_exp(a * z) * (y[i] - bs);
        }
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn haze(phi_ab: f32, phi_inf: f32) -> Coefficients {
        Coefficients {
            attenuation: Vector3::repeat(phi_ab),
            backscatter: Vector3::repeat(phi_ab),
            veiling_light: Vector3::repeat(phi_inf),
        }
    }

    #[test]
    fn single_coefficient_haze_matches_hand_computation() {
        let clean = RgbImage::filled(1, 1, 0.6);
        let depth = ImageF32::filled(1, 1, 2.0);
        let out = forward(&clean, &depth, &haze(0.1, 0.8)).unwrap();

        let att = out.attenuation.plane(0).get(0, 0);
        let bs = out.backscatter.plane(0).get(0, 0);
        let pred = out.predicted.plane(0).get(0, 0);
        assert!((att - (-0.2f32).exp()).abs() < 1e-6);
        assert!((att - 0.8187).abs() < 1e-4, "att={att}");
        assert!((bs - 0.1450).abs() < 1e-3, "bs={bs}");
        assert!((pred - 0.6363).abs() < 1e-3, "pred={pred}");
    }

    #[test]
    fn forward_then_invert_is_near_identity() {
        let (w, h) = (5, 4);
        let mut clean = RgbImage::zeros(w, h);
        let mut depth = ImageF32::new(w, h);
        for y in 0..h {
            for x in 0..w {
                depth.set(x, y, 0.5 + 0.3 * x as f32 + 0.1 * y as f32);
                for c in 0..3 {
                    let v = 0.1 + 0.2 * c as f32 + 0.03 * (x + y) as f32;
                    clean.plane_mut(c).set(x, y, v);
                }
            }
        }
        let coeffs = Coefficients {
            attenuation: Vector3::new(0.35, 0.12, 0.08),
            backscatter: Vector3::new(0.4, 0.25, 0.2),
            veiling_light: Vector3::new(0.1, 0.45, 0.6),
        };
        let degraded = forward(&clean, &depth, &coeffs).unwrap();
        let recon = invert(&degraded.predicted, &depth, &coeffs).unwrap();
        let err = recon.max_abs_diff(&clean);
        assert!(err < 1e-4, "round trip error {err}");
    }

    #[test]
    fn extreme_depth_saturates_without_overflow() {
        let clean = RgbImage::filled(2, 1, 0.5);
        let depth = ImageF32::from_vec(2, 1, vec![1.0e9, -1.0e9]).unwrap();
        let out = forward(&clean, &depth, &haze(5.0, 0.7)).unwrap();
        for c in 0..3 {
            assert!(out.predicted.plane(c).data.iter().all(|v| v.is_finite()));
        }
        let recon = invert(&out.predicted, &depth, &haze(5.0, 0.7)).unwrap();
        assert!(recon.plane(0).data.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn mismatched_depth_is_rejected() {
        let clean = RgbImage::zeros(4, 4);
        let depth = ImageF32::new(4, 2);
        assert!(matches!(
            forward(&clean, &depth, &haze(0.1, 0.5)),
            Err(RestoreError::ShapeMismatch { .. })
        ));
    }
}
