use crate::diagnostics::RunTrace;
use crate::error::RestoreError;
use crate::estimator::residual_norm;
use crate::image::{normalize, ImageF32, RgbImage, RgbdImage};
use crate::measurement::Measurement;
use crate::physics::{forward, invert, PhysicalParameters};
use crate::depth::DepthConversion;

/// Lower/upper quantiles used for the outlier-robust depth display.
pub const DEPTH_PERCENTILE_LOW: f32 = 0.03;
pub const DEPTH_PERCENTILE_HIGH: f32 = 0.99;

/// Reference data carried alongside a dataset item for side-by-side output.
#[derive(Clone, Debug)]
pub struct GroundTruth {
    pub rgb: RgbImage,
    pub depth: Option<ImageF32>,
}

/// Final output of one image restoration. Display images are in `[0, 1]`.
#[derive(Clone, Debug)]
pub struct RestorationResult {
    pub rgb: RgbImage,
    /// Raw depth channel in the network domain.
    pub depth_raw: ImageF32,
    /// Depth after the configured conversion, as seen by the forward model.
    pub depth_converted: ImageF32,
    pub depth_normalized: ImageF32,
    pub depth_percentile: ImageF32,
    /// Forward-model prediction of the measurement from the final estimate.
    pub degraded_prediction: RgbImage,
    /// Measurement with backscatter and attenuation undone, clipped to `[0, 1]`.
    pub clean_reconstruction: RgbImage,
    pub parameters: PhysicalParameters,
    pub loss_trajectory: Vec<f32>,
    /// `‖(2 · predicted − 1) − measurement‖₂`; may be infinite.
    pub final_norm_loss: f32,
    pub global_iteration: usize,
}

/// Display RGB of a sample: `0.5 · (x + 1)` clipped to `[0, 1]`.
fn display_rgb(sample: &RgbdImage) -> RgbImage {
    sample
        .rgb()
        .map(|v| normalize::to_unit(v).clamp(0.0, 1.0))
}

/// Unweighted network-domain norm loss of a final sample; non-finite values
/// are reported as infinity.
pub fn final_norm_loss(
    sample: &RgbdImage,
    parameters: &PhysicalParameters,
    depth_conversion: &DepthConversion,
    measurement: &Measurement,
) -> Result<f32, RestoreError> {
    let depth = depth_conversion.convert(sample.depth());
    let degraded = forward(&display_rgb(sample), &depth, &parameters.coefficients())?;
    let loss = residual_norm(&degraded.predicted, measurement.observed(), None)?;
    Ok(if loss.is_finite() { loss } else { f32::INFINITY })
}

impl RestorationResult {
    pub(crate) fn assemble(
        sample: &RgbdImage,
        parameters: PhysicalParameters,
        depth_conversion: &DepthConversion,
        measurement: &Measurement,
        loss_trajectory: Vec<f32>,
        global_iteration: usize,
    ) -> Result<Self, RestoreError> {
        let rgb = display_rgb(sample);
        let depth_raw = sample.depth().clone();
        let depth_converted = depth_conversion.convert(&depth_raw);
        let coeffs = parameters.coefficients();

        let degraded = forward(&rgb, &depth_converted, &coeffs)?;
        let final_norm_loss = residual_norm(&degraded.predicted, measurement.observed(), None)?;
        let clean_reconstruction = invert(measurement.observed_unit(), &depth_converted, &coeffs)?
            .map(|v| v.clamp(0.0, 1.0));

        Ok(Self {
            depth_normalized: normalize::min_max_range(&depth_raw, 0.0, 1.0),
            depth_percentile: normalize::min_max_percentile(
                &depth_raw,
                0.0,
                1.0,
                DEPTH_PERCENTILE_LOW,
                DEPTH_PERCENTILE_HIGH,
            ),
            rgb,
            depth_raw,
            depth_converted,
            degraded_prediction: degraded.predicted,
            clean_reconstruction,
            parameters,
            loss_trajectory,
            final_norm_loss: if final_norm_loss.is_finite() {
                final_norm_loss
            } else {
                f32::INFINITY
            },
            global_iteration,
        })
    }
}

/// Result plus trace for one image.
#[derive(Clone, Debug)]
pub struct RestorationReport {
    pub result: RestorationResult,
    pub trace: RunTrace,
    /// Set when any guidance step of the kept iteration was degenerate or
    /// the final loss is not finite.
    pub degraded: bool,
    pub ground_truth: Option<GroundTruth>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::Parameter;
    use nalgebra::Vector3;

    #[test]
    fn assembled_outputs_are_display_ready() {
        let (w, h) = (4, 3);
        let mut sample = RgbdImage::filled(w, h, 1.5);
        for (i, v) in sample.plane_mut(3).data.iter_mut().enumerate() {
            *v = -0.5 + 0.1 * i as f32;
        }
        let params = PhysicalParameters::SimpleHazeOrUnderwater {
            phi_ab: Parameter::new("phi_ab", Vector3::repeat(0.2), 0.0),
            phi_inf: Parameter::new("phi_inf", Vector3::repeat(0.6), 0.0),
        };
        let m = Measurement::new(RgbImage::filled(w, h, 0.0));
        let r = RestorationResult::assemble(
            &sample,
            params,
            &DepthConversion::Move { offset: 1.0 },
            &m,
            vec![2.0, 1.0],
            0,
        )
        .unwrap();

        assert!(r.rgb.planes.iter().all(|p| p.data.iter().all(|&v| v == 1.0)));
        let (lo, hi) = r.depth_normalized.min_max().unwrap();
        assert_eq!((lo, hi), (0.0, 1.0));
        assert!((r.depth_converted.get(0, 0) - 0.5).abs() < 1e-6);
        assert!(r.final_norm_loss.is_finite() && r.final_norm_loss > 0.0);
        assert!(r
            .clean_reconstruction
            .planes
            .iter()
            .all(|p| p.data.iter().all(|v| (0.0..=1.0).contains(v))));
    }
}
