use nalgebra::Vector3;
use osmosis::depth::DepthConversion;
use osmosis::diffusion::{DdimSampler, DiffusionParams, ScenePredictor};
use osmosis::image::{normalize, RgbImage, RgbdImage};
use osmosis::physics::{forward, Parameter, PhysicalParameters};

/// Smooth RGB-D scene in the network domain. Depth grows down the image.
pub fn rgbd_scene(width: usize, height: usize) -> RgbdImage {
    assert!(width > 0 && height > 0, "scene dimensions must be positive");
    let mut scene = RgbdImage::zeros(width, height);
    for y in 0..height {
        let fy = y as f32 / height as f32;
        for x in 0..width {
            let fx = x as f32 / width as f32;
            scene.plane_mut(0).set(x, y, -0.3 + 0.6 * fx);
            scene.plane_mut(1).set(x, y, 0.2 - 0.4 * fy);
            scene.plane_mut(2).set(x, y, 0.1 + 0.3 * fx * fy);
            scene.plane_mut(3).set(x, y, -0.8 + 1.6 * fy);
        }
    }
    scene
}

pub fn haze_parameters(phi_ab: f32, phi_inf: f32, lr: f32) -> PhysicalParameters {
    PhysicalParameters::SimpleHazeOrUnderwater {
        phi_ab: Parameter::new("phi_ab", Vector3::repeat(phi_ab), lr),
        phi_inf: Parameter::new("phi_inf", Vector3::repeat(phi_inf), lr),
    }
}

/// Degraded observation of `scene` in the network domain.
pub fn degrade(
    scene: &RgbdImage,
    parameters: &PhysicalParameters,
    conversion: DepthConversion,
) -> RgbImage {
    let clean = scene.rgb().map(normalize::to_unit);
    let depth = conversion.convert(scene.depth());
    forward(&clean, &depth, &parameters.coefficients())
        .expect("scene and depth share dimensions")
        .predicted
        .map(normalize::to_network)
}

pub fn oracle_sampler(
    scene: &RgbdImage,
    diffusion: &DiffusionParams,
) -> DdimSampler<ScenePredictor> {
    DdimSampler::new(ScenePredictor::new(scene.clone(), diffusion), diffusion)
}
