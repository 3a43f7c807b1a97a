//! Degraded observation fed to guidance.
//!
//! The measurement is prepared once per restoration: the configured noise
//! model, then an optional de-gamma. Guidance only ever reads it.
use crate::error::RestoreError;
use crate::image::{normalize, RgbImage};
use crate::noise::NoiseModel;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Display gamma undone by [`degamma`].
pub const DISPLAY_GAMMA: f32 = 2.2;

/// Linearize a `[-1, 1]` gamma-encoded image: `2 · ((y + 1) / 2)^2.2 - 1`.
pub fn degamma(img: &RgbImage) -> RgbImage {
    img.map(|v| 2.0 * normalize::to_unit(v).max(0.0).powf(DISPLAY_GAMMA) - 1.0)
}

#[derive(Clone, Debug)]
pub struct Measurement {
    observed: RgbImage,
    observed_unit: RgbImage,
}

impl Measurement {
    /// Wrap an already prepared `[-1, 1]` observation.
    pub fn new(observed: RgbImage) -> Self {
        let observed_unit = observed.map(normalize::to_unit);
        Self {
            observed,
            observed_unit,
        }
    }

    /// Build the measurement from a reference image in `[-1, 1]`.
    ///
    /// The noise draw uses its own generator seeded from `seed`, so it is
    /// independent of the sampling noise.
    pub fn prepare(
        reference: &RgbImage,
        noise: &NoiseModel,
        degamma_input: bool,
        seed: u64,
    ) -> Result<Self, RestoreError> {
        let (w, h) = reference.dims();
        if w == 0 || h == 0 {
            return Err(RestoreError::ShapeMismatch {
                expected: (w.max(1), h.max(1)),
                actual: (w, h),
            });
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let noisy = noise.apply(reference, &mut rng);
        let observed = if degamma_input {
            degamma(&noisy)
        } else {
            noisy
        };
        log::debug!(
            "measurement prepared {}x{} noise={:?} degamma={}",
            w,
            h,
            noise,
            degamma_input
        );
        Ok(Self::new(observed))
    }

    /// Observation in the network domain `[-1, 1]`.
    pub fn observed(&self) -> &RgbImage {
        &self.observed
    }

    /// Observation mapped to `[0, 1]`.
    pub fn observed_unit(&self) -> &RgbImage {
        &self.observed_unit
    }

    pub fn dims(&self) -> (usize, usize) {
        self.observed.dims()
    }
}
