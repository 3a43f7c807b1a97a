//! Fixed-count planar multi-channel images.
//!
//! The diffusion network works on 4-plane RGB-D tensors (R, G, B, depth) in
//! the `[-1, 1]` network domain; the physics works on 3-plane RGB images in
//! `[0, 1]`. Both are `Planes<N>` with one [`ImageF32`] per channel so that a
//! single channel can be lifted out without copying the others.
use super::ImageF32;

#[derive(Clone, Debug, PartialEq)]
pub struct Planes<const N: usize> {
    pub planes: [ImageF32; N],
}

/// Three color planes (R, G, B).
pub type RgbImage = Planes<3>;
/// Three color planes followed by one depth plane.
pub type RgbdImage = Planes<4>;

/// Index of the depth plane inside an [`RgbdImage`].
pub const DEPTH_PLANE: usize = 3;

impl<const N: usize> Planes<N> {
    pub fn zeros(w: usize, h: usize) -> Self {
        Self::filled(w, h, 0.0)
    }

    pub fn filled(w: usize, h: usize, value: f32) -> Self {
        Self {
            planes: std::array::from_fn(|_| ImageF32::filled(w, h, value)),
        }
    }

    /// Build from explicit planes. Returns `None` when the planes disagree in
    /// size.
    pub fn from_planes(planes: [ImageF32; N]) -> Option<Self> {
        let dims = planes.first().map(ImageF32::dims)?;
        planes
            .iter()
            .all(|p| p.dims() == dims)
            .then_some(Self { planes })
    }

    /// `(width, height)` shared by all planes.
    pub fn dims(&self) -> (usize, usize) {
        self.planes.first().map(ImageF32::dims).unwrap_or((0, 0))
    }

    pub fn plane(&self, c: usize) -> &ImageF32 {
        &self.planes[c]
    }

    pub fn plane_mut(&mut self, c: usize) -> &mut ImageF32 {
        &mut self.planes[c]
    }

    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            planes: std::array::from_fn(|c| self.planes[c].map(&f)),
        }
    }

    pub fn zip_map(&self, other: &Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self {
            planes: std::array::from_fn(|c| self.planes[c].zip_map(&other.planes[c], &f)),
        }
    }

    /// Largest absolute pixel difference against `other`.
    pub fn max_abs_diff(&self, other: &Self) -> f32 {
        self.planes
            .iter()
            .zip(other.planes.iter())
            .flat_map(|(a, b)| a.data.iter().zip(b.data.iter()))
            .map(|(&a, &b)| (a - b).abs())
            .fold(0.0f32, f32::max)
    }
}

impl Planes<4> {
    /// Stack color planes and a depth plane into an RGB-D image.
    pub fn from_rgb_depth(rgb: RgbImage, depth: ImageF32) -> Option<Self> {
        let [r, g, b] = rgb.planes;
        Self::from_planes([r, g, b, depth])
    }

    /// Copy of the three color planes.
    pub fn rgb(&self) -> RgbImage {
        Planes {
            planes: std::array::from_fn(|c| self.planes[c].clone()),
        }
    }

    pub fn depth(&self) -> &ImageF32 {
        &self.planes[DEPTH_PLANE]
    }
}
