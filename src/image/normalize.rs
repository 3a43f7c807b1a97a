//! Display normalization helpers.
//!
//! - `min_max_range`: rescale to `[vmin, vmax]` (zeros for a flat image).
//! - `min_max_percentile`: clip to the `[low, high]` quantiles first, then
//!   rescale; robust against a few extreme depth outliers.
use super::ImageF32;

#[inline]
pub fn to_unit(v: f32) -> f32 {
    0.5 * (v + 1.0)
}

#[inline]
pub fn to_network(v: f32) -> f32 {
    2.0 * v - 1.0
}

pub fn min_max_range(img: &ImageF32, vmin: f32, vmax: f32) -> ImageF32 {
    match img.min_max() {
        Some((lo, hi)) if hi > lo => {
            let scale = (vmax - vmin) / (hi - lo);
            img.map(|v| (v - lo) * scale + vmin)
        }
        _ => ImageF32::new(img.w, img.h),
    }
}

pub fn min_max_percentile(
    img: &ImageF32,
    vmin: f32,
    vmax: f32,
    percent_low: f32,
    percent_high: f32,
) -> ImageF32 {
    let (Some(lo), Some(hi)) = (quantile(img, percent_low), quantile(img, percent_high)) else {
        return ImageF32::new(img.w, img.h);
    };
    let clipped = img.map(|v| v.clamp(lo.min(hi), hi.max(lo)));
    min_max_range(&clipped, vmin, vmax)
}

/// Linear-interpolated quantile `q ∈ [0, 1]` over the finite pixels.
pub fn quantile(img: &ImageF32, q: f32) -> Option<f32> {
    let mut values: Vec<f32> = img.data.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f32::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (values.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}
