//! Ingestion of row-major tensors handed over by external collaborators.
//!
//! Depth tensors may arrive as `[h, w]`, `[c, h, w]` or `[n, c, h, w]`; only
//! the first batch entry and first channel are used. RGB-D tensors must be
//! `[4, h, w]` or `[1, 4, h, w]`.
use super::{ImageF32, Planes, RgbdImage};
use crate::error::RestoreError;

fn check_len(shape: &[usize], data: &[f32]) -> Result<(), RestoreError> {
    let expected: usize = shape.iter().product();
    if data.len() == expected {
        Ok(())
    } else {
        Err(RestoreError::TensorLength {
            shape: shape.to_vec(),
            expected,
            actual: data.len(),
        })
    }
}

/// Extract a single depth plane from a rank 2, 3 or 4 tensor.
pub fn depth_from_tensor(shape: &[usize], data: &[f32]) -> Result<ImageF32, RestoreError> {
    let (h, w) = match *shape {
        [h, w] => (h, w),
        [_, h, w] => (h, w),
        [_, _, h, w] => (h, w),
        _ => return Err(RestoreError::UnsupportedRank(shape.len())),
    };
    check_len(shape, data)?;
    if shape.iter().any(|&d| d == 0) {
        return Ok(ImageF32::new(w, h));
    }
    // First batch entry, first channel: the leading w*h elements.
    Ok(ImageF32 {
        w,
        h,
        stride: w,
        data: data[..w * h].to_vec(),
    })
}

/// Split a 4-channel tensor into an [`RgbdImage`].
pub fn rgbd_from_tensor(shape: &[usize], data: &[f32]) -> Result<RgbdImage, RestoreError> {
    let (c, h, w) = match *shape {
        [c, h, w] => (c, h, w),
        [1, c, h, w] => (c, h, w),
        [n, _, _, _] => return Err(RestoreError::BatchSize(n)),
        _ => return Err(RestoreError::UnsupportedRank(shape.len())),
    };
    if c != 4 {
        return Err(RestoreError::ChannelCount(c));
    }
    check_len(shape, data)?;
    let plane = w * h;
    Ok(Planes {
        planes: std::array::from_fn(|i| ImageF32 {
            w,
            h,
            stride: w,
            data: data[i * plane..(i + 1) * plane].to_vec(),
        }),
    })
}
