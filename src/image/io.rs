//! I/O helpers for RGB/depth images and JSON.
//!
//! These are boundary operations for tools; nothing in the sampling loop
//! calls them.
//!
//! - `load_rgb_image`: read a PNG into an [`RgbImage`] in the `[-1, 1]`
//!   network domain.
//! - `save_rgb_unit`: write a `[0, 1]` RGB image to PNG.
//! - `save_grayscale_f32`: write an `ImageF32` in `[0, 1]` to a grayscale PNG.
//! - `write_json_file`: pretty-print a serializable value to disk.
use super::normalize::to_network;
use super::{ImageF32, ImageView, RgbImage};
use crate::error::RestoreError;
use image::{GrayImage, Luma, Rgb, RgbImage as RgbBuffer};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Load an image from disk as RGB in the network domain.
pub fn load_rgb_image(path: &Path) -> Result<RgbImage, RestoreError> {
    let img = image::open(path)
        .map_err(|e| RestoreError::Io(format!("Failed to open {}: {e}", path.display())))?
        .into_rgb8();
    let (w, h) = (img.width() as usize, img.height() as usize);
    let mut out = RgbImage::zeros(w, h);
    for (x, y, px) in img.enumerate_pixels() {
        for c in 0..3 {
            let unit = px.0[c] as f32 / 255.0;
            out.plane_mut(c).set(x as usize, y as usize, to_network(unit));
        }
    }
    Ok(out)
}

/// Save a `[0, 1]` RGB image, clamping out-of-range values.
pub fn save_rgb_unit(image: &RgbImage, path: &Path) -> Result<(), RestoreError> {
    ensure_parent_dir(path)?;
    let (w, h) = image.dims();
    let mut out = RgbBuffer::new(w as u32, h as u32);
    for y in 0..h {
        let rows = [image.plane(0).row(y), image.plane(1).row(y), image.plane(2).row(y)];
        for x in 0..w {
            let px = rows.map(|row| (row[x] * 255.0).clamp(0.0, 255.0) as u8);
            out.put_pixel(x as u32, y as u32, Rgb(px));
        }
    }
    out.save(path)
        .map_err(|e| RestoreError::Io(format!("Failed to save {}: {e}", path.display())))
}

/// Save a float image to a grayscale PNG, clamping values in [0, 255].
pub fn save_grayscale_f32(image: &ImageF32, path: &Path) -> Result<(), RestoreError> {
    ensure_parent_dir(path)?;
    let mut out = GrayImage::new(image.w as u32, image.h as u32);
    for (y, row) in image.rows().enumerate() {
        for (x, &px) in row.iter().enumerate() {
            let v = (px * 255.0).clamp(0.0, 255.0);
            out.put_pixel(x as u32, y as u32, Luma([v as u8]));
        }
    }
    out.save(path)
        .map_err(|e| RestoreError::Io(format!("Failed to save {}: {e}", path.display())))
}

/// Serialize a value as pretty JSON to `path`, creating parent directories.
pub fn write_json_file<T: Serialize>(path: &Path, value: &T) -> Result<(), RestoreError> {
    ensure_parent_dir(path)?;
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        RestoreError::Io(format!("Failed to serialize JSON for {}: {e}", path.display()))
    })?;
    fs::write(path, json)
        .map_err(|e| RestoreError::Io(format!("Failed to write JSON {}: {e}", path.display())))
}

fn ensure_parent_dir(path: &Path) -> Result<(), RestoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                RestoreError::Io(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
    }
    Ok(())
}
