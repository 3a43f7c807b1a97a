//! Dataset driver: one independent restoration per item.
//!
//! Items are processed in order up to `stop_after`. Each item builds its own
//! estimator, so no parameter state is shared between images. A failing item
//! is logged and reported; the remaining items still run. Ground truth
//! handed over as raw tensors is decoded when its item runs, so a tensor of
//! unsupported rank only skips that item.
use super::restorer::Restorer;
use super::result::{GroundTruth, RestorationReport};
use crate::diffusion::Denoiser;
use crate::error::RestoreError;
use crate::image::io::load_rgb_image;
use crate::image::tensor::{depth_from_tensor, rgbd_from_tensor};
use crate::image::RgbImage;
use std::path::Path;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Ground truth as supplied by a data loader.
#[derive(Clone, Debug)]
pub enum GroundTruthSource {
    Decoded(GroundTruth),
    /// Row-major `[4, h, w]` or `[1, 4, h, w]` RGB-D tensor.
    RgbdTensor { shape: Vec<usize>, data: Vec<f32> },
    /// RGB image plus a depth tensor of rank 2, 3 or 4.
    DepthTensor {
        rgb: RgbImage,
        shape: Vec<usize>,
        data: Vec<f32>,
    },
}

impl GroundTruthSource {
    pub fn decode(&self) -> Result<GroundTruth, RestoreError> {
        match self {
            Self::Decoded(gt) => Ok(gt.clone()),
            Self::RgbdTensor { shape, data } => {
                let rgbd = rgbd_from_tensor(shape, data)?;
                Ok(GroundTruth {
                    rgb: rgbd.rgb(),
                    depth: Some(rgbd.depth().clone()),
                })
            }
            Self::DepthTensor { rgb, shape, data } => Ok(GroundTruth {
                rgb: rgb.clone(),
                depth: Some(depth_from_tensor(shape, data)?),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DatasetItem {
    pub id: String,
    /// Degraded observation in `[-1, 1]`.
    pub reference: RgbImage,
    pub ground_truth: Option<GroundTruthSource>,
}

impl DatasetItem {
    pub fn new(id: impl Into<String>, reference: RgbImage) -> Self {
        Self {
            id: id.into(),
            reference,
            ground_truth: None,
        }
    }

    /// Item whose observation is read from an image file.
    pub fn from_image_file(id: impl Into<String>, path: &Path) -> Result<Self, RestoreError> {
        Ok(Self::new(id, load_rgb_image(path)?))
    }

    pub fn with_ground_truth(mut self, ground_truth: GroundTruth) -> Self {
        self.ground_truth = Some(GroundTruthSource::Decoded(ground_truth));
        self
    }

    /// Attach ground truth as raw tensors; see [`GroundTruthSource`].
    pub fn with_ground_truth_tensor(mut self, source: GroundTruthSource) -> Self {
        self.ground_truth = Some(source);
        self
    }
}

#[derive(Debug)]
pub struct ItemOutcome {
    pub index: usize,
    pub id: String,
    pub report: Result<RestorationReport, RestoreError>,
}

impl ItemOutcome {
    pub fn is_ok(&self) -> bool {
        self.report.is_ok()
    }
}

impl Restorer {
    /// Restore a single dataset item, attaching its ground truth.
    pub fn restore_item<D: Denoiser + ?Sized>(
        &self,
        denoiser: &D,
        item: &DatasetItem,
    ) -> Result<RestorationReport, RestoreError> {
        let ground_truth = item
            .ground_truth
            .as_ref()
            .map(GroundTruthSource::decode)
            .transpose()?;
        if let Some(gt) = &ground_truth {
            RestoreError::check_dims(item.reference.dims(), gt.rgb.dims())?;
            if let Some(depth) = &gt.depth {
                RestoreError::check_dims(item.reference.dims(), depth.dims())?;
            }
        }
        let mut report = self.restore_image(denoiser, &item.reference)?;
        report.ground_truth = ground_truth;
        Ok(report)
    }

    pub fn restore_dataset<D: Denoiser + ?Sized>(
        &self,
        denoiser: &D,
        items: &[DatasetItem],
    ) -> Vec<ItemOutcome> {
        let limit = self.params().stop_after.unwrap_or(items.len()).min(items.len());
        if limit < items.len() {
            log::info!("stopping after {} of {} items", limit, items.len());
        }
        let selected = &items[..limit];
        let run = |(index, item): (usize, &DatasetItem)| {
            let report = self.restore_item(denoiser, item);
            match &report {
                Ok(r) => log::info!(
                    "[{}] {} done: loss {:.5}{}",
                    index,
                    item.id,
                    r.result.final_norm_loss,
                    if r.degraded { " (degraded)" } else { "" }
                ),
                Err(err) => log::warn!("[{}] {} skipped: {}", index, item.id, err),
            }
            ItemOutcome {
                index,
                id: item.id.clone(),
                report,
            }
        };

        #[cfg(feature = "parallel")]
        if self.params().parallel {
            return selected.par_iter().enumerate().map(run).collect();
        }
        selected.iter().enumerate().map(run).collect()
    }
}
