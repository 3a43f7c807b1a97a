//! Error taxonomy for configuration and per-image restoration failures.
//!
//! [`ConfigError`] is fatal: it is raised while resolving the configuration,
//! before any image is touched. [`RestoreError`] covers failures scoped to a
//! single image (shape/domain mismatches, denoiser failures, image I/O); the
//! dataset driver reports them and moves on to the next item.
//!
//! Numeric degeneracy (zero or non-finite residuals) is deliberately absent
//! here; it is reported through flags on the refine outcome and the report.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration errors surfaced while loading or resolving a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("unrecognized sample pattern `{0}` (expected `original` or `pcgs`)")]
    UnknownPattern(String),
    #[error("unrecognized depth conversion `{0}` (expected `move`, `gamma` or `original`)")]
    UnknownDepthType(String),
    #[error("unrecognized degradation model `{0}` (expected an underwater or haze operator)")]
    UnknownOperator(String),
    #[error("unrecognized noise model `{0}` (expected `clean` or `gaussian`)")]
    UnknownNoise(String),
    #[error("unrecognized loss weight `{0}` (expected `none` or `depth`)")]
    UnknownLossWeight(String),
    #[error("unrecognized optimizer `{0}` (expected `gd`, `sgd` or `adam`)")]
    UnknownOptimizer(String),
    #[error("unrecognized global selection `{0}` (expected `last` or `lowest_residual`)")]
    UnknownSelection(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("sample pattern boundary violation: {0}")]
    ScheduleOrder(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while restoring a single image.
#[derive(Debug, Error)]
pub enum RestoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("shape mismatch: expected {expected:?} (w, h), got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("unsupported tensor rank {0} (expected 2, 3 or 4)")]
    UnsupportedRank(usize),
    #[error("tensor of shape {shape:?} needs {expected} elements, got {actual}")]
    TensorLength {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
    #[error("unsupported channel count {0} for an RGB-D tensor (expected 4)")]
    ChannelCount(usize),
    #[error("unsupported batch size {0} (one image per restoration)")]
    BatchSize(usize),
    #[error("denoiser failed at timestep {timestep}: {message}")]
    Denoiser { timestep: usize, message: String },
    #[error("image i/o: {0}")]
    Io(String),
}

impl RestoreError {
    pub(crate) fn check_dims(expected: (usize, usize), actual: (usize, usize)) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::ShapeMismatch { expected, actual })
        }
    }
}
