//! Diagnostics data model returned with every restoration.
//!
//! [`RunTrace`] is the entry point: input dimensions, stage timings, one
//! [`StepRecord`] per timestep and global iteration, per-iteration summaries
//! and the [`ParameterReport`]. All types serialize to camelCase JSON.

pub mod run;
pub mod timing;

pub use run::{
    GlobalSummary, InputDescriptor, ParameterEntry, ParameterReport, RunTrace, StepRecord,
};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
