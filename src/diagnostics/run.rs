use crate::diagnostics::TimingBreakdown;
use crate::physics::PhysicalParameters;
use crate::schedule::GuidanceDecision;
use nalgebra::Vector3;
use serde::Serialize;

/// Guidance activity at one timestep of one global iteration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub global_iteration: usize,
    pub timestep: usize,
    pub decision: GuidanceDecision,
    /// Refine calls actually executed.
    pub iterations: usize,
    /// Residual of the last refine call, if any ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual: Option<f32>,
    pub degenerate: bool,
}

/// Outcome of one outer (global) iteration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalSummary {
    pub index: usize,
    pub seed: u64,
    pub final_norm_loss: f32,
    pub parameter_updates: usize,
    pub degenerate_steps: usize,
}

fn channels(v: Vector3<f32>) -> [f32; 3] {
    [v[0], v[1], v[2]]
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterEntry {
    pub name: String,
    pub lr: f32,
    pub initial: [f32; 3],
    #[serde(rename = "final")]
    pub final_value: [f32; 3],
}

/// Initial and final value of every learnable parameter.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterReport {
    pub entries: Vec<ParameterEntry>,
}

impl ParameterReport {
    pub fn compare(initial: &PhysicalParameters, last: &PhysicalParameters) -> Self {
        let entries = initial
            .iter()
            .map(|p| {
                let final_value = last.get(p.name).map_or(p.value, |q| q.value);
                ParameterEntry {
                    name: p.name.to_string(),
                    lr: p.lr,
                    initial: channels(p.value),
                    final_value: channels(final_value),
                }
            })
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ParameterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDescriptor {
    pub width: usize,
    pub height: usize,
    pub timesteps: usize,
    pub global_iterations: usize,
}

/// End-to-end trace of one image restoration.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunTrace {
    pub input: InputDescriptor,
    pub timings: TimingBreakdown,
    pub steps: Vec<StepRecord>,
    pub globals: Vec<GlobalSummary>,
    pub selected_global: usize,
    pub parameters: ParameterReport,
}

impl RunTrace {
    pub fn degenerate_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.degenerate).count()
    }

    /// Steps of the selected global iteration.
    pub fn selected_steps(&self) -> impl Iterator<Item = &StepRecord> {
        let g = self.selected_global;
        self.steps.iter().filter(move |s| s.global_iteration == g)
    }
}
