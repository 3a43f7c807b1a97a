//! Guidance schedule controller.
//!
//! [`decide`] maps a timestep of the reverse process to a single
//! [`GuidanceDecision`]. Timesteps count down from `T - 1` to `0` and every
//! window boundary is a fraction of `T`. A timestep `t` lies inside the window
//! `[lo·T, hi·T]` unless `t > hi·T` or `t < lo·T`; boundaries are inclusive.
//!
//! Decision table (first match wins):
//!
//! | condition                                  | decision            |
//! |--------------------------------------------|---------------------|
//! | pattern `original`                         | `Active { 1 }`      |
//! | outside `[stop_guidance, start_guidance]`  | `Unguided`          |
//! | outside `[update_end, update_start]`       | `Frozen`            |
//! | outside `[s_end, s_start]` (if configured) | `Active { 1 }`      |
//! | otherwise                                  | `Active { local_M }`|
use crate::error::ConfigError;
use serde::Serialize;

/// Fractional window `[end·T, start·T]` over descending timesteps.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub fn contains(&self, t: usize, total: usize) -> bool {
        // f64 keeps exact boundaries such as 0.3 · 50 inclusive.
        let t = t as f64;
        let total = total as f64;
        !(t > self.start * total || t < self.end * total)
    }
}

/// Parameters of the alternating `pcgs` pattern.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PcgsPattern {
    pub global_n: usize,
    pub local_m: usize,
    pub guidance: Window,
    pub update: Window,
    /// Wider alternation window; `None` disables rule 4.
    pub alternation: Option<Window>,
}

impl PcgsPattern {
    /// Check the boundary invariants once, at configuration time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut fractions = vec![
            ("sample_pattern.start_guidance", self.guidance.start),
            ("sample_pattern.stop_guidance", self.guidance.end),
            ("sample_pattern.update_start", self.update.start),
            ("sample_pattern.update_end", self.update.end),
        ];
        if let Some(s) = self.alternation {
            fractions.push(("sample_pattern.s_start", s.start));
            fractions.push(("sample_pattern.s_end", s.end));
        }
        for (field, v) in fractions {
            if !(0.0..=1.0).contains(&v) {
                return Err(ConfigError::invalid(field, format!("{v} is outside [0, 1]")));
            }
        }
        if self.local_m == 0 {
            return Err(ConfigError::invalid("sample_pattern.local_M", "must be at least 1"));
        }
        if self.global_n == 0 {
            return Err(ConfigError::invalid("sample_pattern.global_N", "must be at least 1"));
        }
        if self.guidance.start < self.guidance.end {
            return Err(ConfigError::ScheduleOrder(format!(
                "start_guidance {} < stop_guidance {}",
                self.guidance.start, self.guidance.end
            )));
        }
        if self.update.start <= self.update.end {
            return Err(ConfigError::ScheduleOrder(format!(
                "update_start {} must be greater than update_end {}",
                self.update.start, self.update.end
            )));
        }
        if let Some(s) = self.alternation {
            if s.start <= s.end {
                return Err(ConfigError::ScheduleOrder(format!(
                    "s_start {} must be greater than s_end {}",
                    s.start, s.end
                )));
            }
            if self.local_m > 1 && (s.start < self.update.start || s.end > self.update.end) {
                return Err(ConfigError::ScheduleOrder(format!(
                    "with local_M > 1 the window [{}, {}] must enclose the update window [{}, {}]",
                    s.end, s.start, self.update.end, self.update.start
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "pattern", rename_all = "camelCase")]
pub enum SamplePattern {
    /// No physical parameter schedule: guidance on every step, one iteration.
    Original,
    Pcgs(PcgsPattern),
}

impl SamplePattern {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Original => Ok(()),
            Self::Pcgs(p) => p.validate(),
        }
    }

    /// Number of outer restoration runs per image.
    pub fn global_iterations(&self) -> usize {
        match self {
            Self::Original => 1,
            Self::Pcgs(p) => p.global_n,
        }
    }
}

/// What guidance does at one timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum GuidanceDecision {
    /// Outside the guidance window: the unguided estimate is used as is.
    Unguided,
    /// Parameters are fixed; one image-only refinement step.
    Frozen,
    /// Joint refinement of image and parameters, `iterations` times.
    Active { iterations: usize },
}

impl GuidanceDecision {
    pub fn is_frozen(&self) -> bool {
        !matches!(self, Self::Active { .. })
    }

    /// Number of inner refine iterations reported for this step.
    pub fn alternation(&self) -> usize {
        match *self {
            Self::Active { iterations } => iterations,
            Self::Unguided | Self::Frozen => 1,
        }
    }

    /// Refine calls the orchestrator runs and whether they update parameters.
    pub fn refine_plan(&self) -> (usize, bool) {
        match *self {
            Self::Unguided => (0, false),
            Self::Frozen => (1, false),
            Self::Active { iterations } => (iterations, true),
        }
    }
}

/// Decide guidance for timestep `t` of `total`.
///
/// A validated pattern with `local_M > 1` has the alternation window
/// enclosing the update window, and with `local_M == 1` rules 4 and 5 agree,
/// so the alternation window never changes the outcome of a validated
/// pattern. It is still checked for patterns built by hand.
pub fn decide(pattern: &SamplePattern, t: usize, total: usize) -> GuidanceDecision {
    let p = match pattern {
        SamplePattern::Original => return GuidanceDecision::Active { iterations: 1 },
        SamplePattern::Pcgs(p) => p,
    };
    if !p.guidance.contains(t, total) {
        return GuidanceDecision::Unguided;
    }
    if !p.update.contains(t, total) {
        return GuidanceDecision::Frozen;
    }
    if let Some(s) = p.alternation {
        if !s.contains(t, total) {
            return GuidanceDecision::Active { iterations: 1 };
        }
    }
    GuidanceDecision::Active {
        iterations: p.local_m,
    }
}
