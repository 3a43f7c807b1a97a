use crate::error::ConfigError;
use crate::schedule::{PcgsPattern, SamplePattern, Window};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SamplePatternConfig {
    pub pattern: String,
    #[serde(default, rename = "global_N")]
    pub global_n: Option<usize>,
    #[serde(default, rename = "local_M")]
    pub local_m: Option<usize>,
    #[serde(default)]
    pub start_guidance: Option<f64>,
    #[serde(default)]
    pub stop_guidance: Option<f64>,
    #[serde(default)]
    pub update_start: Option<f64>,
    #[serde(default)]
    pub update_end: Option<f64>,
    #[serde(default)]
    pub s_start: Option<f64>,
    #[serde(default)]
    pub s_end: Option<f64>,
}

impl Default for SamplePatternConfig {
    fn default() -> Self {
        Self {
            pattern: "original".to_string(),
            global_n: None,
            local_m: None,
            start_guidance: None,
            stop_guidance: None,
            update_start: None,
            update_end: None,
            s_start: None,
            s_end: None,
        }
    }
}

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ConfigError> {
    value.ok_or(ConfigError::MissingField(field))
}

impl SamplePatternConfig {
    pub fn resolve(&self) -> Result<SamplePattern, ConfigError> {
        let pattern = match self.pattern.as_str() {
            "original" => SamplePattern::Original,
            "pcgs" => {
                let alternation = match (self.s_start, self.s_end) {
                    (Some(start), Some(end)) => Some(Window::new(start, end)),
                    (None, None) => None,
                    (None, Some(_)) => return Err(ConfigError::MissingField("sample_pattern.s_start")),
                    (Some(_), None) => return Err(ConfigError::MissingField("sample_pattern.s_end")),
                };
                SamplePattern::Pcgs(PcgsPattern {
                    global_n: required(self.global_n, "sample_pattern.global_N")?,
                    local_m: required(self.local_m, "sample_pattern.local_M")?,
                    guidance: Window::new(
                        required(self.start_guidance, "sample_pattern.start_guidance")?,
                        required(self.stop_guidance, "sample_pattern.stop_guidance")?,
                    ),
                    update: Window::new(
                        required(self.update_start, "sample_pattern.update_start")?,
                        required(self.update_end, "sample_pattern.update_end")?,
                    ),
                    alternation,
                })
            }
            other => return Err(ConfigError::UnknownPattern(other.to_string())),
        };
        pattern.validate()?;
        Ok(pattern)
    }
}
