use super::ConfigError;
use crate::shared::logging::LogLevel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_TOKENS: u32 = 900;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const DEFAULT_INTELLIGENCE_PRIORITY: f64 = 0.9;
pub const DEFAULT_SAMPLING_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_INITIAL_ANSWER: &str = "1";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a rigorous verification engine. Critique the candidate answer, then supply the corrected result following the schema.";

fn default_model_hints() -> Vec<String> {
    vec!["claude".to_string(), "gpt".to_string()]
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SamplingSettings {
    #[serde(default = "SamplingSettings::default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "SamplingSettings::default_temperature")]
    pub temperature: f64,
    #[serde(default = "SamplingSettings::default_intelligence_priority")]
    pub intelligence_priority: f64,
    #[serde(default = "default_model_hints")]
    pub model_hints: Vec<String>,
    #[serde(default = "SamplingSettings::default_system_prompt")]
    pub system_prompt: String,
    #[serde(default = "SamplingSettings::default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl SamplingSettings {
    fn default_max_tokens() -> u32 {
        DEFAULT_MAX_TOKENS
    }

    fn default_temperature() -> f64 {
        DEFAULT_TEMPERATURE
    }

    fn default_intelligence_priority() -> f64 {
        DEFAULT_INTELLIGENCE_PRIORITY
    }

    fn default_system_prompt() -> String {
        DEFAULT_SYSTEM_PROMPT.to_string()
    }

    fn default_timeout_seconds() -> u64 {
        DEFAULT_SAMPLING_TIMEOUT_SECONDS
    }
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            intelligence_priority: DEFAULT_INTELLIGENCE_PRIORITY,
            model_hints: default_model_hints(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            timeout_seconds: DEFAULT_SAMPLING_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowSettings {
    #[serde(default = "WorkflowSettings::default_max_iterations")]
    pub default_max_iterations: u32,
    #[serde(default = "WorkflowSettings::default_fallback_initial_answer")]
    pub fallback_initial_answer: String,
}

impl WorkflowSettings {
    fn default_max_iterations() -> u32 {
        DEFAULT_MAX_ITERATIONS
    }

    fn default_fallback_initial_answer() -> String {
        DEFAULT_INITIAL_ANSWER.to_string()
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_max_iterations: DEFAULT_MAX_ITERATIONS,
            fallback_initial_answer: DEFAULT_INITIAL_ANSWER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingSettings {
    #[serde(default = "LoggingSettings::default_level")]
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl LoggingSettings {
    fn default_level() -> LogLevel {
        LogLevel::Info
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            file: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub workflow: WorkflowSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ServerSettings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|source| ConfigError::Encode { source })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let sampling = &self.sampling;
        if sampling.max_tokens == 0 {
            return Err(ConfigError::Settings(
                "`sampling.max_tokens` must be greater than zero".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&sampling.temperature) {
            return Err(ConfigError::Settings(format!(
                "`sampling.temperature` must be within 0..=2, got {}",
                sampling.temperature
            )));
        }
        if !(0.0..=1.0).contains(&sampling.intelligence_priority) {
            return Err(ConfigError::Settings(format!(
                "`sampling.intelligence_priority` must be within 0..=1, got {}",
                sampling.intelligence_priority
            )));
        }
        if sampling.model_hints.iter().any(|hint| hint.trim().is_empty()) {
            return Err(ConfigError::Settings(
                "`sampling.model_hints` entries must be non-empty".to_string(),
            ));
        }
        if sampling.system_prompt.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`sampling.system_prompt` must be non-empty".to_string(),
            ));
        }
        if sampling.timeout_seconds == 0 {
            return Err(ConfigError::Settings(
                "`sampling.timeout_seconds` must be greater than zero".to_string(),
            ));
        }
        if self.workflow.default_max_iterations == 0 {
            return Err(ConfigError::Settings(
                "`workflow.default_max_iterations` must be at least 1".to_string(),
            ));
        }
        if self.workflow.fallback_initial_answer.is_empty() {
            return Err(ConfigError::Settings(
                "`workflow.fallback_initial_answer` must be non-empty".to_string(),
            ));
        }
        if let Some(file) = &self.logging.file {
            if !file.is_absolute() {
                return Err(ConfigError::Settings(
                    "`logging.file` must be an absolute path".to_string(),
                ));
            }
        }
        Ok(())
    }
}
