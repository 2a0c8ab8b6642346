use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for the extraction run, loadable from a TOML file via
/// `--config`. Every section falls back to the defaults below, which mirror
/// the handwritten-form layouts this tool was built for.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub labels: LabelConfig,
    pub cleanup: CleanupConfig,
    pub input: InputConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Lowercase substrings that mark the diagnosis section.
    pub targets: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                "provisional diagnosis".to_string(),
                "diagnosis".to_string(),
                "dx".to_string(),
                "impression".to_string(),
                "working diagnosis".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    /// Phrases from adjacent form sections that bleed into the captured
    /// line and are dropped.
    pub drop_phrases: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            drop_phrases: vec![
                "proposed treatment".to_string(),
                "treatment plan".to_string(),
                "surgery".to_string(),
                "surgical management".to_string(),
                "icd 10 code".to_string(),
                "next steps".to_string(),
                "proposed line of treatment".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Accepted image file extensions (lowercase, without the dot).
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".to_string(), "jpeg".to_string(), "png".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub model_id: String,
    pub api_version: String,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_id: "prebuilt-layout".to_string(),
            api_version: "2023-07-31".to_string(),
            poll_interval_ms: 1500,
            max_polls: 40,
        }
    }
}

impl ExtractionConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ExtractionConfig =
            toml::from_str(&content).map_err(|e| PipelineError::ConfigError {
                message: format!("{}: {}", path, e),
            })?;
        config.normalize();
        Ok(config)
    }

    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.service.poll_interval_ms)
    }

    /// Label and extension matching is case-insensitive; fold user input
    /// once here rather than on every comparison.
    fn normalize(&mut self) {
        for target in &mut self.labels.targets {
            *target = target.to_lowercase();
        }
        for extension in &mut self.input.extensions {
            *extension = extension.to_lowercase();
        }
    }
}

impl Validate for ExtractionConfig {
    fn validate(&self) -> Result<()> {
        if self.labels.targets.is_empty() {
            return Err(PipelineError::InvalidConfigValueError {
                field: "labels.targets".to_string(),
                value: "[]".to_string(),
                reason: "at least one diagnosis label is required".to_string(),
            });
        }

        if self.input.extensions.is_empty() {
            return Err(PipelineError::InvalidConfigValueError {
                field: "input.extensions".to_string(),
                value: "[]".to_string(),
                reason: "at least one image extension is required".to_string(),
            });
        }

        validate_non_empty_string("service.model_id", &self.service.model_id)?;
        validate_non_empty_string("service.api_version", &self.service.api_version)?;
        validate_range(
            "service.poll_interval_ms",
            self.service.poll_interval_ms,
            100,
            60_000,
        )?;
        validate_positive_number("service.max_polls", self.service.max_polls as usize, 1)?;

        Ok(())
    }
}
