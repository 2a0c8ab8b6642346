pub mod extraction;

pub use extraction::ExtractionConfig;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_required_field,
    validate_url, Validate,
};
use clap::Parser;
use std::path::Path;

pub const ENDPOINT_ENV: &str = "AZURE_FORM_RECOGNIZER_ENDPOINT";
pub const API_KEY_ENV: &str = "AZURE_FORM_RECOGNIZER_KEY";

#[derive(Clone, Parser)]
#[command(name = "medform-etl")]
#[command(about = "Extracts the provisional diagnosis from scanned medical forms into a spreadsheet")]
pub struct CliConfig {
    /// Folder containing the scanned form images to process
    pub input_dir: String,

    /// Document Intelligence endpoint (or AZURE_FORM_RECOGNIZER_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Document Intelligence API key (or AZURE_FORM_RECOGNIZER_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Output file name, written into the input folder; supports a
    /// {timestamp} placeholder
    #[arg(long, default_value = "output_diagnoses.csv")]
    pub output: String,

    /// TOML file overriding labels, cleanup phrases and service settings
    #[arg(long = "config")]
    pub config_file: Option<String>,

    /// ICD-10 level-3 code table (CSV); adds code columns to the output
    #[arg(long)]
    pub icd10_file: Option<String>,

    /// Known medical terms, one per line; enables OCR misread correction
    #[arg(long)]
    pub terms_file: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Report process resource usage at end of run")]
    pub monitor: bool,
}

impl CliConfig {
    /// Fill endpoint and key from the environment when not given on the
    /// command line.
    pub fn resolve_env(&mut self) {
        if self.endpoint.is_none() {
            self.endpoint = std::env::var(ENDPOINT_ENV).ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var(API_KEY_ENV).ok();
        }
    }

    pub fn credentials(&self) -> Result<(String, String)> {
        let endpoint = validate_required_field("endpoint", &self.endpoint)?;
        let api_key = validate_required_field("api_key", &self.api_key)?;
        Ok((endpoint.clone(), api_key.clone()))
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        let (endpoint, api_key) = self.credentials()?;
        validate_url("endpoint", &endpoint)?;
        validate_non_empty_string("api_key", &api_key)?;

        validate_path("input_dir", &self.input_dir)?;
        if !Path::new(&self.input_dir).is_dir() {
            return Err(PipelineError::InvalidConfigValueError {
                field: "input_dir".to_string(),
                value: self.input_dir.clone(),
                reason: "not a readable directory".to_string(),
            });
        }

        validate_path("output", &self.output)?;

        if let Some(file) = &self.icd10_file {
            validate_file_extensions("icd10_file", std::slice::from_ref(file), &["csv"])?;
        }
        if let Some(file) = &self.terms_file {
            validate_file_extensions("terms_file", std::slice::from_ref(file), &["txt"])?;
        }
        if let Some(file) = &self.config_file {
            validate_file_extensions("config", std::slice::from_ref(file), &["toml"])?;
        }

        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn input_dir(&self) -> &str {
        &self.input_dir
    }

    fn output_file(&self) -> &str {
        &self.output
    }

    fn icd10_file(&self) -> Option<&str> {
        self.icd10_file.as_deref()
    }

    fn terms_file(&self) -> Option<&str> {
        self.terms_file.as_deref()
    }
}

// The API key must not end up in debug logs.
impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("input_dir", &self.input_dir)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("output", &self.output)
            .field("config_file", &self.config_file)
            .field("icd10_file", &self.icd10_file)
            .field("terms_file", &self.terms_file)
            .field("verbose", &self.verbose)
            .field("monitor", &self.monitor)
            .finish()
    }
}
