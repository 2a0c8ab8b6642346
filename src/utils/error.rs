use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("OCR request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("OCR service error {code}: {message}")]
    ServiceError { code: String, message: String },

    #[error("OCR operation still running after {attempts} polls")]
    OperationTimeout { attempts: u32 },

    #[error("no text recognized in document")]
    EmptyResult,

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PipelineError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PipelineError::EmptyResult => ErrorSeverity::Low,
            PipelineError::ApiError(_)
            | PipelineError::ServiceError { .. }
            | PipelineError::OperationTimeout { .. } => ErrorSeverity::Medium,
            PipelineError::CsvError(_)
            | PipelineError::IoError(_)
            | PipelineError::SerializationError(_)
            | PipelineError::ProcessingError { .. } => ErrorSeverity::High,
            PipelineError::ConfigError { .. }
            | PipelineError::InvalidConfigValueError { .. }
            | PipelineError::MissingConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PipelineError::ApiError(e) => format!("Could not reach the OCR service: {}", e),
            PipelineError::ServiceError { code, message } => {
                format!("The OCR service reported '{}': {}", code, message)
            }
            PipelineError::OperationTimeout { .. } => {
                "The OCR service did not finish analyzing a document in time".to_string()
            }
            PipelineError::EmptyResult => "The OCR service recognized no text".to_string(),
            PipelineError::CsvError(e) => format!("Could not process tabular data: {}", e),
            PipelineError::IoError(e) => format!("File access failed: {}", e),
            PipelineError::SerializationError(e) => {
                format!("Unexpected response from the OCR service: {}", e)
            }
            PipelineError::ConfigError { message } => format!("Configuration problem: {}", message),
            PipelineError::ProcessingError { message } => message.clone(),
            PipelineError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid {}: {}", field, reason)
            }
            PipelineError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PipelineError::ApiError(_) | PipelineError::OperationTimeout { .. } => {
                "Check network connectivity and the service endpoint, then re-run".to_string()
            }
            PipelineError::ServiceError { .. } => {
                "Verify the API key and that the endpoint region matches the key".to_string()
            }
            PipelineError::EmptyResult => {
                "Check the scanned image is legible and correctly oriented".to_string()
            }
            PipelineError::CsvError(_) | PipelineError::SerializationError(_) => {
                "Re-run with --verbose and inspect the offending record".to_string()
            }
            PipelineError::IoError(_) => {
                "Check the folder exists and is readable/writable".to_string()
            }
            PipelineError::ConfigError { .. }
            | PipelineError::InvalidConfigValueError { .. }
            | PipelineError::MissingConfigError { .. } => {
                "Run with --help to see the expected arguments and config format".to_string()
            }
            PipelineError::ProcessingError { .. } => {
                "Re-run with --verbose for the full processing trace".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
