pub mod engine;
pub mod pipeline;

pub use crate::domain::model::{BatchResult, DiagnosisRecord, RecognizedLine, ScannedForm};
pub use crate::domain::ports::{ConfigProvider, OcrClient, Pipeline, Storage};
pub use crate::utils::error::Result;
