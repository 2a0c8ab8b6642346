/// Placeholder recorded when no diagnosis label was found in a form.
pub const NO_DIAGNOSIS: &str = "No Provisional Diagnosis Extracted";

/// One recognized text line with its bounding polygon, in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub content: String,
    pub polygon: Vec<f64>,
}

impl RecognizedLine {
    pub fn new(content: impl Into<String>, polygon: Vec<f64>) -> Self {
        Self {
            content: content.into(),
            polygon,
        }
    }
}

/// OCR output for one input image, keyed by its file name.
#[derive(Debug, Clone)]
pub struct ScannedForm {
    pub file_name: String,
    pub lines: Vec<RecognizedLine>,
}

/// One output row: the source file and the diagnosis extracted from it.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosisRecord {
    pub file_name: String,
    pub diagnosis: String,
    pub icd10_code: Option<String>,
    pub icd10_description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub records: Vec<DiagnosisRecord>,
    /// Inputs dropped on per-image failures (unreadable, service error, no text).
    pub skipped: usize,
}
