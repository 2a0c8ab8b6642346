use crate::config::ExtractionConfig;
use crate::core::{BatchResult, ConfigProvider, OcrClient, Pipeline, ScannedForm, Storage};
use crate::domain::model::{DiagnosisRecord, NO_DIAGNOSIS};
use crate::domain::services::{find_diagnosis_line, Icd10Table, Lexicon, TextCleaner};
use crate::utils::error::{PipelineError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// The scanned-form pipeline: list images, recognize each through the OCR
/// port one at a time, pull the diagnosis out of the recognized lines, and
/// write the table back through the storage port.
pub struct FormPipeline<S: Storage, C: ConfigProvider, O: OcrClient> {
    storage: S,
    ocr: O,
    config: C,
    extraction: ExtractionConfig,
    cleaner: TextCleaner,
    // Inputs dropped during extract, reported by transform.
    skipped: AtomicUsize,
}

impl<S: Storage, C: ConfigProvider, O: OcrClient> FormPipeline<S, C, O> {
    pub fn new(storage: S, ocr: O, config: C, extraction: ExtractionConfig) -> Result<Self> {
        let cleaner = TextCleaner::new(&extraction.cleanup.drop_phrases)?;
        Ok(Self {
            storage,
            ocr,
            config,
            extraction,
            cleaner,
            skipped: AtomicUsize::new(0),
        })
    }

    fn is_image(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extraction.input.extensions.iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    async fn scan_one(&self, name: &str) -> Result<ScannedForm> {
        tracing::info!("Processing file: {}", name);
        let bytes = self.storage.read_file(name).await?;
        let lines = self.ocr.analyze(&bytes).await?;
        tracing::debug!("{}: {} recognized lines", name, lines.len());
        Ok(ScannedForm {
            file_name: name.to_string(),
            lines,
        })
    }

    fn resolved_output_name(&self) -> String {
        self.config.output_file().replace(
            "{timestamp}",
            &chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string(),
        )
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, O: OcrClient> Pipeline for FormPipeline<S, C, O> {
    async fn extract(&self) -> Result<Vec<ScannedForm>> {
        let names: Vec<String> = self
            .storage
            .list_files()
            .await?
            .into_iter()
            .filter(|name| self.is_image(name))
            .collect();

        if names.is_empty() {
            tracing::warn!("No image files found in {}", self.config.input_dir());
            return Ok(Vec::new());
        }

        tracing::info!("Found {} image files", names.len());

        // One document at a time; each result is awaited before the next
        // submission so the service never sees more than one in flight.
        let mut forms = Vec::with_capacity(names.len());
        for name in &names {
            match self.scan_one(name).await {
                Ok(form) => forms.push(form),
                Err(e) => {
                    self.skipped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Skipping {}: {}", name, e);
                }
            }
        }

        Ok(forms)
    }

    async fn transform(&self, forms: Vec<ScannedForm>) -> Result<BatchResult> {
        let lexicon = match self.config.terms_file() {
            Some(path) => {
                let lexicon = Lexicon::from_file(path)?;
                tracing::info!("Loaded {} medical terms from {}", lexicon.len(), path);
                Some(lexicon)
            }
            None => None,
        };

        let icd10 = match self.config.icd10_file() {
            Some(path) => {
                let table = Icd10Table::from_file(path)?;
                tracing::info!("Loaded {} ICD-10 entries from {}", table.len(), path);
                Some(table)
            }
            None => None,
        };

        let mut records = Vec::with_capacity(forms.len());
        for form in forms {
            let diagnosis = match find_diagnosis_line(&form.lines, &self.extraction.labels.targets)
            {
                Some(raw) => {
                    let mut cleaned = self.cleaner.clean(&raw);
                    if let Some(lexicon) = &lexicon {
                        let (corrected, changed) = lexicon.correct(&cleaned);
                        if changed {
                            tracing::debug!(
                                "{}: corrected '{}' -> '{}'",
                                form.file_name,
                                cleaned,
                                corrected
                            );
                        }
                        cleaned = corrected;
                    }
                    if cleaned.is_empty() {
                        NO_DIAGNOSIS.to_string()
                    } else {
                        cleaned
                    }
                }
                None => NO_DIAGNOSIS.to_string(),
            };

            let (icd10_code, icd10_description) = match &icd10 {
                Some(table) if diagnosis != NO_DIAGNOSIS => match table.match_diagnosis(&diagnosis)
                {
                    Some(entry) => (Some(entry.code.clone()), Some(entry.description.clone())),
                    None => (None, None),
                },
                _ => (None, None),
            };

            tracing::info!("{}: {}", form.file_name, diagnosis);
            records.push(DiagnosisRecord {
                file_name: form.file_name,
                diagnosis,
                icd10_code,
                icd10_description,
            });
        }

        Ok(BatchResult {
            records,
            skipped: self.skipped.load(Ordering::Relaxed),
        })
    }

    async fn load(&self, result: BatchResult) -> Result<String> {
        let with_icd10 = self.config.icd10_file().is_some();

        let mut writer = csv::Writer::from_writer(Vec::new());
        if with_icd10 {
            writer.write_record([
                "file_name",
                "provisional_diagnosis",
                "icd10_code",
                "icd10_description",
            ])?;
        } else {
            writer.write_record(["file_name", "provisional_diagnosis"])?;
        }

        for record in &result.records {
            if with_icd10 {
                writer.write_record([
                    record.file_name.as_str(),
                    record.diagnosis.as_str(),
                    record.icd10_code.as_deref().unwrap_or(""),
                    record.icd10_description.as_deref().unwrap_or(""),
                ])?;
            } else {
                writer.write_record([record.file_name.as_str(), record.diagnosis.as_str()])?;
            }
        }

        let data = writer
            .into_inner()
            .map_err(|e| PipelineError::ProcessingError {
                message: format!("CSV buffer error: {}", e),
            })?;

        let file_name = self.resolved_output_name();
        tracing::debug!(
            "Writing {} rows ({} bytes) to {}",
            result.records.len(),
            data.len(),
            file_name
        );
        self.storage.write_file(&file_name, &data).await?;

        Ok(format!(
            "{}/{}",
            self.config.input_dir().trim_end_matches('/'),
            file_name
        ))
    }
}
