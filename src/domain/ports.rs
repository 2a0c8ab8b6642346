use crate::domain::model::{BatchResult, RecognizedLine, ScannedForm};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    /// File names (not paths) directly under the storage root, sorted.
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_dir(&self) -> &str;
    fn output_file(&self) -> &str;
    fn icd10_file(&self) -> Option<&str>;
    fn terms_file(&self) -> Option<&str>;
}

/// Remote handwriting/text recognition over one document's bytes.
pub trait OcrClient: Send + Sync {
    fn analyze(
        &self,
        image: &[u8],
    ) -> impl std::future::Future<Output = Result<Vec<RecognizedLine>>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ScannedForm>>;
    async fn transform(&self, forms: Vec<ScannedForm>) -> Result<BatchResult>;
    async fn load(&self, result: BatchResult) -> Result<String>;
}
