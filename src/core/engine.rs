use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs the three pipeline stages in order and reports per-stage progress.
pub struct BatchEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> BatchEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Recognizing text...");
        let forms = self.pipeline.extract().await?;
        tracing::info!("Recognized text in {} forms", forms.len());
        self.monitor.sample();

        tracing::info!("Extracting diagnoses...");
        let result = self.pipeline.transform(forms).await?;
        tracing::info!(
            "Extracted {} records ({} inputs skipped)",
            result.records.len(),
            result.skipped
        );
        self.monitor.sample();

        tracing::info!("Writing spreadsheet...");
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("Output saved to: {}", output_path);

        self.monitor.log_summary();

        Ok(output_path)
    }
}
