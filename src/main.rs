use clap::Parser;
use medform_etl::utils::error::{ErrorSeverity, PipelineError};
use medform_etl::utils::{logger, validation::Validate};
use medform_etl::{
    AzureFormClient, BatchEngine, CliConfig, ExtractionConfig, FormPipeline, LocalStorage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::parse();
    config.resolve_env();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting medform-etl");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        fail(e);
    }

    let extraction = match ExtractionConfig::load(config.config_file.as_deref()) {
        Ok(extraction) => extraction,
        Err(e) => fail(e),
    };
    if let Err(e) = extraction.validate() {
        fail(e);
    }

    let (endpoint, api_key) = match config.credentials() {
        Ok(credentials) => credentials,
        Err(e) => fail(e),
    };

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.input_dir.clone());
    let ocr = AzureFormClient::new(
        endpoint,
        api_key,
        extraction.service.model_id.clone(),
        extraction.service.api_version.clone(),
        extraction.poll_interval(),
        extraction.service.max_polls,
    );
    let pipeline = match FormPipeline::new(storage, ocr, config, extraction) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(e),
    };

    let engine = BatchEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Processing completed successfully!");
            println!("✅ Processing completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!("❌ Processing failed: {} (severity: {:?})", e, e.severity());
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = exit_code(e.severity());
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(e: PipelineError) -> ! {
    tracing::error!("❌ {}", e);
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()).max(1));
}
