pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{azure::AzureFormClient, storage::LocalStorage};
pub use config::{CliConfig, ExtractionConfig};
pub use core::{engine::BatchEngine, pipeline::FormPipeline};
pub use utils::error::{PipelineError, Result};
