// src/main.rs
mod extractors;
mod llm;
mod metrics;
mod model;
mod pipeline;
mod store;
mod utils;

use clap::Parser;
use llm::{LlmClient, LlmConfig};
use pipeline::ExtractionOrchestrator;
use store::FsStore;
use utils::AppError;

/// Command Line Interface for the financial-document extraction pipeline
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Upload id to process
    #[arg(short, long)]
    upload_id: String,

    /// Base directory holding uploads/, objects/ and records/
    #[arg(short, long, default_value = "./data")]
    data_dir: String,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Setup Logging (reads RUST_LOG env var)
    utils::logging::setup_logging();

    // 2. Parse CLI Arguments
    let args = Args::parse();
    tracing::info!("Starting extraction for args: {:?}", args);

    // 3. Initialize collaborators
    let store = FsStore::new(&args.data_dir)?;
    let objects = FsStore::new(&args.data_dir)?;
    let llm = LlmClient::new(LlmConfig::from_env())?;

    // 4. Run the pipeline for this upload
    let mut orchestrator = ExtractionOrchestrator::new(store, objects, llm);
    match orchestrator.process_upload(&args.upload_id).await {
        Ok(summary) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .unwrap_or_else(|_| "{\"success\":true}".to_string())
            );
            tracing::info!(
                "Processing finished. Years extracted: {}, saved: {}",
                summary.years_extracted,
                summary.saved_records
            );
            Ok(())
        }
        Err(failure) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&failure)
                    .unwrap_or_else(|_| "{\"success\":false}".to_string())
            );
            Err(AppError::Processing(failure.error))
        }
    }
}
