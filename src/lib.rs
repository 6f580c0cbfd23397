pub mod chat;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod llm;
pub mod outlet;
pub mod pipeline;
pub mod retrieval;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{PipelineContext, PipelineError, PipelineOutcome, run_pipeline, spawn_pipeline};
