pub mod config;
mod orchestrator;
mod types;

pub use config::ProcessConfig;
pub use orchestrator::{process_reconstruction, process_reconstruction_reported};
pub use types::{NoOpReporter, PipelineStage, ProcessedImage, ProgressReporter};
