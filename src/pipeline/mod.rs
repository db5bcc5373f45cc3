//! Document-processing pipeline: orchestrator and error taxonomy.

mod service;
mod types;

pub use service::PipelineService;
pub use types::PipelineError;
