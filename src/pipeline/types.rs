//! Error taxonomy for the document-processing pipeline.

use crate::embedding::EmbeddingError;
use crate::extract::ExtractError;
use crate::generate::AdapterError;
use crate::qdrant::QdrantError;
use crate::storage::StorageError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors emitted by the pipeline orchestrator.
///
/// The orchestrator matches on the kind only to pick the audit-log level and
/// message; control flow is the same on every failure path.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Extraction strategy missing or failed; covers both the unsupported
    /// file-type precondition and runtime read/parse failures.
    #[error("{0}")]
    Extraction(#[from] ExtractError),
    /// A required service handle was never initialized. Retrying without
    /// re-initialization cannot succeed.
    #[error("Service unavailable: {0} is not initialized")]
    ServiceUnavailable(&'static str),
    /// The generative adapter failed or returned malformed output.
    #[error("{0}")]
    Generation(#[from] AdapterError),
    /// The embedding provider failed.
    #[error("{0}")]
    Embedding(#[from] EmbeddingError),
    /// The similarity index rejected a request.
    #[error("Index request failed: {0}")]
    Index(#[from] QdrantError),
    /// The repository rejected a request.
    #[error("{0}")]
    Store(#[from] StoreError),
    /// The blob store rejected a request.
    #[error("{0}")]
    Storage(#[from] StorageError),
}
