#![deny(missing_docs)]

//! Core library for the studydesk document-processing server.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// Text extraction strategies per file type.
pub mod extract;
/// Generative adapter for notes, summaries, and quizzes.
pub mod generate;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline orchestrator tying extraction, generation, and indexing together.
pub mod pipeline;
/// Qdrant vector store integration.
pub mod qdrant;
/// Fire-and-forget job queue for pipeline units.
pub mod queue;
/// Shared handles to the external AI services.
pub mod services;
/// Blob store for uploaded file bytes.
pub mod storage;
/// Entities and the repository seam.
pub mod store;
