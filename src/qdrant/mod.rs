//! Qdrant similarity-index integration.

mod client;
mod types;

pub use client::QdrantService;
pub use types::{QdrantError, ScoredPoint};
