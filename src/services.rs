//! Process-wide handles to the external AI services.
//!
//! The generative adapter, embedding client, and index client are built once
//! near process start and shared across all concurrently executing pipeline
//! units. A handle that cannot be built from configuration is recorded as
//! unavailable rather than panicking; callers observe `ServiceUnavailable`
//! until the process is restarted with working configuration.

use crate::config::get_config;
use crate::embedding::{EmbeddingClient, get_embedding_client};
use crate::generate::{GenerativeAdapter, OllamaAdapter};
use crate::qdrant::QdrantService;

/// Lazily-initialized, read-mostly service handles shared by pipeline units.
pub struct ServiceHandles {
    adapter: Option<Box<dyn GenerativeAdapter>>,
    embedder: Option<Box<dyn EmbeddingClient + Send + Sync>>,
    index: Option<QdrantService>,
}

impl ServiceHandles {
    /// Build every handle the current configuration allows, logging a warning
    /// for each one left unavailable.
    pub fn from_config() -> Self {
        let config = get_config();

        let adapter: Option<Box<dyn GenerativeAdapter>> = match config.ollama_url.clone() {
            Some(base_url) => Some(Box::new(OllamaAdapter::new(
                base_url,
                config.generation_model.clone(),
            ))),
            None => {
                tracing::warn!("OLLAMA_URL not set; generative adapter unavailable");
                None
            }
        };

        let embedder = get_embedding_client();
        if embedder.is_none() {
            tracing::warn!(
                provider = ?config.embedding_provider,
                "Embedding client unavailable for the configured provider"
            );
        }

        let index = match QdrantService::new() {
            Ok(service) => Some(service),
            Err(error) => {
                tracing::warn!(error = %error, "Similarity index unavailable");
                None
            }
        };

        Self {
            adapter,
            embedder,
            index,
        }
    }

    /// Build handles from explicit parts; used by tests and embedders of the
    /// pipeline that construct their own clients.
    pub fn from_parts(
        adapter: Option<Box<dyn GenerativeAdapter>>,
        embedder: Option<Box<dyn EmbeddingClient + Send + Sync>>,
        index: Option<QdrantService>,
    ) -> Self {
        Self {
            adapter,
            embedder,
            index,
        }
    }

    /// The generative adapter, when initialized.
    pub fn adapter(&self) -> Option<&dyn GenerativeAdapter> {
        self.adapter.as_deref()
    }

    /// The embedding client, when initialized.
    pub fn embedder(&self) -> Option<&(dyn EmbeddingClient + Send + Sync)> {
        self.embedder.as_deref()
    }

    /// The similarity-index client, when initialized.
    pub fn index(&self) -> Option<&QdrantService> {
        self.index.as_ref()
    }

    /// Best-effort index bootstrap: ensure the configured collection and its
    /// owner payload index exist. Failures leave the index handle in place;
    /// individual calls will surface their own errors.
    pub async fn bootstrap_index(&self) {
        let Some(index) = self.index() else {
            return;
        };
        let config = get_config();
        let vector_size = config.embedding_dimension as u64;
        if let Err(error) = index
            .create_collection_if_not_exists(&config.qdrant_collection_name, vector_size)
            .await
        {
            tracing::warn!(error = %error, "Failed to ensure Qdrant collection");
            return;
        }
        if let Err(error) = index
            .ensure_payload_indexes(&config.qdrant_collection_name)
            .await
        {
            tracing::warn!(error = %error, "Failed to ensure Qdrant payload indexes");
        }
        tracing::debug!(collection = %config.qdrant_collection_name, "Primary collection ready");
    }
}
