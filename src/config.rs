use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the studydesk server.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Directory where uploaded file bytes are stored.
    pub upload_dir: PathBuf,
    /// Base URL of the Qdrant instance holding document embeddings.
    /// When unset the similarity index is reported as unavailable.
    pub qdrant_url: Option<String>,
    /// Name of the Qdrant collection used for document vectors.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Base URL of the Ollama runtime backing generation and embeddings.
    /// When unset the generative adapter is reported as unavailable.
    pub ollama_url: Option<String>,
    /// Model identifier used for notes, summary, and quiz generation.
    pub generation_model: String,
    /// Number of results returned by semantic search queries.
    pub search_top_k: usize,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic byte-folding encoder, useful without a model runtime.
    Hash,
}

impl Config {
    /// Load configuration from environment variables, applying defaults for
    /// everything except the external service endpoints.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            upload_dir: PathBuf::from(
                load_env_optional("UPLOAD_DIR").unwrap_or_else(|| "uploads".to_string()),
            ),
            qdrant_url: load_env_optional("QDRANT_URL"),
            qdrant_collection_name: load_env_optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| "documents".to_string()),
            qdrant_api_key: load_env_optional("QDRANT_API_KEY"),
            embedding_provider: load_env_optional("EMBEDDING_PROVIDER")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|()| ConfigError::InvalidValue("EMBEDDING_PROVIDER".to_string()))
                })
                .transpose()?
                .unwrap_or(EmbeddingProvider::Hash),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "nomic-embed-text".to_string()),
            embedding_dimension: load_env_optional("EMBEDDING_DIMENSION")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("EMBEDDING_DIMENSION".to_string()))
                })
                .transpose()?
                .unwrap_or(384),
            ollama_url: load_env_optional("OLLAMA_URL"),
            generation_model: load_env_optional("GENERATION_MODEL")
                .unwrap_or_else(|| "llama3.1".to_string()),
            search_top_k: load_env_optional("SEARCH_TOP_K")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SEARCH_TOP_K".to_string()))
                })
                .transpose()?
                .unwrap_or(5),
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "hash" => Ok(Self::Hash),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        qdrant_url = ?config.qdrant_url,
        collection = %config.qdrant_collection_name,
        server_port = ?config.server_port,
        embedding_provider = ?config.embedding_provider,
        generation_model = %config.generation_model,
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}

/// Install a deterministic configuration for tests. Safe to call repeatedly
/// within one test binary; later calls are no-ops.
pub fn ensure_test_config() {
    let _ = CONFIG.set(Config {
        server_port: None,
        upload_dir: PathBuf::from("uploads"),
        qdrant_url: None,
        qdrant_collection_name: "documents-test".into(),
        qdrant_api_key: None,
        embedding_provider: EmbeddingProvider::Hash,
        embedding_model: "test-model".into(),
        embedding_dimension: 16,
        ollama_url: None,
        generation_model: "test-gen".into(),
        search_top_k: 5,
    });
}
