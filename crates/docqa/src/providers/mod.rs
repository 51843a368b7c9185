//! Embedding providers
//!
//! The pipelines only see the [`EmbeddingProvider`] trait, so the in-process hashing
//! embedder and a remote Ollama model are interchangeable.

pub mod embedding;
pub mod hashing;
pub mod ollama;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, EmbeddingConfig};

pub use embedding::{l2_normalize, EmbeddingProvider};
pub use hashing::HashingEmbedder;
pub use ollama::OllamaEmbedder;

/// Build the embedding provider selected in configuration
pub fn from_config(config: &EmbeddingConfig) -> crate::Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingBackend::Hashing => Arc::new(HashingEmbedder::new(config.dimensions)),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(config)?),
    };
    tracing::info!(
        "Embedding provider: {} ({} dimensions)",
        provider.name(),
        provider.dimensions()
    );
    Ok(provider)
}
