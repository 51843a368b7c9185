//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating unit-length text embeddings
///
/// Implementations:
/// - `HashingEmbedder`: deterministic in-process feature hashing
/// - `OllamaEmbedder`: Ollama-compatible `/api/embed` server
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for a batch of texts, one vector per text, in order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| crate::error::Error::embedding("provider returned no vector"))
    }

    /// Embedding dimensions this provider produces
    fn dimensions(&self) -> usize;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Scale `vector` to unit length in place; zero vectors are left untouched
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}
