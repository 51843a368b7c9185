//! Deterministic feature-hashing embedder
//!
//! Each lowercase word token is hashed with SHA-256 into one of `dimensions` buckets
//! with a sign bit, then the vector is L2-normalised. Texts sharing vocabulary land
//! close together, which is enough for offline use and tests.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;

use super::embedding::{l2_normalize, EmbeddingProvider};

/// In-process embedder with no model download
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed one text synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text.split_whitespace() {
            let token: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect();
            if token.is_empty() {
                continue;
            }

            let digest = Sha256::digest(token.as_bytes());
            let bucket = u64::from_le_bytes([
                digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6],
                digest[7],
            ]) % self.dimensions as u64;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket as usize] += sign;
        }

        l2_normalize(&mut vector);
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "hashing"
    }
}
