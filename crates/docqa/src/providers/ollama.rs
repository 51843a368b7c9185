//! Ollama embedding provider
//!
//! Sends the whole batch in one `/api/embed` request and normalises the returned vectors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::{l2_normalize, EmbeddingProvider};

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Embedding provider backed by an Ollama-compatible server
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }
}

/// Check the batch size and normalise each vector
///
/// Dimensions are passed through untouched; the index rejects mismatches.
fn into_unit_vectors(response: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    if response.embeddings.len() != expected {
        return Err(Error::embedding(format!(
            "requested {} embeddings, received {}",
            expected,
            response.embeddings.len()
        )));
    }

    Ok(response
        .embeddings
        .into_iter()
        .map(|mut v| {
            l2_normalize(&mut v);
            v
        })
        .collect())
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "{} returned {}: {}",
                self.base_url, status, body
            )));
        }

        let parsed: EmbedResponse = response.json().await?;
        tracing::debug!("Embedded {} texts with {}", texts.len(), self.model);
        into_unit_vectors(parsed, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.get(format!("{}/api/tags", self.base_url)).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(e) => {
                tracing::warn!("Ollama not reachable at {}: {}", self.base_url, e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
