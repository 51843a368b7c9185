//! Configuration for the question answering service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Filesystem layout
    pub storage: StorageConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval and answer configuration
    pub retrieval: RetrievalConfig,
    /// Per-client rate limiting
    pub rate_limit: RateLimitConfig,
    /// Background ingestion
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read {}: {}", path.display(), e))
                })?;
                toml::from_str::<RagConfig>(&raw).map_err(|e| {
                    Error::Config(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
            None => RagConfig::default(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.retrieval.max_top_k == 0 {
            return Err(Error::Config("retrieval.max_top_k must be > 0".to_string()));
        }
        if self.retrieval.default_top_k == 0
            || self.retrieval.default_top_k > self.retrieval.max_top_k
        {
            return Err(Error::Config(format!(
                "retrieval.default_top_k must be within 1..={}",
                self.retrieval.max_top_k
            )));
        }
        if self.rate_limit.max_requests == 0 || self.rate_limit.window_secs == 0 {
            return Err(Error::Config(
                "rate_limit.max_requests and rate_limit.window_secs must be > 0".to_string(),
            ));
        }
        if self.processing.worker_count == 0 || self.processing.queue_capacity == 0 {
            return Err(Error::Config(
                "processing.worker_count and processing.queue_capacity must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable permissive CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            max_upload_size: 50 * 1024 * 1024,
        }
    }
}

/// Filesystem layout for uploaded documents and the index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Uploaded originals
    pub documents_dir: PathBuf,
    /// Vector index, metadata sidecar and manifest
    pub index_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            documents_dir: data_dir.join("documents"),
            index_dir: data_dir.join("index"),
        }
    }
}

/// Which embedding backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Deterministic in-process feature hashing
    #[default]
    Hashing,
    /// Ollama-compatible `/api/embed` endpoint
    Ollama,
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backend
    pub provider: EmbeddingBackend,
    /// Embedding dimensions (384 for all-MiniLM-L6-v2)
    pub dimensions: usize,
    /// Model name passed to the remote backend
    pub model: String,
    /// Remote backend base URL
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingBackend::Hashing,
            dimensions: 384,
            model: "all-minilm".to_string(),
            base_url: "http://localhost:11434".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Word-window chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
        }
    }
}

/// Retrieval and answer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// top_k used when the request omits it
    pub default_top_k: usize,
    /// Largest accepted top_k
    pub max_top_k: usize,
    /// Shortest accepted question, in characters
    pub min_question_chars: usize,
    /// Characters of retrieved context kept in the answer
    pub answer_max_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 10,
            min_question_chars: 3,
            answer_max_chars: 800,
        }
    }
}

/// Sliding-window rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per identity within the window
    pub max_requests: usize,
    /// Window length in seconds
    pub window_secs: u64,
    /// How often idle identities are evicted
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
            sweep_interval_secs: 60,
        }
    }
}

/// Background ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of ingestion workers
    pub worker_count: usize,
    /// Waiting jobs held before uploads are rejected
    pub queue_capacity: usize,
    /// How long finished jobs stay visible under `/jobs`
    pub job_retention_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            queue_capacity: 1000,
            job_retention_secs: 3600,
        }
    }
}
