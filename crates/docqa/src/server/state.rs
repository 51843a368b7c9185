//! Application state for the question answering server

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::{AnswerGenerator, TemplateAnswerGenerator};
use crate::ingestion::{IngestPipeline, TextChunker};
use crate::processing::{IngestionWorker, JobQueue};
use crate::providers::{self, EmbeddingProvider};
use crate::rate_limit::RateLimiter;
use crate::retrieval::{IndexManager, RetrievalPipeline};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    /// Shared vector index and chunk records
    index: Arc<IndexManager>,
    embedder: Arc<dyn EmbeddingProvider>,
    retrieval: RetrievalPipeline,
    /// Job queue for background ingestion
    job_queue: Arc<JobQueue>,
    rate_limiter: RateLimiter,
    /// Ingestion worker tasks
    workers: Vec<JoinHandle<()>>,
    /// Set once the server starts accepting connections
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state and start the ingestion workers
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            "Initializing application state (embeddings: {:?}, {} dimensions)",
            config.embeddings.provider,
            config.embeddings.dimensions
        );

        std::fs::create_dir_all(&config.storage.documents_dir)?;

        let index = Arc::new(IndexManager::open(
            &config.storage.index_dir,
            config.embeddings.dimensions,
        )?);

        let embedder = providers::from_config(&config.embeddings)?;

        let generator: Arc<dyn AnswerGenerator> =
            Arc::new(TemplateAnswerGenerator::new(config.retrieval.answer_max_chars));

        let retrieval = RetrievalPipeline::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            generator,
            config.retrieval.clone(),
        );

        let ingest = Arc::new(IngestPipeline::new(
            TextChunker::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            Arc::clone(&embedder),
            Arc::clone(&index),
        ));

        let (job_queue, receiver) = JobQueue::new(
            config.processing.worker_count,
            config.processing.queue_capacity,
        );
        let job_queue = Arc::new(job_queue);
        let workers = IngestionWorker::spawn_pool(
            config.processing.worker_count,
            ingest,
            Arc::clone(&job_queue),
            receiver,
        );

        let rate_limiter = RateLimiter::from_config(&config.rate_limit);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                index,
                embedder,
                retrieval,
                job_queue,
                rate_limiter,
                workers,
                ready: RwLock::new(false),
            }),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn index(&self) -> &Arc<IndexManager> {
        &self.inner.index
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn retrieval(&self) -> &RetrievalPipeline {
        &self.inner.retrieval
    }

    pub fn job_queue(&self) -> &Arc<JobQueue> {
        &self.inner.job_queue
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    /// Evict idle rate-limit identities and finished jobs past retention
    ///
    /// Returns `(identities, jobs)` removed.
    pub fn sweep(&self) -> (usize, usize) {
        let identities = self.inner.rate_limiter.evict_idle(Instant::now());

        let retention = chrono::Duration::from_std(Duration::from_secs(
            self.inner.config.processing.job_retention_secs,
        ))
        .ok();
        let jobs = retention
            .and_then(|r| chrono::Utc::now().checked_sub_signed(r))
            .map(|cutoff| self.inner.job_queue.evict_finished(cutoff))
            .unwrap_or(0);

        (identities, jobs)
    }

    /// Ready when accepting connections and at least one ingestion worker is alive
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read() && self.workers_alive() > 0
    }

    /// Number of ingestion workers still running
    pub fn workers_alive(&self) -> usize {
        self.inner.workers.iter().filter(|h| !h.is_finished()).count()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
