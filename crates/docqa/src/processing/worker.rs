//! Background workers that drain the ingestion queue

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::ingestion::{IngestPipeline, IngestStage};

use super::job_queue::{IngestJob, JobQueue, ProcessingStage};

/// Worker for ingesting uploaded documents in the background
///
/// Each job is read, chunked, embedded and appended as one batch; a failing
/// job is recorded on the queue and the worker moves on.
pub struct IngestionWorker {
    id: usize,
    pipeline: Arc<IngestPipeline>,
    job_queue: Arc<JobQueue>,
}

impl IngestionWorker {
    pub fn new(id: usize, pipeline: Arc<IngestPipeline>, job_queue: Arc<JobQueue>) -> Self {
        Self {
            id,
            pipeline,
            job_queue,
        }
    }

    /// Spawn `count` workers sharing one receiver
    pub fn spawn_pool(
        count: usize,
        pipeline: Arc<IngestPipeline>,
        job_queue: Arc<JobQueue>,
        receiver: mpsc::Receiver<IngestJob>,
    ) -> Vec<JoinHandle<()>> {
        let receiver = Arc::new(Mutex::new(receiver));
        (0..count.max(1))
            .map(|id| {
                let worker = Self::new(id, Arc::clone(&pipeline), Arc::clone(&job_queue));
                tokio::spawn(worker.run(Arc::clone(&receiver)))
            })
            .collect()
    }

    /// Process jobs until the queue is closed
    pub async fn run(self, receiver: Arc<Mutex<mpsc::Receiver<IngestJob>>>) {
        tracing::info!("Ingestion worker {} started", self.id);

        loop {
            // Lock only while waiting for the next job
            let job = receiver.lock().await.recv().await;
            let Some(job) = job else { break };
            self.process(job).await;
        }

        tracing::info!("Ingestion worker {} stopped", self.id);
    }

    /// Run one job and record the outcome
    pub async fn process(&self, job: IngestJob) {
        let job_id = job.id;
        let start = Instant::now();
        tracing::info!("Worker {} processing job {} ({})", self.id, job_id, job.source);

        self.job_queue.start(job_id);

        match self.ingest(&job).await {
            Ok(chunks) => {
                self.job_queue.complete(job_id, chunks);
                tracing::info!(
                    "Job {} completed: {} chunks from '{}' in {}ms",
                    job_id,
                    chunks,
                    job.source,
                    start.elapsed().as_millis()
                );
            }
            Err(e) => {
                self.job_queue.fail(job_id, e.to_string());
                tracing::error!("Job {} failed for '{}': {}", job_id, job.source, e);
            }
        }
    }

    async fn ingest(&self, job: &IngestJob) -> Result<usize> {
        let queue = &self.job_queue;
        self.pipeline
            .ingest_file_with(job.path.clone(), job.format, &job.source, |stage| {
                queue.update_stage(job.id, stage.into())
            })
            .await
    }
}

impl From<IngestStage> for ProcessingStage {
    fn from(stage: IngestStage) -> Self {
        match stage {
            IngestStage::Reading => Self::Reading,
            IngestStage::Chunking => Self::Chunking,
            IngestStage::Embedding => Self::Embedding,
            IngestStage::Storing => Self::Storing,
        }
    }
}
