//! Job queue for background document ingestion

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::ingestion::DocumentFormat;

/// Processing stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Queued,
    Reading,
    Chunking,
    Embedding,
    Storing,
    Complete,
    Failed,
}

/// Job status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

/// Progress information for a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub file: String,
    pub status: JobStatus,
    pub stage: ProcessingStage,
    pub chunks: usize,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl JobProgress {
    pub fn new(job_id: Uuid, file: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Self {
            job_id,
            file: file.into(),
            status: JobStatus::Pending,
            stage: ProcessingStage::Queued,
            chunks: 0,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Wall time from submission to completion, if finished
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|done| (done - self.created_at).num_milliseconds())
    }
}

/// An uploaded document waiting to be ingested
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub id: Uuid,
    /// Where the uploaded bytes were stored
    pub path: PathBuf,
    /// Source name recorded on every chunk
    pub source: String,
    pub format: DocumentFormat,
}

impl IngestJob {
    pub fn new(
        path: impl Into<PathBuf>,
        source: impl Into<String>,
        format: DocumentFormat,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            source: source.into(),
            format,
        }
    }
}

/// Job queue for managing background ingestion
pub struct JobQueue {
    /// Jobs with progress, including finished ones
    jobs: Arc<DashMap<Uuid, JobProgress>>,
    /// Channel for sending jobs to workers
    sender: mpsc::Sender<IngestJob>,
    worker_count: usize,
}

impl JobQueue {
    /// Create a queue holding at most `capacity` waiting jobs
    pub fn new(worker_count: usize, capacity: usize) -> (Self, mpsc::Receiver<IngestJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let queue = Self {
            jobs: Arc::new(DashMap::new()),
            sender,
            worker_count,
        };

        (queue, receiver)
    }

    /// Submit a job for processing
    ///
    /// Fails without waiting when the queue is full or the workers are gone.
    pub fn submit(&self, job: IngestJob) -> Result<Uuid> {
        let job_id = job.id;
        self.jobs.insert(job_id, JobProgress::new(job_id, job.source.clone()));

        if let Err(e) = self.sender.try_send(job) {
            let message = match e {
                mpsc::error::TrySendError::Full(_) => "ingestion queue is full",
                mpsc::error::TrySendError::Closed(_) => "ingestion workers are not running",
            };
            tracing::error!("Failed to submit job {}: {}", job_id, message);
            self.fail(job_id, message);
            return Err(Error::internal(message));
        }

        tracing::debug!("Queued job {}", job_id);
        Ok(job_id)
    }

    /// Get job progress
    pub fn get(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs.get(&job_id).map(|p| p.clone())
    }

    /// All jobs, newest first
    pub fn list(&self) -> Vec<JobProgress> {
        let mut jobs: Vec<JobProgress> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    /// Mark a job as picked up by a worker
    pub fn start(&self, job_id: Uuid) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = JobStatus::Processing;
            progress.updated_at = chrono::Utc::now();
        }
    }

    /// Update job stage
    pub fn update_stage(&self, job_id: Uuid, stage: ProcessingStage) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.stage = stage;
            progress.updated_at = chrono::Utc::now();
        }
    }

    /// Record a successful ingestion
    pub fn complete(&self, job_id: Uuid, chunks: usize) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            let now = chrono::Utc::now();
            progress.status = JobStatus::Complete;
            progress.stage = ProcessingStage::Complete;
            progress.chunks = chunks;
            progress.updated_at = now;
            progress.completed_at = Some(now);
        }
    }

    /// Record a failed ingestion
    pub fn fail(&self, job_id: Uuid, error: impl Into<String>) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            let now = chrono::Utc::now();
            progress.status = JobStatus::Failed;
            progress.stage = ProcessingStage::Failed;
            progress.error = Some(error.into());
            progress.updated_at = now;
            progress.completed_at = Some(now);
        }
    }

    /// Drop finished jobs that completed before `cutoff`
    ///
    /// Pending and running jobs are always kept. Returns the number removed.
    pub fn evict_finished(&self, cutoff: chrono::DateTime<chrono::Utc>) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, progress| {
            !(progress.status.is_finished()
                && progress.completed_at.is_some_and(|done| done < cutoff))
        });
        let evicted = before.saturating_sub(self.jobs.len());
        if evicted > 0 {
            tracing::debug!("Evicted {} finished jobs", evicted);
        }
        evicted
    }

    /// Get queue statistics
    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total_jobs: self.jobs.len(),
            worker_count: self.worker_count,
            ..QueueStats::default()
        };
        for job in self.jobs.iter() {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Complete => stats.complete += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub total_jobs: usize,
    pub pending: usize,
    pub processing: usize,
    pub complete: usize,
    pub failed: usize,
    pub worker_count: usize,
}
