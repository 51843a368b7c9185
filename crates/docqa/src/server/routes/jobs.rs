//! Ingestion job endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::processing::{JobProgress, QueueStats};
use crate::server::state::AppState;

/// Response listing all jobs
#[derive(Debug, Serialize)]
pub struct JobsListResponse {
    pub jobs: Vec<JobProgress>,
    pub stats: QueueStats,
}

/// GET /jobs - List all ingestion jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobsListResponse> {
    let queue = state.job_queue();
    Json(JobsListResponse {
        jobs: queue.list(),
        stats: queue.stats(),
    })
}

/// GET /jobs/:id - Progress of one job
pub async fn get_job_progress(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobProgress>> {
    state
        .job_queue()
        .get(job_id)
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("job {}", job_id)))
}
