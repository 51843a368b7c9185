//! Response types returned by the service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Answer plus the documents it was drawn from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Synthesized answer text
    pub answer: String,
    /// Distinct source document names, in first-ranked order
    pub sources: Vec<String>,
}

/// Acknowledgement for an accepted upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Always "uploaded"
    pub status: String,
    /// Stored filename
    pub file: String,
    /// Background ingestion job
    pub job_id: Uuid,
}

impl UploadResponse {
    pub fn uploaded(file: impl Into<String>, job_id: Uuid) -> Self {
        Self {
            status: "uploaded".to_string(),
            file: file.into(),
            job_id,
        }
    }
}
