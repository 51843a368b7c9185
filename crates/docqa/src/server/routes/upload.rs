//! Document upload endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::ingestion::DocumentFormat;
use crate::processing::IngestJob;
use crate::server::state::AppState;
use crate::types::UploadResponse;

/// POST /upload - Store a document and queue it for ingestion
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::validation(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let declared = field.file_name().unwrap_or_default().to_string();
        let filename = sanitize_filename(&declared)
            .ok_or_else(|| Error::validation("upload has no usable filename"))?;
        let format = DocumentFormat::from_filename(&filename)?;

        let data = field.bytes().await.map_err(|e| {
            Error::validation(format!("Failed to read file: {}", e))
        })?;

        // Stored under a per-job name so repeated uploads never share a file
        let job = IngestJob::new(PathBuf::new(), filename.clone(), format);
        let path = state
            .config()
            .storage
            .documents_dir
            .join(format!("{}-{}", job.id, filename));
        tokio::fs::write(&path, &data).await?;
        tracing::info!("Stored upload: {} ({} bytes)", path.display(), data.len());

        let job_id = match state.job_queue().submit(IngestJob { path: path.clone(), ..job }) {
            Ok(job_id) => job_id,
            Err(e) => {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    tracing::warn!("Failed to remove {}: {}", path.display(), remove_err);
                }
                return Err(e);
            }
        };

        return Ok(Json(UploadResponse::uploaded(filename, job_id)));
    }

    Err(Error::validation("multipart field 'file' is required"))
}

/// Final path component of a client-declared filename
///
/// Both `/` and `\` count as separators; `.`, `..` and empty names are rejected.
pub fn sanitize_filename(declared: &str) -> Option<String> {
    let name = declared
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match name {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("doc.txt").as_deref(), Some("doc.txt"));
        assert_eq!(sanitize_filename("../../etc/passwd.txt").as_deref(), Some("passwd.txt"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\report.pdf").as_deref(), Some("report.pdf"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename(""), None);
    }
}
