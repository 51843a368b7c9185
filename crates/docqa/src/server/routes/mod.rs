//! HTTP routes for the question answering server

pub mod jobs;
pub mod query;
pub mod upload;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all service routes
pub fn service_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload, with a body limit sized for documents
        .route(
            "/upload",
            post(upload::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/query", post(query::query_documents))
        // Ingestion outcomes
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/:id", get(jobs::get_job_progress))
        .route("/api/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<Value> {
    let index = state.index();
    let sources = index.sources();

    Json(json!({
        "name": "docqa",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document question answering over uploaded PDF and text files",
        "embeddings": {
            "provider": state.embedder().name(),
            "dimensions": index.dimension(),
        },
        "index": {
            "chunks": index.len(),
            "generation": index.generation(),
            "sources": sources,
        },
        "queue": state.job_queue().stats(),
        "endpoints": {
            "POST /upload": "Upload a .pdf or .txt document for background ingestion",
            "POST /query": "Answer a question from indexed documents",
            "GET /jobs": "List ingestion jobs and queue stats",
            "GET /jobs/:id": "Get ingestion job progress",
            "GET /health": "Liveness check",
            "GET /ready": "Readiness check"
        }
    }))
}
