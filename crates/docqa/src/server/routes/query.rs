//! Query endpoint

use axum::{
    extract::{ConnectInfo, State},
    Json,
};
use std::net::SocketAddr;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /query - Answer a question from the indexed documents
pub async fn query_documents(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let retrieval = state.retrieval();
    let top_k = request.top_k.unwrap_or_else(|| retrieval.default_top_k());

    // Malformed requests are rejected before they count against the caller
    retrieval.validate(&request.question, top_k)?;

    let identity = peer.ip().to_string();
    let now = Instant::now();

    if !state.rate_limiter().allow_at(&identity, now) {
        let wait = state.rate_limiter().retry_after(&identity, now);
        tracing::debug!("Rate limit exceeded for {}", identity);
        return Err(Error::RateLimitExceeded {
            // Round up so clients never retry early
            retry_after_secs: wait.as_secs() + u64::from(wait.subsec_nanos() > 0),
        });
    }

    tracing::info!("Query from {}: \"{}\" (top_k {})", identity, request.question, top_k);

    let response = retrieval.answer(&request.question, top_k).await?;
    Ok(Json(response))
}
