//! docqa server binary
//!
//! Run with: cargo run -p docqa --bin docqa-server
//! Set DOCQA_CONFIG to a TOML file to override the defaults.

use std::path::PathBuf;

use docqa::{
    config::{EmbeddingBackend, RagConfig},
    server::RagServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::var_os("DOCQA_CONFIG").map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!(
        "  - Embeddings: {:?} ({} dimensions)",
        config.embeddings.provider,
        config.embeddings.dimensions
    );
    tracing::info!(
        "  - Chunking: {} words, {} overlap",
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    tracing::info!("  - Index: {}", config.storage.index_dir.display());
    tracing::info!(
        "  - Rate limit: {} requests per {}s",
        config.rate_limit.max_requests,
        config.rate_limit.window_secs
    );

    // Create and start server
    let server = RagServer::new(config.clone())?;

    if config.embeddings.provider == EmbeddingBackend::Ollama {
        match server.state().embedder().health_check().await {
            Ok(true) => tracing::info!("Ollama is running at {}", config.embeddings.base_url),
            _ => tracing::warn!(
                "Ollama not available at {}; ingestion and queries will fail until it is",
                config.embeddings.base_url
            ),
        }
    }

    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("API Info: http://{}/api/info", server.address());

    server.start().await?;

    Ok(())
}
