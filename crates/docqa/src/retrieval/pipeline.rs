//! Question answering: embed, search, materialize records, synthesize an answer

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerGenerator;
use crate::providers::EmbeddingProvider;
use crate::types::{QueryResponse, SearchHit};

use super::manager::IndexManager;

/// Read-only pipeline over the shared index
pub struct RetrievalPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<IndexManager>,
    generator: Arc<dyn AnswerGenerator>,
    config: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<IndexManager>,
        generator: Arc<dyn AnswerGenerator>,
        config: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            generator,
            config,
        }
    }

    /// Check caller input before any work is done
    pub fn validate(&self, question: &str, top_k: usize) -> Result<()> {
        if question.chars().count() < self.config.min_question_chars {
            return Err(Error::validation(format!(
                "question must be at least {} characters",
                self.config.min_question_chars
            )));
        }
        if top_k < 1 || top_k > self.config.max_top_k {
            return Err(Error::validation(format!(
                "top_k must be between 1 and {}",
                self.config.max_top_k
            )));
        }
        Ok(())
    }

    /// Nearest chunk records for `question`, best first
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.validate(question, top_k)?;

        let query = self.embedder.embed(question).await?;

        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.search(&query, top_k)).await?
    }

    /// Answer `question` from the `top_k` best matching chunks
    pub async fn answer(&self, question: &str, top_k: usize) -> Result<QueryResponse> {
        let start = Instant::now();
        let hits = self.retrieve(question, top_k).await?;

        let contexts: Vec<String> = hits.iter().map(|h| h.record.text.clone()).collect();
        let answer = self.generator.generate(question, &contexts).await?;
        let sources = distinct_sources(&hits);

        tracing::info!(
            "Answered query in {}ms: {} chunks from {} sources",
            start.elapsed().as_millis(),
            hits.len(),
            sources.len()
        );

        Ok(QueryResponse { answer, sources })
    }

    /// top_k to use when the request leaves it out
    pub fn default_top_k(&self) -> usize {
        self.config.default_top_k
    }
}

/// Source names in first-ranked order, each once
fn distinct_sources(hits: &[SearchHit]) -> Vec<String> {
    let mut seen = HashSet::new();
    hits.iter()
        .filter(|h| seen.insert(h.record.source.as_str()))
        .map(|h| h.record.source.clone())
        .collect()
}
