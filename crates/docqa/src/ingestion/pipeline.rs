//! Chunk, embed and append one document to the shared index

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::retrieval::IndexManager;
use crate::types::ChunkRecord;

use super::chunker::TextChunker;
use super::reader::{DocumentFormat, DocumentReader};

/// Step an ingestion is about to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Reading,
    Chunking,
    Embedding,
    Storing,
}

/// Ingestion pipeline: text -> chunks -> vectors -> index
pub struct IngestPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<IndexManager>,
}

impl IngestPipeline {
    pub fn new(
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<IndexManager>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
        }
    }

    /// Split `text` into chunk records tagged with `source`
    fn prepare(&self, text: &str, source: &str) -> Vec<ChunkRecord> {
        self.chunker
            .chunks(text)
            .map(|chunk| ChunkRecord::new(chunk, source))
            .collect()
    }

    /// Embed prepared records in one batch
    async fn embed(&self, records: &[ChunkRecord]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != records.len() {
            return Err(Error::embedding(format!(
                "provider returned {} vectors for {} chunks",
                vectors.len(),
                records.len()
            )));
        }
        Ok(vectors)
    }

    /// Append embedded records to the index as one batch
    async fn store(&self, vectors: Vec<Vec<f32>>, records: Vec<ChunkRecord>) -> Result<()> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || index.append(vectors, records)).await?
    }

    /// Ingest already-extracted text; returns the number of chunks indexed
    ///
    /// Text without words is a no-op and leaves the index untouched.
    pub async fn ingest_text(&self, text: &str, source: &str) -> Result<usize> {
        self.ingest_text_with(text, source, |_| {}).await
    }

    /// [`ingest_text`](Self::ingest_text), reporting each stage to `on_stage`
    pub async fn ingest_text_with<F>(&self, text: &str, source: &str, on_stage: F) -> Result<usize>
    where
        F: Fn(IngestStage) + Send + Sync,
    {
        let start = Instant::now();

        on_stage(IngestStage::Chunking);
        let records = self.prepare(text, source);
        if records.is_empty() {
            tracing::warn!("No text to index in '{}'", source);
            return Ok(0);
        }

        on_stage(IngestStage::Embedding);
        let vectors = self.embed(&records).await?;

        on_stage(IngestStage::Storing);
        let count = records.len();
        self.store(vectors, records).await?;

        tracing::info!(
            "Indexed '{}': {} chunks in {}ms",
            source,
            count,
            start.elapsed().as_millis()
        );
        Ok(count)
    }

    /// Read a stored document and ingest its text
    pub async fn ingest_file(
        &self,
        path: PathBuf,
        format: DocumentFormat,
        source: &str,
    ) -> Result<usize> {
        self.ingest_file_with(path, format, source, |_| {}).await
    }

    /// [`ingest_file`](Self::ingest_file), reporting each stage to `on_stage`
    pub async fn ingest_file_with<F>(
        &self,
        path: PathBuf,
        format: DocumentFormat,
        source: &str,
        on_stage: F,
    ) -> Result<usize>
    where
        F: Fn(IngestStage) + Send + Sync,
    {
        on_stage(IngestStage::Reading);
        let text =
            tokio::task::spawn_blocking(move || DocumentReader::read_text(&path, format)).await??;
        self.ingest_text_with(&text, source, on_stage).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashingEmbedder;
    use async_trait::async_trait;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    fn pipeline_with(
        embedder: Arc<dyn EmbeddingProvider>,
        dir: &std::path::Path,
    ) -> (IngestPipeline, Arc<IndexManager>) {
        let index = Arc::new(IndexManager::open(dir, 32).unwrap());
        (
            IngestPipeline::new(TextChunker::default(), embedder, Arc::clone(&index)),
            index,
        )
    }

    /// Drops the last vector of every batch
    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShortEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(vec![vec![0.0; 32]; texts.len().saturating_sub(1)])
        }

        fn dimensions(&self) -> usize {
            32
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "short"
        }
    }

    #[tokio::test]
    async fn test_ingest_text() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, index) = pipeline_with(Arc::new(HashingEmbedder::new(32)), dir.path());

        let count = pipeline.ingest_text(&words(1200), "doc.txt").await.unwrap();
        assert_eq!(count, 3);
        assert_eq!(index.len(), 3);

        let sources = index.sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].source, "doc.txt");
        assert_eq!(sources[0].chunks, 3);
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, index) = pipeline_with(Arc::new(HashingEmbedder::new(32)), dir.path());

        assert_eq!(pipeline.ingest_text("  \n ", "empty.txt").await.unwrap(), 0);
        assert!(index.is_empty());
        assert_eq!(index.generation(), 0);
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_leaves_index_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, index) = pipeline_with(Arc::new(ShortEmbedder), dir.path());

        let err = pipeline.ingest_text(&words(600), "doc.txt").await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_file() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, index) =
            pipeline_with(Arc::new(HashingEmbedder::new(32)), &dir.path().join("index"));

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, words(100)).unwrap();

        let count = pipeline
            .ingest_file(path, DocumentFormat::Txt, "notes.txt")
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn test_stages_reported_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) =
            pipeline_with(Arc::new(HashingEmbedder::new(32)), &dir.path().join("index"));

        let path = dir.path().join("notes.txt");
        std::fs::write(&path, words(20)).unwrap();

        let seen = parking_lot::Mutex::new(Vec::new());
        pipeline
            .ingest_file_with(path, DocumentFormat::Txt, "notes.txt", |stage| {
                seen.lock().push(stage)
            })
            .await
            .unwrap();
        assert_eq!(
            seen.into_inner(),
            vec![
                IngestStage::Reading,
                IngestStage::Chunking,
                IngestStage::Embedding,
                IngestStage::Storing
            ]
        );

        // Empty text stops after chunking
        let seen = parking_lot::Mutex::new(Vec::new());
        pipeline
            .ingest_text_with(" ", "blank.txt", |stage| seen.lock().push(stage))
            .await
            .unwrap();
        assert_eq!(seen.into_inner(), vec![IngestStage::Chunking]);
    }
}
