//! Ingest-then-query scenarios over a real on-disk index

use std::sync::Arc;

use docqa::config::RetrievalConfig;
use docqa::generation::{TemplateAnswerGenerator, ANSWER_PREFIX, NOT_FOUND_ANSWER};
use docqa::ingestion::DocumentFormat;
use docqa::processing::{IngestJob, IngestionWorker, JobQueue, JobStatus, ProcessingStage};
use docqa::providers::{EmbeddingProvider, HashingEmbedder};
use docqa::{IndexManager, IngestPipeline, RetrievalPipeline, TextChunker};

const DIMENSION: usize = 384;

struct Harness {
    _dir: tempfile::TempDir,
    index: Arc<IndexManager>,
    ingest: IngestPipeline,
    retrieval: RetrievalPipeline,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(IndexManager::open(dir.path().join("index"), DIMENSION).unwrap());
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(DIMENSION));

    let ingest =
        IngestPipeline::new(TextChunker::default(), Arc::clone(&embedder), Arc::clone(&index));
    let retrieval = RetrievalPipeline::new(
        embedder,
        Arc::clone(&index),
        Arc::new(TemplateAnswerGenerator::default()),
        RetrievalConfig::default(),
    );

    Harness {
        _dir: dir,
        index,
        ingest,
        retrieval,
    }
}

/// 1200 words of prose about the borrow checker
fn document() -> String {
    let sentence =
        "the borrow checker enforces that every reference in rust points to valid memory";
    let words: Vec<&str> = sentence.split_whitespace().cycle().take(1200).collect();
    words.join(" ")
}

#[tokio::test]
async fn test_ingest_then_query() {
    let h = harness();

    let chunks = h.ingest.ingest_text(&document(), "doc.txt").await.unwrap();
    assert_eq!(chunks, 3);
    assert_eq!(h.index.len(), 3);

    let response = h
        .retrieval
        .answer("what does the borrow checker enforce?", 2)
        .await
        .unwrap();

    assert_eq!(response.sources, vec!["doc.txt".to_string()]);
    assert_ne!(response.answer, NOT_FOUND_ANSWER);
    let body = response.answer.strip_prefix(ANSWER_PREFIX).unwrap();
    assert!(!body.is_empty());
    assert!(body.chars().count() <= 800);
}

#[tokio::test]
async fn test_query_before_ingestion() {
    let h = harness();

    let response = h.retrieval.answer("anything at all?", 5).await.unwrap();
    assert_eq!(response.answer, "The answer is not found in the uploaded documents.");
    assert!(response.sources.is_empty());
}

#[tokio::test]
async fn test_empty_document_leaves_index_unchanged() {
    let h = harness();
    h.ingest.ingest_text(&document(), "doc.txt").await.unwrap();
    let generation = h.index.generation();

    assert_eq!(h.ingest.ingest_text("", "empty.txt").await.unwrap(), 0);
    assert_eq!(h.index.len(), 3);
    assert_eq!(h.index.generation(), generation);
}

#[tokio::test]
async fn test_index_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let index_dir = dir.path().join("index");
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashingEmbedder::new(DIMENSION));

    {
        let index = Arc::new(IndexManager::open(&index_dir, DIMENSION).unwrap());
        let ingest = IngestPipeline::new(TextChunker::default(), Arc::clone(&embedder), index);
        ingest.ingest_text(&document(), "doc.txt").await.unwrap();
        ingest
            .ingest_text("tokio drives async tasks on a work stealing scheduler", "tokio.txt")
            .await
            .unwrap();
    }

    let index = Arc::new(IndexManager::open(&index_dir, DIMENSION).unwrap());
    assert_eq!(index.len(), 4);

    let retrieval = RetrievalPipeline::new(
        embedder,
        index,
        Arc::new(TemplateAnswerGenerator::default()),
        RetrievalConfig::default(),
    );
    let response = retrieval
        .answer("how does tokio schedule async tasks?", 1)
        .await
        .unwrap();
    assert_eq!(response.sources, vec!["tokio.txt".to_string()]);
}

#[tokio::test]
async fn test_concurrent_ingestion_keeps_records_aligned() {
    let h = Arc::new(harness());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let h = Arc::clone(&h);
            tokio::spawn(async move {
                let text = format!("document number {} talks about topic{}", i, i);
                h.ingest.ingest_text(&text, &format!("doc{}.txt", i)).await.unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 1);
    }

    assert_eq!(h.index.len(), 4);
    let state = h.index.snapshot();
    assert_eq!(state.records.len(), state.index.len());
}

#[tokio::test]
async fn test_uploaded_file_ingested_by_worker() {
    let h = harness();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.txt");
    std::fs::write(&path, document()).unwrap();

    let index = Arc::clone(&h.index);
    let pipeline = Arc::new(IngestPipeline::new(
        TextChunker::default(),
        Arc::new(HashingEmbedder::new(DIMENSION)),
        Arc::clone(&index),
    ));
    let (queue, receiver) = JobQueue::new(1, 4);
    let queue = Arc::new(queue);
    IngestionWorker::spawn_pool(1, pipeline, Arc::clone(&queue), receiver);

    let job_id = queue
        .submit(IngestJob::new(path, "doc.txt", DocumentFormat::Txt))
        .unwrap();

    let mut progress = queue.get(job_id).unwrap();
    for _ in 0..200 {
        progress = queue.get(job_id).unwrap();
        if progress.status.is_finished() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(progress.status, JobStatus::Complete);
    assert_eq!(progress.stage, ProcessingStage::Complete);
    assert_eq!(progress.chunks, 3);

    let response = h
        .retrieval
        .answer("what does the borrow checker enforce?", 2)
        .await
        .unwrap();
    assert_eq!(response.sources, vec!["doc.txt".to_string()]);
}
