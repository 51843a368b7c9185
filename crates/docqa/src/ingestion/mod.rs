//! Document ingestion: text extraction, chunking and indexing

mod chunker;
mod pipeline;
mod reader;

pub use chunker::{TextChunker, WordChunks};
pub use pipeline::{IngestPipeline, IngestStage};
pub use reader::{DocumentFormat, DocumentReader};
