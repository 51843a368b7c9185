//! docqa: question answering over uploaded PDF and text documents
//!
//! Documents are split into overlapping word windows, embedded into unit vectors and
//! appended to a persistent exact-search index. Questions are answered from the
//! nearest chunks together with the names of the documents they came from.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod rate_limit;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{IngestPipeline, TextChunker};
pub use rate_limit::RateLimiter;
pub use retrieval::{IndexManager, RetrievalPipeline};
pub use types::{ChunkRecord, QueryRequest, QueryResponse, SearchHit};
