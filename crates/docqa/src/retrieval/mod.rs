//! Similarity index, index manager and the question answering pipeline

pub mod index;
pub mod manager;
pub mod pipeline;

pub use index::{inner_product, VectorIndex};
pub use manager::{IndexManager, IndexState, SourceSummary};
pub use pipeline::RetrievalPipeline;
