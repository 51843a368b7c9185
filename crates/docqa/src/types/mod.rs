//! Core data types

pub mod query;
pub mod record;
pub mod response;

pub use query::QueryRequest;
pub use record::{ChunkRecord, SearchHit};
pub use response::{QueryResponse, UploadResponse};
