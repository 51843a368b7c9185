//! Chunk records and search hits

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for one indexed chunk
///
/// Positionally aligned with the vector at the same index; never updated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    /// Unique chunk ID
    pub id: Uuid,
    /// The chunk's words joined by single spaces
    pub text: String,
    /// Name of the originating document
    pub source: String,
}

impl ChunkRecord {
    /// Create a record with a fresh ID
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            source: source.into(),
        }
    }
}

/// A scored search result
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Inner product with the query (cosine similarity for unit vectors)
    pub score: f32,
    /// The matched record
    pub record: ChunkRecord,
}
