//! Index manager: the vector index and metadata sidecar as one consistent unit
//!
//! The in-memory state is the source of truth and the snapshot store provides
//! durability. All mutation goes through [`IndexManager::append`], which holds the
//! write lock across extend + persist, so readers see either the state before an
//! append or the state after it.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::storage::SnapshotStore;
use crate::types::{ChunkRecord, SearchHit};

use super::index::VectorIndex;

/// Vectors plus their positionally aligned records
#[derive(Debug, Clone)]
pub struct IndexState {
    /// Last committed generation (0 = never persisted)
    pub generation: u64,
    pub index: VectorIndex,
    pub records: Vec<ChunkRecord>,
}

impl IndexState {
    /// Empty state of the given dimension
    pub fn empty(dimension: usize) -> Self {
        Self {
            generation: 0,
            index: VectorIndex::new(dimension),
            records: Vec::new(),
        }
    }

    /// Read the committed state from `store`, or an empty one if nothing was committed
    pub fn load(store: &SnapshotStore, dimension: usize) -> Result<Self> {
        let Some(snapshot) = store.load(dimension)? else {
            return Ok(Self::empty(dimension));
        };

        let index = VectorIndex::from_flat(dimension, snapshot.vectors)?;
        if index.len() != snapshot.records.len() {
            return Err(Error::corrupt_state(format!(
                "{} vectors but {} metadata records",
                index.len(),
                snapshot.records.len()
            )));
        }

        Ok(Self {
            generation: snapshot.generation,
            index,
            records: snapshot.records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Exact top-k search; positions without a record are skipped
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let hits = self.index.search(query, top_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(position, score)| {
                self.records.get(position).map(|record| SearchHit {
                    score,
                    record: record.clone(),
                })
            })
            .collect())
    }
}

/// Per-source chunk counts
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub chunks: usize,
}

/// Owns the index state and is its only writer
pub struct IndexManager {
    store: SnapshotStore,
    dimension: usize,
    state: RwLock<IndexState>,
}

impl IndexManager {
    /// Open the index directory and load whatever was committed there
    pub fn open(index_dir: impl Into<PathBuf>, dimension: usize) -> Result<Self> {
        let store = SnapshotStore::open(index_dir)?;
        let state = IndexState::load(&store, dimension)?;
        store.remove_stale(state.generation);

        tracing::info!(
            "Index loaded from {} ({} chunks, generation {})",
            store.dir().display(),
            state.len(),
            state.generation
        );

        Ok(Self {
            store,
            dimension,
            state: RwLock::new(state),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed chunks
    pub fn len(&self) -> usize {
        self.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().is_empty()
    }

    /// Last committed generation
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    /// Append vectors and records in order, then persist before returning
    ///
    /// On any failure the in-memory state and the committed snapshot are left
    /// exactly as they were.
    pub fn append(&self, vectors: Vec<Vec<f32>>, records: Vec<ChunkRecord>) -> Result<()> {
        if vectors.len() != records.len() {
            return Err(Error::DimensionMismatch {
                expected: records.len(),
                actual: vectors.len(),
            });
        }
        if records.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write();
        state.index.check_dimensions(&vectors)?;

        let previous_len = state.len();
        let next_generation = state.generation + 1;

        state.index.add(&vectors)?;
        state.records.extend(records);

        let persisted = self.store.persist(
            next_generation,
            self.dimension,
            state.index.as_flat(),
            &state.records,
        );

        match persisted {
            Ok(manifest) => {
                state.generation = manifest.generation;
                tracing::debug!(
                    "Appended {} chunks (total {}, generation {})",
                    manifest.count - previous_len,
                    manifest.count,
                    manifest.generation
                );
                Ok(())
            }
            Err(e) => {
                state.index.truncate(previous_len);
                state.records.truncate(previous_len);
                tracing::error!("Index persist failed, append rolled back: {}", e);
                Err(e)
            }
        }
    }

    /// Top-k records most similar to `query`, highest score first
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        self.state.read().search(query, top_k)
    }

    /// Re-read the committed snapshot and swap it in
    ///
    /// The current state is kept if the snapshot fails to load.
    pub fn reload(&self) -> Result<usize> {
        let mut state = self.state.write();
        let loaded = IndexState::load(&self.store, self.dimension)?;
        let count = loaded.len();
        *state = loaded;
        tracing::info!("Index reloaded ({} chunks)", count);
        Ok(count)
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> IndexState {
        self.state.read().clone()
    }

    /// Distinct sources with their chunk counts, sorted by name
    pub fn sources(&self) -> Vec<SourceSummary> {
        let state = self.state.read();
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for record in &state.records {
            *counts.entry(record.source.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(source, chunks)| SourceSummary {
                source: source.to_string(),
                chunks,
            })
            .collect()
    }
}
