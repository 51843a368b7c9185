//! Durable snapshot of the vector index and its metadata sidecar
//!
//! Layout of the index directory:
//!
//! ```text
//! manifest.json              {generation, dimension, count, committed_at}
//! vectors-00000007.bin       bincode: dimension, count, flat f32 data
//! metadata-00000007.json     JSON array of chunk records
//! ```
//!
//! Both artifacts of a generation are written and fsynced before the manifest is
//! replaced, and the manifest rename is the only commit point. A crash at any step
//! leaves the previous manifest pointing at a complete, matching pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::ChunkRecord;

const MANIFEST_FILE: &str = "manifest.json";
const VECTORS_PREFIX: &str = "vectors-";
const METADATA_PREFIX: &str = "metadata-";
const TMP_SUFFIX: &str = ".tmp";

/// Commit record naming the live generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub generation: u64,
    pub dimension: usize,
    pub count: usize,
    pub committed_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct VectorFileRef<'a> {
    dimension: u64,
    count: u64,
    data: &'a [f32],
}

#[derive(Deserialize)]
struct VectorFile {
    dimension: u64,
    count: u64,
    data: Vec<f32>,
}

/// State read back from disk
#[derive(Debug, Clone)]
pub struct LoadedSnapshot {
    pub generation: u64,
    /// Row-major, `count * dimension` values
    pub vectors: Vec<f32>,
    pub records: Vec<ChunkRecord>,
}

/// Reads and writes index snapshots in one directory
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open (and create if needed) the index directory
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    fn vectors_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("{}{:08}.bin", VECTORS_PREFIX, generation))
    }

    fn metadata_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("{}{:08}.json", METADATA_PREFIX, generation))
    }

    /// Read the committed manifest, if any
    pub fn manifest(&self) -> Result<Option<Manifest>> {
        let raw = match fs::read(self.manifest_path()) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| Error::corrupt_state(format!("{} unreadable: {}", MANIFEST_FILE, e)))
    }

    /// Load the committed snapshot
    ///
    /// Returns `None` when nothing has been committed yet.
    pub fn load(&self, dimension: usize) -> Result<Option<LoadedSnapshot>> {
        let Some(manifest) = self.manifest()? else {
            return Ok(None);
        };

        if manifest.dimension != dimension {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: manifest.dimension,
            });
        }

        let vectors_path = self.vectors_path(manifest.generation);
        let raw = read_artifact(&vectors_path)?;
        let (file, _): (VectorFile, usize) =
            bincode::serde::decode_from_slice(&raw, bincode::config::standard()).map_err(|e| {
                Error::corrupt_state(format!("{} unreadable: {}", vectors_path.display(), e))
            })?;

        if file.dimension as usize != manifest.dimension || file.count as usize != manifest.count {
            return Err(Error::corrupt_state(format!(
                "{} holds {} vectors of dimension {}, manifest expects {} of dimension {}",
                vectors_path.display(),
                file.count,
                file.dimension,
                manifest.count,
                manifest.dimension
            )));
        }
        let expected_values = manifest.count.checked_mul(manifest.dimension).ok_or_else(|| {
            Error::corrupt_state(format!(
                "{} vectors of dimension {} overflow",
                manifest.count, manifest.dimension
            ))
        })?;
        if file.data.len() != expected_values {
            return Err(Error::corrupt_state(format!(
                "{} holds {} values, expected {}",
                vectors_path.display(),
                file.data.len(),
                expected_values
            )));
        }

        let metadata_path = self.metadata_path(manifest.generation);
        let raw = read_artifact(&metadata_path)?;
        let records: Vec<ChunkRecord> = serde_json::from_slice(&raw).map_err(|e| {
            Error::corrupt_state(format!("{} unreadable: {}", metadata_path.display(), e))
        })?;

        if records.len() != manifest.count {
            return Err(Error::corrupt_state(format!(
                "{} vectors but {} metadata records",
                manifest.count,
                records.len()
            )));
        }

        tracing::debug!(
            "Loaded index generation {} ({} vectors)",
            manifest.generation,
            manifest.count
        );

        Ok(Some(LoadedSnapshot {
            generation: manifest.generation,
            vectors: file.data,
            records,
        }))
    }

    /// Write `vectors`/`records` as `generation` and commit it
    pub fn persist(
        &self,
        generation: u64,
        dimension: usize,
        vectors: &[f32],
        records: &[ChunkRecord],
    ) -> Result<Manifest> {
        if Some(vectors.len()) != records.len().checked_mul(dimension) {
            return Err(Error::internal(format!(
                "refusing to persist {} values for {} records of dimension {}",
                vectors.len(),
                records.len(),
                dimension
            )));
        }

        self.stage(generation, dimension, vectors, records)?;

        let manifest = Manifest {
            generation,
            dimension,
            count: records.len(),
            committed_at: Utc::now(),
        };
        write_atomic(&self.manifest_path(), &serde_json::to_vec_pretty(&manifest)?)?;
        sync_dir(&self.dir);

        tracing::debug!("Committed index generation {} ({} vectors)", generation, records.len());

        self.remove_stale(generation);
        Ok(manifest)
    }

    /// Write both artifacts of `generation` and make their names durable
    ///
    /// Nothing is committed; `load` keeps returning the previous generation.
    fn stage(
        &self,
        generation: u64,
        dimension: usize,
        vectors: &[f32],
        records: &[ChunkRecord],
    ) -> Result<()> {
        let vector_bytes = bincode::serde::encode_to_vec(
            VectorFileRef {
                dimension: dimension as u64,
                count: records.len() as u64,
                data: vectors,
            },
            bincode::config::standard(),
        )
        .map_err(|e| Error::internal(format!("Failed to encode vectors: {}", e)))?;
        write_atomic(&self.vectors_path(generation), &vector_bytes)?;

        let metadata_bytes = serde_json::to_vec(records)?;
        write_atomic(&self.metadata_path(generation), &metadata_bytes)?;

        // Artifact renames must reach disk before the manifest can name them
        sync_dir(&self.dir);
        Ok(())
    }

    /// Delete artifacts of other generations and leftover temp files
    ///
    /// Failures are logged only; stale files never affect what `load` reads.
    pub fn remove_stale(&self, live_generation: u64) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot scan {} for stale files: {}", self.dir.display(), e);
                return;
            }
        };

        let live_vectors = self.vectors_path(live_generation);
        let live_metadata = self.metadata_path(live_generation);

        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let is_artifact = name.starts_with(VECTORS_PREFIX) || name.starts_with(METADATA_PREFIX);
            let stale = name.ends_with(TMP_SUFFIX)
                || (is_artifact && path != live_vectors && path != live_metadata);

            if stale {
                match fs::remove_file(&path) {
                    Ok(()) => tracing::debug!("Removed stale index file {}", name),
                    Err(e) => tracing::warn!("Failed to remove stale index file {}: {}", name, e),
                }
            }
        }
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            Error::corrupt_state(format!("manifest references missing {}", path.display()))
        } else {
            Error::Io(e)
        }
    })
}

/// Write to a temp file, fsync, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::internal(format!("invalid artifact path {}", path.display())))?;
    let tmp = path.with_file_name(format!("{}{}", file_name, TMP_SUFFIX));

    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = File::open(dir).and_then(|d| d.sync_all()) {
        tracing::warn!("Failed to fsync {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
