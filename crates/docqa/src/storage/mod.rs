//! On-disk persistence for the vector index and metadata sidecar

mod snapshot;

pub use snapshot::{LoadedSnapshot, Manifest, SnapshotStore};
