//! Durability layer for recstore
//!
//! Everything that touches the durable location lives here:
//!
//! - Snapshot format: checksummed full-table encoding
//! - Backends: atomic snapshot files, or process memory
//! - DurableStore: save/load of whole record tables

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod format;
pub mod store;

pub use backend::{FileBackend, MemoryBackend, SnapshotBackend, SNAPSHOT_EXTENSION};
pub use format::{
    decode_snapshot, encode_snapshot, SnapshotError, SnapshotHeader, MIN_SNAPSHOT_SIZE,
    SNAPSHOT_HEADER_SIZE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION_1,
};
pub use store::DurableStore;
