//! Storage layer for recstore
//!
//! This crate implements the in-memory side of a collection:
//! - RecordTable: insertion-ordered id sequence + id → serialized record map
//! - codec: per-record MessagePack encoding (materialize on every read)
//!
//! Synchronization and persistence are layered on top by the engine and
//! durability crates.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod table;

pub use codec::{decode_id, decode_record, encode_id, encode_record};
pub use table::RecordTable;
