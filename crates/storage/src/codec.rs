//! Per-record serialization
//!
//! Records live in the table as MessagePack bytes and are decoded on every
//! read, so callers always get a fresh copy and never alias table storage.
//! Ids get the same treatment when they are framed into a snapshot.

use recstore_core::{Error, Record, RecordId, Result};

/// Serialize a record for storage
pub fn encode_record(record: &Record) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(record)?)
}

/// Materialize a record from stored bytes
pub fn decode_record(bytes: &[u8]) -> Result<Record> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(format!("record: {}", e)))
}

/// Serialize a record id
pub fn encode_id(id: &RecordId) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec(id)?)
}

/// Decode a record id
pub fn decode_id(bytes: &[u8]) -> Result<RecordId> {
    rmp_serde::from_slice(bytes).map_err(|e| Error::Decode(format!("record id: {}", e)))
}
