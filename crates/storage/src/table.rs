//! RecordTable: the authoritative in-memory collection
//!
//! Two structures are maintained in lockstep:
//! - `order`: ids in insertion order (default iteration order, basis for
//!   stable pagination)
//! - `items`: id → serialized record bytes
//!
//! # Invariants
//!
//! - The id sequence and the map's key set are identical as sets
//! - Every id appears in the sequence exactly once
//!
//! Every mutation validates and encodes everything it needs before touching
//! either structure, so a failure leaves the table exactly as it was.
//!
//! The table is not synchronized. The engine wraps it in a reader/writer lock.

use recstore_core::{Error, Record, RecordId, Result, VersionTag};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::codec::{decode_record, encode_record};

/// Insertion-ordered map from record id to serialized record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordTable {
    /// Ids in insertion order
    order: Vec<RecordId>,
    /// Serialized records keyed by id
    items: FxHashMap<RecordId, Vec<u8>>,
}

impl RecordTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a table from ordered `(id, bytes)` pairs
    ///
    /// Used when loading a snapshot. Bytes are taken as-is; they are decoded
    /// lazily on read. A repeated id means the source is damaged.
    pub fn from_raw_entries(entries: Vec<(RecordId, Vec<u8>)>) -> Result<Self> {
        let mut table = RecordTable {
            order: Vec::with_capacity(entries.len()),
            items: FxHashMap::default(),
        };
        table.items.reserve(entries.len());
        for (id, bytes) in entries {
            if table.items.contains_key(&id) {
                return Err(Error::Corruption(format!(
                    "record id {} appears more than once",
                    id
                )));
            }
            table.order.push(id.clone());
            table.items.insert(id, bytes);
        }
        Ok(table)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the table holds no records
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// True if `id` is stored
    pub fn contains(&self, id: &RecordId) -> bool {
        self.items.contains_key(id)
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[RecordId] {
        &self.order
    }

    /// Materialize the record stored under `id`
    ///
    /// Absence is `Ok(None)`; only undecodable bytes produce an error.
    pub fn get(&self, id: &RecordId) -> Result<Option<Record>> {
        match self.items.get(id) {
            Some(bytes) => decode_record(bytes).map(Some),
            None => Ok(None),
        }
    }

    /// Materialize every record in insertion order
    pub fn iter(&self) -> impl Iterator<Item = Result<Record>> + '_ {
        self.raw_entries().map(|(_, bytes)| decode_record(bytes))
    }

    /// Ordered `(id, bytes)` pairs, for snapshot encoding
    pub fn raw_entries(&self) -> impl Iterator<Item = (&RecordId, &[u8])> + '_ {
        self.order.iter().filter_map(move |id| {
            self.items.get(id).map(|bytes| (id, bytes.as_slice()))
        })
    }

    /// Append a batch of new records, all or nothing
    ///
    /// Fails with `DuplicateId` if any id is already stored or repeats within
    /// the batch. Nothing is stored unless every record is accepted.
    pub fn insert(&mut self, records: Vec<Record>) -> Result<()> {
        let mut encoded = Vec::with_capacity(records.len());
        {
            let mut seen = FxHashSet::default();
            for record in &records {
                if self.items.contains_key(&record.id) || !seen.insert(&record.id) {
                    return Err(Error::DuplicateId {
                        id: record.id.clone(),
                    });
                }
                encoded.push(encode_record(record)?);
            }
        }

        for (record, bytes) in records.into_iter().zip(encoded) {
            self.order.push(record.id.clone());
            self.items.insert(record.id, bytes);
        }
        debug!(len = self.order.len(), "Inserted record batch");
        Ok(())
    }

    /// Replace the record stored under `id`, keeping its position
    ///
    /// `expected` is the version tag the caller based its change on.
    pub fn update(&mut self, id: &RecordId, record: &Record, expected: &VersionTag) -> Result<()> {
        if &record.id != id {
            return Err(Error::InvalidInput(format!(
                "replacement record id {} does not match target {}",
                record.id, id
            )));
        }
        self.check_version(id, expected)?;
        let bytes = encode_record(record)?;
        self.items.insert(id.clone(), bytes);
        Ok(())
    }

    /// Delete the record stored under `id` after a version check
    pub fn delete(&mut self, id: &RecordId, expected: &VersionTag) -> Result<()> {
        self.check_version(id, expected)?;
        self.remove(id);
        Ok(())
    }

    /// Delete without a version check; returns whether the id was stored
    ///
    /// The relative order of the remaining ids is preserved.
    pub fn remove(&mut self, id: &RecordId) -> bool {
        if self.items.remove(id).is_none() {
            return false;
        }
        if let Some(pos) = self.order.iter().position(|x| x == id) {
            self.order.remove(pos);
        }
        true
    }

    /// `NotFound` if absent, `VersionMismatch` if the stored tag differs
    fn check_version(&self, id: &RecordId, expected: &VersionTag) -> Result<()> {
        let stored = self
            .get(id)?
            .ok_or_else(|| Error::NotFound { id: id.clone() })?;
        if &stored.version_tag != expected {
            return Err(Error::VersionMismatch {
                id: id.clone(),
                expected: expected.clone(),
                actual: stored.version_tag,
            });
        }
        Ok(())
    }
}
