//! recstore - embedded versioned record store
//!
//! recstore keeps named collections of versioned records in memory, guards
//! each collection with a reader/writer lock, and rewrites a checksummed
//! snapshot of the whole collection after every mutation.
//!
//! # Quick Start
//!
//! ```ignore
//! use recstore::{Context, Database, Filter, Payload, Record, SortSpec};
//!
//! let db = Database::open("./data")?;
//! let users = db.collection("users")?;
//! let ctx = Context::background();
//!
//! let alice = Record::new("alice", "v1", Payload::new()).with_field("age", 31);
//! users.insert(&ctx, vec![alice.clone()])?;
//!
//! // Replace, gated on the version tag the caller last saw
//! let newer = Record::new("alice", "v2", Payload::new()).with_field("age", 32);
//! users.update(&ctx, newer, &alice)?;
//!
//! let page = users.find(&ctx, &Filter::new().eq("age", 32), &SortSpec::none(), 1, 20)?;
//! assert_eq!(page.total, 1);
//! ```
//!
//! # Architecture
//!
//! - `recstore-core`: records, values, errors, predicate and sort capabilities
//! - `recstore-storage`: the insertion-ordered record table
//! - `recstore-durability`: snapshot format and backends
//! - `recstore-engine`: collections, queries, latency, configuration

pub use recstore_core::{
    Direction, Error, ErrorKind, Filter, MatchAll, Payload, Predicate, Record, RecordId, Result,
    SortField, SortSpec, Value, VersionTag,
};
pub use recstore_durability::{DurableStore, FileBackend, MemoryBackend, SnapshotBackend};
pub use recstore_engine::{
    Collection, CollectionConfig, CollectionOptions, Context, Database, QueryView, StoreConfig,
};
pub use recstore_storage::RecordTable;
