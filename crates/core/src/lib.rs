//! Core types and traits for recstore
//!
//! This crate defines the foundational types used throughout the system:
//! - Value: Payload value enum with a total sort order
//! - Record, RecordId, VersionTag, Payload: the stored unit and its identity
//! - Predicate, Filter, SortSpec: query capabilities supplied by callers
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod query;
pub mod record;
pub mod value;

pub use error::{Error, ErrorKind, Result};
pub use query::{Direction, Filter, MatchAll, Predicate, SortField, SortSpec};
pub use record::{Payload, Record, RecordId, VersionTag};
pub use value::Value;
