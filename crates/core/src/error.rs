//! Error types for recstore
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every variant belongs to one [`ErrorKind`], the coarse class callers
//! branch on (a REST layer maps `Conflict` to 409, `NotFound` to 404, ...).

use crate::record::{RecordId, VersionTag};
use crate::value::Value;
use std::io;
use thiserror::Error;

/// Result type alias for recstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the record store
#[derive(Debug, Error)]
pub enum Error {
    /// Operation targets an id that is not stored
    #[error("Record not found: {id}")]
    NotFound {
        /// The missing id
        id: RecordId,
    },

    /// Insert of an id that already exists (or appears twice in one batch)
    #[error("Conflict: record {id} already exists")]
    DuplicateId {
        /// The duplicated id
        id: RecordId,
    },

    /// Insert would give two records the same value for a unique field
    #[error("Conflict: value {value:?} for unique field '{field}' is already taken")]
    UniqueViolation {
        /// The constrained field
        field: String,
        /// The offending value
        value: Value,
    },

    /// Stored version tag differs from the one the caller based its change on
    #[error("Conflict: version mismatch on {id}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Targeted record
        id: RecordId,
        /// Tag supplied by the caller
        expected: VersionTag,
        /// Tag currently stored
        actual: VersionTag,
    },

    /// The caller's context was canceled
    #[error("Operation canceled")]
    Canceled,

    /// The caller's context deadline passed
    #[error("Operation timed out")]
    Timeout,

    /// Durable write or reload failed
    #[error("Persistence failure: {0}")]
    Persistence(#[from] io::Error),

    /// A record or snapshot could not be encoded
    #[error("Encode error: {0}")]
    Encode(String),

    /// Serialized bytes could not be reconstructed into a record
    #[error("Decode error: {0}")]
    Decode(String),

    /// Snapshot envelope is damaged (bad magic, checksum, framing)
    #[error("Data corruption: {0}")]
    Corruption(String),

    /// Invalid argument supplied by the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target id absent
    NotFound,
    /// Duplicate id, unique constraint, or stale version tag
    Conflict,
    /// Context canceled
    Canceled,
    /// Context deadline exceeded
    Timeout,
    /// Durable write or reload failed
    PersistenceFailure,
    /// Stored bytes could not be decoded
    DecodeFailure,
    /// Caller supplied an invalid argument
    InvalidInput,
}

impl Error {
    /// The class this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::DuplicateId { .. }
            | Error::UniqueViolation { .. }
            | Error::VersionMismatch { .. } => ErrorKind::Conflict,
            Error::Canceled => ErrorKind::Canceled,
            Error::Timeout => ErrorKind::Timeout,
            Error::Persistence(_) | Error::Encode(_) => ErrorKind::PersistenceFailure,
            Error::Decode(_) | Error::Corruption(_) => ErrorKind::DecodeFailure,
            Error::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }

    /// True for any `Conflict`-class error
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    /// True if the targeted record does not exist
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True if the caller's context ended (canceled or timed out)
    pub fn is_context_done(&self) -> bool {
        matches!(self.kind(), ErrorKind::Canceled | ErrorKind::Timeout)
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Encode(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
