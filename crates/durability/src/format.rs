//! Snapshot format
//!
//! A snapshot is one self-contained encoding of a whole record table: the
//! insertion order and every serialized record. It is rewritten in full after
//! every mutation.
//!
//! ## Snapshot File Layout
//!
//! ```text
//! +------------------+
//! | Magic (8 bytes)  |  "RSTORSNP"
//! +------------------+
//! | Version (4)      |  Format version (1)
//! +------------------+
//! | Timestamp (8)    |  Microseconds since epoch
//! +------------------+
//! | Record Count (8) |  Number of entries that follow
//! +------------------+
//! | Entry 1          |  Id Len (4) + Id (MessagePack) + Data Len (4) + Data
//! +------------------+
//! | ...              |  (insertion order)
//! +------------------+
//! | CRC32 (4)        |  Checksum of everything above
//! +------------------+
//! ```
//!
//! All integers are little endian. Record data is the table's stored bytes,
//! copied verbatim.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use recstore_core::{Error, RecordId, Result};
use recstore_storage::{decode_id, encode_id, RecordTable};
use std::io::{Cursor, Read};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Snapshot file magic bytes
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"RSTORSNP";

/// Snapshot format version 1
pub const SNAPSHOT_VERSION_1: u32 = 1;

/// Header size: Magic(8) + Version(4) + Timestamp(8) + RecordCount(8)
pub const SNAPSHOT_HEADER_SIZE: usize = 28;

/// Minimum snapshot size: Header + CRC32(4)
pub const MIN_SNAPSHOT_SIZE: usize = SNAPSHOT_HEADER_SIZE + 4;

// ============================================================================
// Snapshot Header
// ============================================================================

/// Fixed-size header at the start of every snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Format version
    pub version: u32,
    /// When the snapshot was taken (microseconds since epoch)
    pub timestamp_micros: u64,
    /// Number of entries in the body
    pub record_count: u64,
}

impl SnapshotHeader {
    /// Create header with current timestamp
    pub fn new(record_count: u64) -> Self {
        SnapshotHeader {
            version: SNAPSHOT_VERSION_1,
            timestamp_micros: now_micros(),
            record_count,
        }
    }

    /// Serialize header to bytes (including magic)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SNAPSHOT_HEADER_SIZE);
        buf.extend_from_slice(SNAPSHOT_MAGIC);
        buf.extend_from_slice(&self.version.to_le_bytes());
        buf.extend_from_slice(&self.timestamp_micros.to_le_bytes());
        buf.extend_from_slice(&self.record_count.to_le_bytes());
        buf
    }

    /// Parse header from bytes (including magic)
    pub fn from_bytes(data: &[u8]) -> std::result::Result<Self, SnapshotError> {
        if data.len() < SNAPSHOT_HEADER_SIZE {
            return Err(SnapshotError::TooShort {
                expected: SNAPSHOT_HEADER_SIZE,
                actual: data.len(),
            });
        }
        if &data[0..8] != SNAPSHOT_MAGIC {
            return Err(SnapshotError::InvalidMagic {
                found: data[0..8].to_vec(),
            });
        }

        let mut cursor = Cursor::new(&data[8..SNAPSHOT_HEADER_SIZE]);
        let version = cursor.read_u32::<LittleEndian>()?;
        if version != SNAPSHOT_VERSION_1 {
            return Err(SnapshotError::UnsupportedVersion(version));
        }
        let timestamp_micros = cursor.read_u64::<LittleEndian>()?;
        let record_count = cursor.read_u64::<LittleEndian>()?;

        Ok(SnapshotHeader {
            version,
            timestamp_micros,
            record_count,
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Ways a snapshot can fail to parse
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Snapshot data too short
    #[error("Snapshot too short: expected at least {expected} bytes, got {actual}")]
    TooShort {
        /// Expected minimum size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Invalid magic bytes
    #[error("Invalid magic bytes: expected RSTORSNP, found {:?}", found)]
    InvalidMagic {
        /// Found bytes
        found: Vec<u8>,
    },

    /// Unsupported version
    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    /// Checksum mismatch
    #[error("Checksum mismatch: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Stored checksum
        expected: u32,
        /// Computed checksum
        actual: u32,
    },

    /// Entry framing runs past the end of the body
    #[error("Truncated snapshot body: {0}")]
    Truncated(#[from] std::io::Error),

    /// Header count disagrees with the body
    #[error("Record count mismatch: header says {declared}, body has {actual}")]
    CountMismatch {
        /// Count in the header
        declared: u64,
        /// Entries actually present
        actual: u64,
    },
}

impl From<SnapshotError> for Error {
    fn from(e: SnapshotError) -> Self {
        Error::Corruption(e.to_string())
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode a whole table into snapshot bytes
///
/// The full encoding is produced in memory; nothing touches the durable
/// location until this succeeds.
pub fn encode_snapshot(table: &RecordTable) -> Result<Vec<u8>> {
    let header = SnapshotHeader::new(table.len() as u64);
    let mut buf = header.to_bytes();

    for (id, data) in table.raw_entries() {
        let id_bytes = encode_id(id)?;
        buf.write_u32::<LittleEndian>(frame_len(id_bytes.len())?)?;
        buf.extend_from_slice(&id_bytes);
        buf.write_u32::<LittleEndian>(frame_len(data.len())?)?;
        buf.extend_from_slice(data);
    }

    let checksum = crc32fast::hash(&buf);
    buf.write_u32::<LittleEndian>(checksum)?;

    debug!(
        records = table.len(),
        size_bytes = buf.len(),
        "Encoded snapshot"
    );
    Ok(buf)
}

fn frame_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::Encode(format!("snapshot entry of {} bytes is too large", len)))
}

// ============================================================================
// Decoding
// ============================================================================

/// Verify the trailing CRC32 against the rest of the data
pub fn validate_checksum(data: &[u8]) -> std::result::Result<(), SnapshotError> {
    if data.len() < MIN_SNAPSHOT_SIZE {
        return Err(SnapshotError::TooShort {
            expected: MIN_SNAPSHOT_SIZE,
            actual: data.len(),
        });
    }

    let (content, checksum_bytes) = data.split_at(data.len() - 4);
    let stored = u32::from_le_bytes([
        checksum_bytes[0],
        checksum_bytes[1],
        checksum_bytes[2],
        checksum_bytes[3],
    ]);
    let computed = crc32fast::hash(content);

    if stored != computed {
        return Err(SnapshotError::ChecksumMismatch {
            expected: stored,
            actual: computed,
        });
    }
    Ok(())
}

/// Decode snapshot bytes back into a table
///
/// Validates checksum, header, entry framing and the declared record count.
/// Record bytes are not decoded here; a damaged record surfaces when it is
/// read.
pub fn decode_snapshot(data: &[u8]) -> Result<(SnapshotHeader, RecordTable)> {
    validate_checksum(data)?;
    let header = SnapshotHeader::from_bytes(data)?;

    let body = &data[SNAPSHOT_HEADER_SIZE..data.len() - 4];
    let mut cursor = Cursor::new(body);
    let mut entries: Vec<(RecordId, Vec<u8>)> = Vec::new();

    while (cursor.position() as usize) < body.len() {
        let id_bytes = read_frame(&mut cursor)?;
        let data = read_frame(&mut cursor)?;
        entries.push((decode_id(&id_bytes)?, data));
    }

    if entries.len() as u64 != header.record_count {
        return Err(SnapshotError::CountMismatch {
            declared: header.record_count,
            actual: entries.len() as u64,
        }
        .into());
    }

    let table = RecordTable::from_raw_entries(entries)?;
    debug!(records = table.len(), "Decoded snapshot");
    Ok((header, table))
}

fn read_frame(cursor: &mut Cursor<&[u8]>) -> std::result::Result<Vec<u8>, SnapshotError> {
    let len = cursor.read_u32::<LittleEndian>()? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(SnapshotError::TooShort {
            expected: len,
            actual: remaining,
        });
    }
    let mut frame = vec![0u8; len];
    cursor.read_exact(&mut frame)?;
    Ok(frame)
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
