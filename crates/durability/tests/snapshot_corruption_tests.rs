//! Snapshot corruption detection tests
//!
//! These tests verify that damaged snapshot files are rejected:
//! - CRC32 detects bit flips anywhere in the file
//! - Truncated files are rejected, never loaded as empty
//! - A failed save leaves the previous snapshot loadable

use proptest::prelude::*;
use recstore_core::{ErrorKind, Payload, Record, Result};
use recstore_durability::{
    decode_snapshot, encode_snapshot, DurableStore, FileBackend, SnapshotBackend,
};
use recstore_storage::RecordTable;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tempfile::TempDir;

fn sample_table() -> RecordTable {
    let mut table = RecordTable::new();
    table
        .insert(vec![
            Record::new("alice", "e1", Payload::new()).with_field("age", 31),
            Record::new("bob", "e1", Payload::new()).with_field("age", 27),
            Record::new("carol", "e1", Payload::new()).with_field("age", 45),
        ])
        .unwrap();
    table
}

#[test]
fn test_crc_detects_bit_flip_on_disk() {
    let temp_dir = TempDir::new().unwrap();
    let store = DurableStore::file(temp_dir.path()).unwrap();
    store.save("people", &sample_table()).unwrap();

    let path = FileBackend::new(temp_dir.path()).unwrap().path_for("people");

    // Corrupt file: flip a byte inside the first entry
    {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        file.seek(SeekFrom::Start(34)).unwrap();
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(34)).unwrap();
        file.write_all(&buf).unwrap();
    }

    let err = store.load("people").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
}

#[test]
fn test_empty_file_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FileBackend::new(temp_dir.path()).unwrap();
    std::fs::write(backend.path_for("people"), b"").unwrap();

    let store = DurableStore::new(Arc::new(backend));
    let err = store.load("people").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DecodeFailure);
}

/// Backend whose writes can be switched off
struct FlakyBackend {
    inner: FileBackend,
    fail: std::sync::atomic::AtomicBool,
}

impl SnapshotBackend for FlakyBackend {
    fn write(&self, name: &str, bytes: &[u8]) -> Result<()> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
        }
        self.inner.write(name, bytes)
    }

    fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.read(name)
    }

    fn exists(&self, name: &str) -> bool {
        self.inner.exists(name)
    }

    fn location(&self, name: &str) -> String {
        self.inner.location(name)
    }
}

#[test]
fn test_failed_save_keeps_previous_snapshot() {
    let temp_dir = TempDir::new().unwrap();
    let backend = Arc::new(FlakyBackend {
        inner: FileBackend::new(temp_dir.path()).unwrap(),
        fail: std::sync::atomic::AtomicBool::new(false),
    });
    let store = DurableStore::new(backend.clone());

    let table = sample_table();
    store.save("people", &table).unwrap();

    backend
        .fail
        .store(true, std::sync::atomic::Ordering::SeqCst);
    let err = store.save("people", &RecordTable::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailure);

    assert_eq!(store.load("people").unwrap().unwrap(), table);
}

proptest! {
    #[test]
    fn prop_any_single_byte_flip_is_detected(offset in 0usize..4096, mask in 1u8..=255) {
        let bytes = encode_snapshot(&sample_table()).unwrap();
        let mut damaged = bytes.clone();
        let at = offset % damaged.len();
        damaged[at] ^= mask;
        prop_assert!(decode_snapshot(&damaged).is_err());
    }

    #[test]
    fn prop_any_truncation_is_detected(cut in 1usize..4096) {
        let bytes = encode_snapshot(&sample_table()).unwrap();
        let keep = bytes.len().saturating_sub(cut % bytes.len() + 1);
        prop_assert!(decode_snapshot(&bytes[..keep]).is_err());
    }
}
