//! Backup and restore through files on disk.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Seek, SeekFrom, Write};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use keyport_storage::codec::{read_blob, write_blob};
use keyport_storage::{ManagedStorage, RawStorage, RedbStorage, StorageError};

fn populated(name: &str) -> RedbStorage {
    let storage = RedbStorage::in_memory(name).expect("failed to create storage");
    for i in 0..200u32 {
        let key = format!("item/{i:04}");
        let value = vec![(i % 251) as u8; (i as usize) % 17];
        storage.set_raw(b"", key.as_bytes(), &value, 0).expect("failed to set");
    }
    storage.set().by_prefix("meta/").by_key("count").counter(200).expect("failed to set");
    storage
}

fn all_pairs(storage: &RedbStorage) -> Vec<(Vec<u8>, Vec<u8>)> {
    storage
        .enumerate()
        .entries()
        .expect("failed to enumerate")
        .into_iter()
        .map(|entry| (entry.key, entry.value))
        .collect()
}

#[test]
fn test_round_trip_through_file() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("store.backup");
    let source = populated("source");

    {
        let mut writer = BufWriter::new(File::create(&path).expect("failed to create file"));
        source.backup(&mut writer, 0).expect("failed to back up");
        writer.flush().expect("failed to flush file");
    }

    let target = RedbStorage::open("target", dir.path().join("target.redb"))
        .expect("failed to open storage");
    target.set_raw(b"stale/", b"1", b"old", 0).expect("failed to set");

    let mut reader = BufReader::new(File::open(&path).expect("failed to open file"));
    target.restore(&mut reader).expect("failed to restore");

    assert_eq!(all_pairs(&target), all_pairs(&source));
    assert_eq!(target.get_raw(b"stale/", b"1", false).expect("failed to get"), None);
    let count = target.get().by_prefix("meta/").by_key("count").to_counter().expect("failed to get");
    assert_eq!(count, 200);
}

#[test]
fn test_backup_is_alternating_blobs() {
    let source = populated("layout");
    let mut stream = Vec::new();
    source.backup(&mut stream, 12345).expect("failed to back up");

    let mut cursor = std::io::Cursor::new(stream);
    let mut keys = Vec::new();
    while let Some(key) = read_blob(&mut cursor).expect("failed to read key") {
        read_blob(&mut cursor).expect("failed to read value").expect("value missing");
        keys.push(key);
    }

    assert_eq!(keys.len(), 201);
    assert!(keys.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_truncated_file_leaves_store_unchanged() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let mut file = tempfile::tempfile_in(dir.path()).expect("failed to create file");

    write_blob(&mut file, b"k1").expect("failed to write");
    write_blob(&mut file, b"v1").expect("failed to write");
    // Header promises 10 bytes, only 3 follow.
    file.write_all(&[0xc4, 10, 1, 2, 3]).expect("failed to write");
    file.seek(SeekFrom::Start(0)).expect("failed to rewind");

    let target = populated("target");
    let before = all_pairs(&target);

    let err = target.restore(&mut file).unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
    assert_eq!(all_pairs(&target), before);
}

/// A sink that writes a new key into the store on its first write.
struct WritingSink {
    storage: Arc<RedbStorage>,
    out: Vec<u8>,
    wrote_key: bool,
}

impl Write for WritingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.wrote_key {
            self.wrote_key = true;
            self.storage.set_raw(b"", b"zz/late", b"v", 0).map_err(io::Error::other)?;
        }
        self.out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_backup_reads_snapshot_while_writes_proceed() {
    let storage = Arc::new(populated("snapshot"));
    let (tx, rx) = mpsc::channel();

    let worker = {
        let storage = Arc::clone(&storage);
        thread::spawn(move || {
            let mut sink =
                WritingSink { storage: Arc::clone(&storage), out: Vec::new(), wrote_key: false };
            let result = storage.backup(&mut sink, 0).map(|_| sink.out);
            let _ = tx.send(result);
        })
    };

    let stream = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("backup blocked on a concurrent write")
        .expect("failed to back up");
    worker.join().expect("backup thread panicked");

    let mut cursor = std::io::Cursor::new(stream);
    let mut keys = Vec::new();
    while let Some(key) = read_blob(&mut cursor).expect("failed to read key") {
        read_blob(&mut cursor).expect("failed to read value").expect("value missing");
        keys.push(key);
    }

    assert_eq!(keys.len(), 201);
    assert!(!keys.contains(&b"zz/late".to_vec()));
    assert_eq!(storage.get_raw(b"", b"zz/late", true).expect("failed to get"), Some(b"v".to_vec()));
}
