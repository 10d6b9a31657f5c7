//! Redb storage adapter.
//!
//! This module provides the `RedbStorage` type which implements the
//! [`RawStorage`] and [`ManagedStorage`] contracts on top of a single Redb
//! table.
//!
//! Every operation runs in its own Redb transaction: point reads and scans
//! in a read transaction (a consistent snapshot), writes in a write
//! transaction committed with the configured [`WriteDurability`]. Nothing
//! borrowed from the engine outlives the call that produced it.

use std::io::{Read, Write};
use std::path::Path;

use redb::{Database, Durability, ReadableTable, WriteTransaction};
use tracing::{debug, info, warn};

use crate::engine::{ManagedStorage, RawEntry, RawStorage, StorageError, StorageResult};

use super::backup;
use super::config::{RedbConfig, WriteDurability};
use super::tables::{
    clear_table, compose_key, delete_range, prefix_scan_bounds, prefix_successor, DATA_TABLE,
};

/// A named storage instance backed by Redb.
///
/// # Example
///
/// ```ignore
/// use keyport_storage::{ManagedStorage, RawStorage, RedbStorage};
///
/// let storage = RedbStorage::open("users", "users.redb")?;
///
/// storage.set_raw(b"user/", b"1", b"Alice", 0)?;
/// let alice = storage.get_raw(b"user/", b"1", true)?;
/// assert_eq!(alice, Some(b"Alice".to_vec()));
/// ```
pub struct RedbStorage {
    /// Instance name.
    name: String,
    /// The underlying Redb database.
    db: Database,
    /// Durability applied to every write transaction.
    durability: WriteDurability,
}

impl RedbStorage {
    /// Open or create a database at the given path with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or created.
    pub fn open(name: impl Into<String>, path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(name, path, RedbConfig::default())
    }

    /// Open or create a database at the given path with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be opened or created.
    pub fn open_with_config(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        config: RedbConfig,
    ) -> StorageResult<Self> {
        let mut builder = Database::builder();

        if let Some(cache_size) = config.cache_size {
            builder.set_cache_size(cache_size);
        }

        let db = builder.create(path.as_ref())?;
        Self::from_database(name, db, config.durability)
    }

    /// Create an in-memory database for testing.
    ///
    /// The database will be lost when the storage is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if the database cannot be created.
    pub fn in_memory(name: impl Into<String>) -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::from_database(name, db, WriteDurability::default())
    }

    /// Wrap an already opened database.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the data table cannot be created.
    pub fn from_database(
        name: impl Into<String>,
        db: Database,
        durability: WriteDurability,
    ) -> StorageResult<Self> {
        let name = name.into();

        // Create the data table up front so read transactions can always open it.
        let tx = db.begin_write()?;
        tx.open_table(DATA_TABLE)?;
        tx.commit()?;

        info!(name = %name, ?durability, "opened redb storage");
        Ok(Self { name, db, durability })
    }

    /// Get the underlying Redb database.
    ///
    /// Anything done through this handle bypasses the adapter: no prefix
    /// composition, no durability setting, no copy semantics.
    pub const fn instance(&self) -> &Database {
        &self.db
    }

    /// The durability applied to writes.
    pub const fn durability(&self) -> WriteDurability {
        self.durability
    }

    fn begin_write(&self) -> StorageResult<WriteTransaction> {
        let mut tx = self.db.begin_write()?;
        tx.set_durability(self.durability.as_redb());
        Ok(tx)
    }

    /// Walk `[max(seek, prefix), successor(prefix))`, stopping at the first key
    /// without `prefix` or when `visit` returns `false`.
    fn scan_prefix(
        &self,
        prefix: &[u8],
        seek: &[u8],
        only_keys: bool,
        visit: &mut dyn FnMut(&RawEntry) -> bool,
    ) -> StorageResult<()> {
        let (lower, upper) = prefix_scan_bounds(prefix, seek);

        let tx = self.db.begin_read()?;
        let table = tx.open_table(DATA_TABLE)?;
        let range = match upper.as_deref() {
            Some(upper) => table.range(lower.as_slice()..upper)?,
            None => table.range(lower.as_slice()..)?,
        };

        for item in range {
            let (key, value) = item?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }

            let value = if only_keys { Vec::new() } else { value.value().to_vec() };
            if !visit(&RawEntry::new(key.to_vec(), value)) {
                break;
            }
        }

        Ok(())
    }
}

impl RawStorage for RedbStorage {
    fn get_raw(
        &self,
        prefix: &[u8],
        key: &[u8],
        required: bool,
    ) -> StorageResult<Option<Vec<u8>>> {
        let key = compose_key(prefix, key);

        let tx = self.db.begin_read()?;
        let table = tx.open_table(DATA_TABLE)?;
        let value = table.get(key.as_slice())?.map(|guard| guard.value().to_vec());

        match value {
            None if required => Err(StorageError::NotFound),
            value => Ok(value),
        }
    }

    fn set_raw(
        &self,
        prefix: &[u8],
        key: &[u8],
        value: &[u8],
        _ttl_seconds: u32,
    ) -> StorageResult<()> {
        let key = compose_key(prefix, key);

        let tx = self.begin_write()?;
        {
            let mut table = tx.open_table(DATA_TABLE)?;
            table.insert(key.as_slice(), value)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn do_in_transaction(
        &self,
        prefix: &[u8],
        key: &[u8],
        callback: &mut dyn FnMut(&mut RawEntry) -> bool,
    ) -> StorageResult<()> {
        let key = compose_key(prefix, key);

        // Read and write share one write transaction; Redb serialises those,
        // so no other writer can slip in between.
        let tx = self.begin_write()?;
        let committed = {
            let mut table = tx.open_table(DATA_TABLE)?;
            let current =
                table.get(key.as_slice())?.map(|guard| guard.value().to_vec()).unwrap_or_default();

            let mut entry = RawEntry::new(key.clone(), current);
            if callback(&mut entry) {
                table.insert(key.as_slice(), entry.value.as_slice())?;
                true
            } else {
                false
            }
        };

        if !committed {
            tx.abort()?;
            return Err(StorageError::Canceled);
        }

        tx.commit()?;
        Ok(())
    }

    fn compare_and_set_raw(
        &self,
        prefix: &[u8],
        key: &[u8],
        value: &[u8],
        ttl_seconds: u32,
        version: i64,
    ) -> StorageResult<bool> {
        // Versions are not stored, so there is nothing to compare against.
        debug!(version, "compare-and-set without version tracking, writing unconditionally");
        self.set_raw(prefix, key, value, ttl_seconds)?;
        Ok(true)
    }

    fn remove_raw(&self, prefix: &[u8], key: &[u8]) -> StorageResult<()> {
        let key = compose_key(prefix, key);

        let tx = self.begin_write()?;
        {
            let mut table = tx.open_table(DATA_TABLE)?;
            table.remove(key.as_slice())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn enumerate_raw(
        &self,
        prefix: &[u8],
        seek: &[u8],
        _batch_size: usize,
        only_keys: bool,
        callback: &mut dyn FnMut(&RawEntry) -> bool,
    ) -> StorageResult<()> {
        self.scan_prefix(prefix, seek, only_keys, callback)
    }

    fn fetch_keys_raw(&self, prefix: &[u8], _batch_size: usize) -> StorageResult<Vec<Vec<u8>>> {
        let mut keys = Vec::new();
        self.scan_prefix(prefix, prefix, true, &mut |entry| {
            keys.push(entry.key.clone());
            true
        })?;
        Ok(keys)
    }

    fn first(&self) -> StorageResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(DATA_TABLE)?;
        let first = table.first()?.map(|(key, _)| key.value().to_vec());
        Ok(first)
    }

    fn last(&self) -> StorageResult<Option<Vec<u8>>> {
        let tx = self.db.begin_read()?;
        let table = tx.open_table(DATA_TABLE)?;
        let last = table.last()?.map(|(key, _)| key.value().to_vec());
        Ok(last)
    }
}

impl ManagedStorage for RedbStorage {
    fn name(&self) -> &str {
        &self.name
    }

    fn compact(&mut self, discard_ratio: f64) -> StorageResult<()> {
        if self.first()?.is_none() {
            debug!(name = %self.name, "store is empty, skipping compaction");
            return Ok(());
        }

        // Redb only compacts whole files; the ratio has no equivalent.
        let compacted = self.db.compact()?;
        info!(name = %self.name, compacted, discard_ratio, "compaction finished");
        Ok(())
    }

    fn backup(&self, writer: &mut dyn Write, _since: u64) -> StorageResult<u64> {
        let stats = backup::write_backup(&self.db, writer)?;
        info!(name = %self.name, pairs = stats.pairs, bytes = stats.bytes, "backup finished");
        Ok(stats.marker)
    }

    fn restore(&self, reader: &mut dyn Read) -> StorageResult<()> {
        let tx = self.begin_write()?;
        match backup::restore_into(&tx, reader) {
            Ok(pairs) => {
                tx.commit()?;
                info!(name = %self.name, pairs, "restore finished");
                Ok(())
            }
            Err(e) => {
                // Nothing from the stream is kept, including the wipe.
                tx.abort()?;
                warn!(name = %self.name, error = %e, "restore failed, store left unchanged");
                Err(e)
            }
        }
    }

    fn drop_all(&self) -> StorageResult<()> {
        let tx = self.begin_write()?;
        let cleared = {
            let mut table = tx.open_table(DATA_TABLE)?;
            clear_table(&mut table)?
        };

        if cleared {
            tx.commit()?;
            debug!(name = %self.name, "dropped all keys");
        } else {
            tx.abort()?;
        }
        Ok(())
    }

    fn drop_with_prefix(&self, prefix: &[u8]) -> StorageResult<()> {
        let upper = prefix_successor(prefix);

        let tx = self.begin_write()?;
        {
            let mut table = tx.open_table(DATA_TABLE)?;
            delete_range(&mut table, prefix, upper.as_deref())?;
        }
        tx.commit()?;

        debug!(name = %self.name, prefix_len = prefix.len(), "dropped keys with prefix");
        Ok(())
    }

    fn flush(&self) -> StorageResult<()> {
        // An empty durable commit persists every earlier non-durable one.
        let mut tx = self.db.begin_write()?;
        tx.set_durability(Durability::Immediate);
        tx.commit()?;
        Ok(())
    }

    fn destroy(self) -> StorageResult<()> {
        self.flush()?;
        info!(name = %self.name, "closed redb storage");
        Ok(())
    }
}

// Note: RedbStorage is Send + Sync because redb::Database is Send + Sync.
