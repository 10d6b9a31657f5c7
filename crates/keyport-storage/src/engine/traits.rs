//! Core storage traits.
//!
//! This module defines the contract that storage backends implement:
//!
//! - [`RawStorage`] - Byte-level point, transactional and scan operations
//! - [`ManagedStorage`] - Builders, lifecycle, maintenance, backup/restore
//!
//! Keys are always addressed as a `(prefix, key)` pair. The literal key seen
//! by the engine is the concatenation `prefix || key`; during scans the
//! prefix acts as a filter over the ordered key space.

use std::io::{Read, Write};

use super::ops::{
    CompareAndSetOperation, EnumerateOperation, GetOperation, IncrementOperation,
    RemoveOperation, SetOperation,
};
use super::StorageResult;

/// TTL sentinel meaning "never expires".
pub const NO_TTL: u32 = 0;

/// An owned view of one stored item.
///
/// `ttl` and `version` are part of the contract but backends without native
/// expiry or versioning fill them with [`NO_TTL`] and `0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEntry {
    /// The full engine key (`prefix || key`).
    pub key: Vec<u8>,
    /// The stored value. Empty when the key is absent or only keys were requested.
    pub value: Vec<u8>,
    /// Time to live in seconds, [`NO_TTL`] for none.
    pub ttl: u32,
    /// Item version, `0` when unversioned.
    pub version: i64,
}

impl RawEntry {
    /// Create an entry with no TTL and no version.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value, ttl: NO_TTL, version: 0 }
    }
}

/// Byte-level storage operations.
///
/// All methods are synchronous and every returned key or value is an owned
/// copy. Implementations must be thread-safe (`Send + Sync`).
pub trait RawStorage: Send + Sync {
    /// Look up `prefix || key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`](super::StorageError::NotFound) if the
    /// key is absent and `required` is set. An absent optional key is
    /// `Ok(None)`.
    fn get_raw(&self, prefix: &[u8], key: &[u8], required: bool)
        -> StorageResult<Option<Vec<u8>>>;

    /// Unconditionally write `value` at `prefix || key`.
    ///
    /// `ttl_seconds` is accepted for compatibility; keys never expire.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the write fails.
    fn set_raw(&self, prefix: &[u8], key: &[u8], value: &[u8], ttl_seconds: u32)
        -> StorageResult<()>;

    /// Read-modify-write a single key.
    ///
    /// The callback receives the current entry (an absent key shows up as an
    /// empty value) and returns `true` to write `entry.value` back or `false`
    /// to abort.
    ///
    /// # Deadlocks
    ///
    /// The callback runs while the backend holds its single writer slot.
    /// Reads through the same storage are fine, but any write from inside the
    /// callback (`set_raw`, `remove_raw`, another `do_in_transaction`, ...)
    /// blocks forever.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Canceled`](super::StorageError::Canceled) if
    /// the callback aborts.
    fn do_in_transaction(
        &self,
        prefix: &[u8],
        key: &[u8],
        callback: &mut dyn FnMut(&mut RawEntry) -> bool,
    ) -> StorageResult<()>;

    /// Write `value` if the stored version matches `version`.
    ///
    /// Backends that do not track versions write unconditionally and report
    /// `true`.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the write fails.
    fn compare_and_set_raw(
        &self,
        prefix: &[u8],
        key: &[u8],
        value: &[u8],
        ttl_seconds: u32,
        version: i64,
    ) -> StorageResult<bool>;

    /// Delete `prefix || key`. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    fn remove_raw(&self, prefix: &[u8], key: &[u8]) -> StorageResult<()>;

    /// Walk keys carrying `prefix`, starting at `seek`, in ascending order.
    ///
    /// Iteration stops when the callback returns `false`, when the key space
    /// is exhausted, or at the first key without the prefix. `batch_size` and
    /// `only_keys` are hints.
    ///
    /// # Errors
    ///
    /// Returns an engine error if iteration fails.
    fn enumerate_raw(
        &self,
        prefix: &[u8],
        seek: &[u8],
        batch_size: usize,
        only_keys: bool,
        callback: &mut dyn FnMut(&RawEntry) -> bool,
    ) -> StorageResult<()>;

    /// Collect every key carrying `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an engine error if iteration fails.
    fn fetch_keys_raw(&self, prefix: &[u8], batch_size: usize) -> StorageResult<Vec<Vec<u8>>>;

    /// The smallest key in the store, or `None` if it is empty.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the read fails.
    fn first(&self) -> StorageResult<Option<Vec<u8>>>;

    /// The largest key in the store, or `None` if it is empty.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the read fails.
    fn last(&self) -> StorageResult<Option<Vec<u8>>>;
}

/// A named storage instance with builders, maintenance and backup support.
///
/// # Example
///
/// ```ignore
/// use keyport_storage::{ManagedStorage, RedbStorage};
///
/// let storage = RedbStorage::in_memory("cache")?;
/// storage.set().by_prefix("user/").by_key("1").text("Alice")?;
///
/// let name = storage.get().by_prefix("user/").by_key("1").to_text()?;
/// assert_eq!(name.as_deref(), Some("Alice"));
/// ```
pub trait ManagedStorage: RawStorage {
    /// The name this instance was opened with.
    fn name(&self) -> &str;

    /// Start a get operation.
    fn get(&self) -> GetOperation<'_>
    where
        Self: Sized,
    {
        GetOperation::new(self)
    }

    /// Start a set operation.
    fn set(&self) -> SetOperation<'_>
    where
        Self: Sized,
    {
        SetOperation::new(self)
    }

    /// Start a compare-and-set operation.
    fn compare_and_set(&self) -> CompareAndSetOperation<'_>
    where
        Self: Sized,
    {
        CompareAndSetOperation::new(self)
    }

    /// Start an increment operation (initial `0`, delta `1`).
    fn increment(&self) -> IncrementOperation<'_>
    where
        Self: Sized,
    {
        IncrementOperation::new(self)
    }

    /// Start a remove operation.
    fn remove(&self) -> RemoveOperation<'_>
    where
        Self: Sized,
    {
        RemoveOperation::new(self)
    }

    /// Start an enumerate operation.
    fn enumerate(&self) -> EnumerateOperation<'_>
    where
        Self: Sized,
    {
        EnumerateOperation::new(self)
    }

    /// Compact the whole key space. A no-op on an empty store.
    ///
    /// # Errors
    ///
    /// Returns an engine error if compaction fails.
    fn compact(&mut self, discard_ratio: f64) -> StorageResult<()>;

    /// Stream every key/value pair to `writer` from a consistent snapshot.
    ///
    /// Returns an opaque backup marker (Unix seconds). `since` is accepted
    /// for compatibility; every backup is a full backup.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the writer fails, or an engine error.
    fn backup(&self, writer: &mut dyn Write, since: u64) -> StorageResult<u64>;

    /// Replace the whole store with the pairs read from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidFormat`](super::StorageError::InvalidFormat)
    /// for a malformed stream.
    fn restore(&self, reader: &mut dyn Read) -> StorageResult<()>;

    /// Delete every key.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    fn drop_all(&self) -> StorageResult<()>;

    /// Delete every key carrying `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    fn drop_with_prefix(&self, prefix: &[u8]) -> StorageResult<()>;

    /// Make all previously acknowledged writes durable.
    ///
    /// The default implementation does nothing, for backends that are
    /// durable on every write.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the flush fails.
    fn flush(&self) -> StorageResult<()> {
        Ok(())
    }

    /// Flush and close the instance.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the final flush fails.
    fn destroy(self) -> StorageResult<()>
    where
        Self: Sized;
}
