//! Fluent operation builders.
//!
//! Each builder collects the addressing (`prefix`, `key`) and options of one
//! operation and runs it against a [`RawStorage`] in a terminal method.
//! Builders are created through [`ManagedStorage`](super::ManagedStorage):
//!
//! ```ignore
//! storage.set().by_prefix("session/").by_key(id).with_ttl(60).binary(&blob)?;
//! let hits = storage.increment().by_prefix("stats/").by_key("hits").execute()?;
//! ```
//!
//! Counters are stored as 8-byte big-endian `i64` values.

use super::traits::{RawEntry, RawStorage, NO_TTL};
use super::{StorageError, StorageResult};

/// Default batch size hint for enumeration.
pub const DEFAULT_BATCH_SIZE: usize = 256;

fn encode_counter(value: i64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

fn decode_counter(bytes: &[u8]) -> StorageResult<i64> {
    let raw: [u8; 8] = bytes.try_into().map_err(|_| {
        StorageError::encoding(format!("counter must be 8 bytes, got {}", bytes.len()))
    })?;
    Ok(i64::from_be_bytes(raw))
}

/// Looks up a single key.
#[must_use = "operations do nothing until a terminal method is called"]
pub struct GetOperation<'a> {
    storage: &'a dyn RawStorage,
    prefix: Vec<u8>,
    key: Vec<u8>,
    required: bool,
}

impl<'a> GetOperation<'a> {
    /// Create a get operation against `storage`.
    pub fn new(storage: &'a dyn RawStorage) -> Self {
        Self { storage, prefix: Vec::new(), key: Vec::new(), required: false }
    }

    /// Set the key prefix (bucket).
    pub fn by_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    /// Set the key.
    pub fn by_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = key.as_ref().to_vec();
        self
    }

    /// Fail with [`StorageError::NotFound`] instead of returning `None`.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Return the raw value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an absent required key.
    pub fn to_binary(self) -> StorageResult<Option<Vec<u8>>> {
        self.storage.get_raw(&self.prefix, &self.key, self.required)
    }

    /// Return the value decoded as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if the value is not valid UTF-8.
    pub fn to_text(self) -> StorageResult<Option<String>> {
        self.to_binary()?
            .map(String::from_utf8)
            .transpose()
            .map_err(|e| StorageError::encoding(e.to_string()))
    }

    /// Return the value decoded as a counter; an absent optional key reads as `0`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if the value is not 8 bytes long.
    pub fn to_counter(self) -> StorageResult<i64> {
        match self.to_binary()? {
            Some(bytes) => decode_counter(&bytes),
            None => Ok(0),
        }
    }

    /// Return the full entry, with the composed engine key.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] for an absent required key.
    pub fn to_entry(self) -> StorageResult<Option<RawEntry>> {
        let full_key = [self.prefix.as_slice(), self.key.as_slice()].concat();
        let value = self.storage.get_raw(&self.prefix, &self.key, self.required)?;
        Ok(value.map(|value| RawEntry::new(full_key, value)))
    }
}

/// Writes a single key unconditionally.
#[must_use = "operations do nothing until a terminal method is called"]
pub struct SetOperation<'a> {
    storage: &'a dyn RawStorage,
    prefix: Vec<u8>,
    key: Vec<u8>,
    ttl_seconds: u32,
}

impl<'a> SetOperation<'a> {
    /// Create a set operation against `storage`.
    pub fn new(storage: &'a dyn RawStorage) -> Self {
        Self { storage, prefix: Vec::new(), key: Vec::new(), ttl_seconds: NO_TTL }
    }

    /// Set the key prefix (bucket).
    pub fn by_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    /// Set the key.
    pub fn by_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = key.as_ref().to_vec();
        self
    }

    /// Request a TTL. Backends without expiry ignore it.
    pub fn with_ttl(mut self, ttl_seconds: u32) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Write raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the write fails.
    pub fn binary(self, value: impl AsRef<[u8]>) -> StorageResult<()> {
        self.storage.set_raw(&self.prefix, &self.key, value.as_ref(), self.ttl_seconds)
    }

    /// Write a UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the write fails.
    pub fn text(self, value: &str) -> StorageResult<()> {
        self.binary(value.as_bytes())
    }

    /// Write a counter.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the write fails.
    pub fn counter(self, value: i64) -> StorageResult<()> {
        self.binary(encode_counter(value))
    }
}

/// Writes a single key if its version matches.
#[must_use = "operations do nothing until a terminal method is called"]
pub struct CompareAndSetOperation<'a> {
    storage: &'a dyn RawStorage,
    prefix: Vec<u8>,
    key: Vec<u8>,
    ttl_seconds: u32,
    version: i64,
}

impl<'a> CompareAndSetOperation<'a> {
    /// Create a compare-and-set operation against `storage`.
    pub fn new(storage: &'a dyn RawStorage) -> Self {
        Self { storage, prefix: Vec::new(), key: Vec::new(), ttl_seconds: NO_TTL, version: 0 }
    }

    /// Set the key prefix (bucket).
    pub fn by_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    /// Set the key.
    pub fn by_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = key.as_ref().to_vec();
        self
    }

    /// Request a TTL. Backends without expiry ignore it.
    pub fn with_ttl(mut self, ttl_seconds: u32) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Set the expected version.
    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// Write raw bytes, returning whether the write happened.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the write fails.
    pub fn binary(self, value: impl AsRef<[u8]>) -> StorageResult<bool> {
        self.storage.compare_and_set_raw(
            &self.prefix,
            &self.key,
            value.as_ref(),
            self.ttl_seconds,
            self.version,
        )
    }
}

/// Atomically adds `delta` to a counter.
#[must_use = "operations do nothing until a terminal method is called"]
pub struct IncrementOperation<'a> {
    storage: &'a dyn RawStorage,
    prefix: Vec<u8>,
    key: Vec<u8>,
    ttl_seconds: u32,
    initial: i64,
    delta: i64,
}

impl<'a> IncrementOperation<'a> {
    /// Create an increment operation against `storage` (initial `0`, delta `1`).
    pub fn new(storage: &'a dyn RawStorage) -> Self {
        Self {
            storage,
            prefix: Vec::new(),
            key: Vec::new(),
            ttl_seconds: NO_TTL,
            initial: 0,
            delta: 1,
        }
    }

    /// Set the key prefix (bucket).
    pub fn by_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    /// Set the key.
    pub fn by_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = key.as_ref().to_vec();
        self
    }

    /// Request a TTL. Backends without expiry ignore it.
    pub fn with_ttl(mut self, ttl_seconds: u32) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// The value an absent counter starts from.
    pub fn with_initial(mut self, initial: i64) -> Self {
        self.initial = initial;
        self
    }

    /// The amount to add.
    pub fn with_delta(mut self, delta: i64) -> Self {
        self.delta = delta;
        self
    }

    /// Apply the increment and return the new counter value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Encoding`] if the stored value is not a
    /// counter; nothing is written in that case.
    ///
    /// # Deadlocks
    ///
    /// Runs on [`RawStorage::do_in_transaction`] and holds the writer slot for
    /// its duration, so it must not be called from inside another
    /// transaction callback on the same storage.
    pub fn execute(self) -> StorageResult<i64> {
        let mut outcome: StorageResult<i64> = Ok(self.initial);
        let (initial, delta, ttl) = (self.initial, self.delta, self.ttl_seconds);

        let mut apply = |entry: &mut RawEntry| {
            let current =
                if entry.value.is_empty() { Ok(initial) } else { decode_counter(&entry.value) };
            match current {
                Ok(current) => {
                    let next = current.wrapping_add(delta);
                    entry.value = encode_counter(next);
                    entry.ttl = ttl;
                    outcome = Ok(next);
                    true
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            }
        };
        let result = self.storage.do_in_transaction(&self.prefix, &self.key, &mut apply);

        match result {
            // The callback only aborts on a decode failure, which `outcome` holds.
            Ok(()) | Err(StorageError::Canceled) => outcome,
            Err(e) => Err(e),
        }
    }
}

/// Deletes a single key.
#[must_use = "operations do nothing until a terminal method is called"]
pub struct RemoveOperation<'a> {
    storage: &'a dyn RawStorage,
    prefix: Vec<u8>,
    key: Vec<u8>,
}

impl<'a> RemoveOperation<'a> {
    /// Create a remove operation against `storage`.
    pub fn new(storage: &'a dyn RawStorage) -> Self {
        Self { storage, prefix: Vec::new(), key: Vec::new() }
    }

    /// Set the key prefix (bucket).
    pub fn by_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    /// Set the key.
    pub fn by_key(mut self, key: impl AsRef<[u8]>) -> Self {
        self.key = key.as_ref().to_vec();
        self
    }

    /// Delete the key.
    ///
    /// # Errors
    ///
    /// Returns an engine error if the delete fails.
    pub fn execute(self) -> StorageResult<()> {
        self.storage.remove_raw(&self.prefix, &self.key)
    }
}

/// Walks all keys under a prefix.
#[must_use = "operations do nothing until a terminal method is called"]
pub struct EnumerateOperation<'a> {
    storage: &'a dyn RawStorage,
    prefix: Vec<u8>,
    seek: Option<Vec<u8>>,
    batch_size: usize,
    only_keys: bool,
}

impl<'a> EnumerateOperation<'a> {
    /// Create an enumerate operation against `storage`.
    pub fn new(storage: &'a dyn RawStorage) -> Self {
        Self {
            storage,
            prefix: Vec::new(),
            seek: None,
            batch_size: DEFAULT_BATCH_SIZE,
            only_keys: false,
        }
    }

    /// Only visit keys carrying `prefix`.
    pub fn by_prefix(mut self, prefix: impl AsRef<[u8]>) -> Self {
        self.prefix = prefix.as_ref().to_vec();
        self
    }

    /// Start at the first key `>= seek` instead of at the prefix.
    pub fn seek(mut self, seek: impl AsRef<[u8]>) -> Self {
        self.seek = Some(seek.as_ref().to_vec());
        self
    }

    /// Batch size hint.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Skip values; visited entries carry an empty `value`.
    pub fn only_keys(mut self) -> Self {
        self.only_keys = true;
        self
    }

    /// Visit entries until `callback` returns `false`.
    ///
    /// # Errors
    ///
    /// Returns an engine error if iteration fails.
    pub fn for_each(self, mut callback: impl FnMut(&RawEntry) -> bool) -> StorageResult<()> {
        let seek = self.seek.as_deref().unwrap_or(self.prefix.as_slice());
        self.storage.enumerate_raw(
            &self.prefix,
            seek,
            self.batch_size,
            self.only_keys,
            &mut callback,
        )
    }

    /// Collect every visited entry.
    ///
    /// # Errors
    ///
    /// Returns an engine error if iteration fails.
    pub fn entries(self) -> StorageResult<Vec<RawEntry>> {
        let mut out = Vec::new();
        self.for_each(|entry| {
            out.push(entry.clone());
            true
        })?;
        Ok(out)
    }

    /// Collect every key under the prefix, ignoring `seek`.
    ///
    /// # Errors
    ///
    /// Returns an engine error if iteration fails.
    pub fn keys(self) -> StorageResult<Vec<Vec<u8>>> {
        self.storage.fetch_keys_raw(&self.prefix, self.batch_size)
    }
}
