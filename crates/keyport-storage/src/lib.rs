//! Keyport Storage
//!
//! This crate adapts an embedded, ordered key-value engine to a generic
//! storage contract: point reads and writes addressed by `(prefix, key)`,
//! read-modify-write on a single key, prefix scans, whole-store backup and
//! restore, and maintenance operations.
//!
//! # Overview
//!
//! A prefix acts as a bucket. The engine key is always `prefix || key`, and
//! scans over a prefix visit exactly the keys that start with it, in
//! ascending byte order. Every key or value handed back to the caller is an
//! owned copy.
//!
//! # Core Traits
//!
//! - [`RawStorage`] - Byte-level operations every backend implements
//! - [`ManagedStorage`] - Named instances with fluent builders, compaction,
//!   backup/restore and bulk deletes
//!
//! # Error Handling
//!
//! All storage operations return [`StorageResult<T>`], which is an alias for
//! `Result<T, StorageError>`.
//!
//! # Example
//!
//! ```ignore
//! use keyport_storage::{ManagedStorage, RedbStorage};
//!
//! let storage = RedbStorage::open("users", "users.redb")?;
//!
//! storage.set().by_prefix("user/").by_key("1").text("Alice")?;
//! storage.set().by_prefix("user/").by_key("2").text("Bob")?;
//!
//! let keys = storage.enumerate().by_prefix("user/").keys()?;
//! assert_eq!(keys, vec![b"user/1".to_vec(), b"user/2".to_vec()]);
//! ```
//!
//! # Modules
//!
//! - [`engine`] - Storage traits, builders and errors
//! - [`backends`] - Concrete storage backend implementations
//! - [`codec`] - Blob framing used by backup streams

pub mod backends;
pub mod codec;
pub mod engine;

pub use backends::{RedbConfig, RedbStorage, WriteDurability};
pub use engine::{
    CompareAndSetOperation, EnumerateOperation, GetOperation, IncrementOperation,
    ManagedStorage, RawEntry, RawStorage, RemoveOperation, SetOperation, StorageError,
    StorageResult, NO_TTL,
};
