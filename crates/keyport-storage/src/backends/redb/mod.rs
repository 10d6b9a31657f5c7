//! Redb storage backend.
//!
//! This module implements the storage contract on top of Redb, a pure-Rust
//! embedded database with ACID transactions and copy-on-write snapshots.
//!
//! All prefixes share one physical table. A prefix is simply the leading
//! bytes of the key, so bucket scans and bucket deletes are key ranges.
//!
//! # Example
//!
//! ```ignore
//! use keyport_storage::backends::redb::RedbStorage;
//! use keyport_storage::ManagedStorage;
//!
//! // Open a database (creates if it doesn't exist)
//! let storage = RedbStorage::open("sessions", "sessions.redb")?;
//!
//! storage.set().by_prefix("session/").by_key("42").text("alice")?;
//! let hits = storage.increment().by_prefix("stats/").by_key("logins").execute()?;
//! ```
//!
//! # In-Memory Databases
//!
//! For testing, you can create an in-memory database that doesn't persist:
//!
//! ```ignore
//! let storage = RedbStorage::in_memory("scratch")?;
//! ```
//!
//! # Configuration
//!
//! Use `RedbConfig` to customize the database behavior:
//!
//! ```ignore
//! use keyport_storage::backends::redb::{RedbConfig, RedbStorage, WriteDurability};
//!
//! let config = RedbConfig::new()
//!     .cache_size(64 * 1024 * 1024) // 64 MB cache
//!     .durability(WriteDurability::Sync);
//!
//! let storage = RedbStorage::open_with_config("audit", "audit.redb", config)?;
//! ```

mod backup;
mod config;
mod storage;
pub mod tables;

pub use backup::BackupStats;
pub use config::{RedbConfig, WriteDurability};
pub use storage::RedbStorage;
