//! Storage contract.
//!
//! This module defines what every storage backend provides:
//!
//! - [`RawStorage`] - Byte-level get/set/remove, read-modify-write and scans
//! - [`ManagedStorage`] - Named instances with builders, maintenance and backup
//! - [`ops`] - Fluent builders over the raw operations
//!
//! # Error Handling
//!
//! All operations return [`StorageResult<T>`] which is an alias for
//! `Result<T, StorageError>`. See [`StorageError`] for the possible error variants.

mod error;
pub mod ops;
mod traits;

pub use error::{StorageError, StorageResult};
pub use ops::{
    CompareAndSetOperation, EnumerateOperation, GetOperation, IncrementOperation,
    RemoveOperation, SetOperation,
};
pub use traits::{ManagedStorage, RawEntry, RawStorage, NO_TTL};
