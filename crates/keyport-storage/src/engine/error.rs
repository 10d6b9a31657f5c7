//! Storage error types.

use thiserror::Error;

/// Errors that can occur in storage operations.
///
/// The first three variants are the adapter's own vocabulary. Engine
/// failures carry the engine's message; the adapter never retries or masks
/// them.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A required point lookup found nothing.
    #[error("key not found")]
    NotFound,

    /// A backup stream did not have the expected shape.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A read-modify-write callback declined to commit.
    #[error("operation canceled")]
    Canceled,

    /// The database could not be opened.
    #[error("failed to open database: {0}")]
    Open(String),

    /// A transaction could not be started.
    #[error("transaction error: {0}")]
    Transaction(String),

    /// The data table could not be opened.
    #[error("table error: {0}")]
    Table(String),

    /// The engine failed while reading or writing.
    #[error("engine error: {0}")]
    Engine(String),

    /// A write transaction failed to commit.
    #[error("commit error: {0}")]
    Commit(String),

    /// Compaction failed.
    #[error("compaction error: {0}")]
    Compaction(String),

    /// An I/O error occurred on a backup writer or restore reader.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded into the requested type.
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl StorageError {
    /// Create an invalid format error.
    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create an encoding error.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Returns `true` if this is a [`StorageError::NotFound`].
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

macro_rules! from_engine_error {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for StorageError {
                fn from(e: $source) -> Self {
                    Self::$variant(e.to_string())
                }
            }
        )*
    };
}

from_engine_error! {
    redb::DatabaseError => Open,
    redb::TransactionError => Transaction,
    redb::TableError => Table,
    redb::StorageError => Engine,
    redb::CommitError => Commit,
    redb::CompactionError => Compaction,
}

/// A specialized `Result` type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
