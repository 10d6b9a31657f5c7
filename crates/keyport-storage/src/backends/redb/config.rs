//! Configuration for the Redb storage adapter.

use redb::Durability;

/// How eagerly writes reach stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteDurability {
    /// Acknowledge writes without forcing a sync; recent writes may be lost
    /// on a crash until the next durable commit or [`flush`].
    ///
    /// [`flush`]: crate::ManagedStorage::flush
    #[default]
    NoSync,
    /// Sync every write before acknowledging it.
    Sync,
}

impl WriteDurability {
    pub(crate) const fn as_redb(self) -> Durability {
        match self {
            Self::NoSync => Durability::Eventual,
            Self::Sync => Durability::Immediate,
        }
    }
}

/// Configuration options for the Redb storage adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedbConfig {
    /// Cache size in bytes.
    /// If not set, uses Redb's default.
    pub cache_size: Option<usize>,

    /// Durability of every write issued by the adapter.
    pub durability: WriteDurability,
}

impl RedbConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cache size.
    #[must_use]
    pub const fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Set the write durability.
    #[must_use]
    pub const fn durability(mut self, durability: WriteDurability) -> Self {
        self.durability = durability;
        self
    }
}
