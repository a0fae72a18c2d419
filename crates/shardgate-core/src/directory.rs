//! Shard directory
//!
//! Maps every shard index in `[0, shard_count)` to the store that holds it.
//! Built once at startup and read-only afterwards, so lookups need no locks.
//! Shards that failed to connect stay in the directory as unavailable
//! entries; nothing retries them.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use shardgate_router::ShardIndex;

use crate::store::{DocumentStore, ShardConnector};

/// One slot of the directory
pub struct ShardDescriptor {
    index: ShardIndex,
    handle: Option<Arc<dyn DocumentStore>>,
}

impl ShardDescriptor {
    pub fn index(&self) -> ShardIndex {
        self.index
    }

    pub fn handle(&self) -> Option<&Arc<dyn DocumentStore>> {
        self.handle.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.handle.is_some()
    }
}

impl fmt::Debug for ShardDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardDescriptor")
            .field("index", &self.index)
            .field("store", &self.handle.as_ref().map(|h| h.label()))
            .finish()
    }
}

/// Immutable index -> store table
#[derive(Debug)]
pub struct ShardDirectory {
    shards: Vec<ShardDescriptor>,
}

impl ShardDirectory {
    /// Connect every shard in `[0, shard_count)`
    ///
    /// A failed connection is logged and leaves its slot empty; it never
    /// fails the directory as a whole.
    pub async fn connect(shard_count: u64, connector: &dyn ShardConnector) -> Self {
        info!(shard_count, connector = connector.name(), "Connecting shard directory");

        let mut shards = Vec::new();
        for index in 0..shard_count {
            let handle = match connector.connect(index).await {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(shard_index = index, error = %e, "Shard unavailable");
                    None
                }
            };
            shards.push(ShardDescriptor { index, handle });
        }

        let directory = Self { shards };
        info!(
            shard_count,
            available = directory.available_indices().len(),
            unavailable = directory.unavailable_indices().len(),
            "Shard directory ready"
        );
        directory
    }

    /// Build a directory from already opened stores
    ///
    /// Indices in `[0, shard_count)` without a store are unavailable; stores
    /// for indices outside that range are dropped.
    pub fn from_stores(
        shard_count: u64,
        stores: impl IntoIterator<Item = (ShardIndex, Arc<dyn DocumentStore>)>,
    ) -> Self {
        let mut shards: Vec<ShardDescriptor> = (0..shard_count)
            .map(|index| ShardDescriptor { index, handle: None })
            .collect();
        for (index, store) in stores {
            if let Some(slot) = usize::try_from(index).ok().and_then(|i| shards.get_mut(i)) {
                slot.handle = Some(store);
            }
        }
        Self { shards }
    }

    /// Store for a shard, `None` if unavailable or out of range
    pub fn lookup(&self, index: ShardIndex) -> Option<&Arc<dyn DocumentStore>> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.shards.get(i))
            .and_then(ShardDescriptor::handle)
    }

    pub fn shard_count(&self) -> u64 {
        self.shards.len() as u64
    }

    pub fn descriptors(&self) -> &[ShardDescriptor] {
        &self.shards
    }

    pub fn available_indices(&self) -> Vec<ShardIndex> {
        self.shards
            .iter()
            .filter(|s| s.is_available())
            .map(ShardDescriptor::index)
            .collect()
    }

    pub fn unavailable_indices(&self) -> Vec<ShardIndex> {
        self.shards
            .iter()
            .filter(|s| !s.is_available())
            .map(ShardDescriptor::index)
            .collect()
    }
}
