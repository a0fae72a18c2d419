//! Division-based Shard Strategy
//!
//! Routes users to shards by integer division of the id by a fixed
//! partition width. Ids `[0, 10000)` live on shard 0, `[10000, 20000)` on
//! shard 1, and so on.
//!
//! The router never checks the result against the configured shard count;
//! an index past the end of the directory shows up downstream as an
//! unavailable shard.

use crate::types::{ShardIndex, UserId, PARTITION_WIDTH};
use super::ShardStrategy;

/// Route a user id with the build-time partition width
#[inline]
pub fn route(user_id: UserId) -> ShardIndex {
    user_id / PARTITION_WIDTH
}

/// Division-based shard routing strategy
#[derive(Debug, Clone, Copy, Default)]
pub struct DivisionStrategy;

impl DivisionStrategy {
    /// Create the strategy
    pub fn new() -> Self {
        Self
    }
}

impl ShardStrategy for DivisionStrategy {
    fn route(&self, user_id: UserId) -> ShardIndex {
        route(user_id)
    }

    fn name(&self) -> &'static str {
        "Division"
    }
}
