//! Shard Selection Strategies
//!
//! Only one strategy ships today:
//!
//! - `DivisionStrategy`: contiguous id ranges, `user_id / PARTITION_WIDTH`
//!
//! ```text
//! user_id ──► ShardStrategy::route ──► ShardIndex ──► ShardDirectory::lookup
//! ```

mod division;

pub use division::{route, DivisionStrategy};

use crate::types::{ShardIndex, UserId};

/// Trait for shard selection strategies
///
/// Implementations must be pure: the same id maps to the same shard for the
/// lifetime of a deployment.
pub trait ShardStrategy: Send + Sync {
    /// Route a user id to a shard
    fn route(&self, user_id: UserId) -> ShardIndex;

    /// Strategy name for logging
    fn name(&self) -> &'static str;
}
