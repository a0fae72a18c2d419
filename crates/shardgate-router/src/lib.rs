//! Shardgate Router - User-to-Shard Routing
//!
//! Maps user ids onto document-store partitions.
//!
//! # Architecture
//!
//! ```text
//! user_id
//!     │
//!     ▼
//! ┌─────────────────────────┐
//! │    DivisionStrategy     │  user_id / PARTITION_WIDTH
//! │   (Which shard?)        │
//! └───────────┬─────────────┘
//!             │
//!             ▼
//!        ShardIndex  ──►  ShardDirectory (shardgate-core)
//! ```
//!
//! Routing is pure and never consults the directory, so an index beyond the
//! provisioned shard count is returned as-is and reported as unavailable by
//! whoever looks it up.
//!
//! # Example
//!
//! ```rust
//! use shardgate_router::{route, ShardInfo, ShardLabels};
//!
//! assert_eq!(route(25000), 2);
//!
//! let info = ShardInfo::for_user(12345, &ShardLabels::default());
//! assert_eq!(info.partition_label, "ai-card-1");
//! ```

mod types;
mod shard;
mod strategy;

// Re-exports: Core types
pub use types::{
    UserId, ShardIndex, PARTITION_WIDTH, DEFAULT_SHARD_COUNT,
    DEFAULT_PROJECT_PREFIX, DEFAULT_MIRROR_PREFIX,
};

// Re-exports: Introspection
pub use shard::{ShardInfo, ShardLabels};

// Re-exports: Strategies
pub use strategy::{route, DivisionStrategy, ShardStrategy};
