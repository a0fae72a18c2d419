//! Common types for the router module
//!
//! Centralizes type definitions to avoid duplication across crates.

/// User identifier (externally supplied, never generated here)
pub type UserId = u64;

/// Shard index (position of a partition in the shard directory)
pub type ShardIndex = u64;

/// Number of consecutive user ids owned by one shard.
///
/// Fixed at build time. Changing it moves every existing record to a
/// different shard.
pub const PARTITION_WIDTH: u64 = 10_000;

/// Default number of provisioned shards
pub const DEFAULT_SHARD_COUNT: u64 = 100;

/// Default prefix of the per-shard document-store project name
pub const DEFAULT_PROJECT_PREFIX: &str = "ai-card";

/// Default prefix of the per-shard mirror account name
pub const DEFAULT_MIRROR_PREFIX: &str = "mega";
