//! Error types for store backends and gateways

use thiserror::Error;

use shardgate_router::{ShardIndex, UserId};

/// Errors raised by a single shard's document store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The partition could not be reached at connect time
    #[error("Connection failed: {0}")]
    Connect(String),

    /// Credentials for the partition are missing or unusable
    #[error("Invalid credentials for {project}: {reason}")]
    Credentials { project: String, reason: String },

    /// Transport-level failure talking to the store
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered but rejected the operation
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The store answered with something we could not decode
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Errors surfaced by the record gateway
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The owning shard has no live connection
    #[error("Shard {shard_index} is not available")]
    StoreUnavailable { shard_index: ShardIndex },

    /// The owning shard has no record for this user
    #[error("User {user_id} not found on shard {shard_index}")]
    NotFound { user_id: UserId, shard_index: ShardIndex },

    /// The owning shard rejected an otherwise valid operation
    #[error("Shard {shard_index} store error: {source}")]
    Upstream {
        shard_index: ShardIndex,
        #[source]
        source: StoreError,
    },
}

impl GatewayError {
    /// Shard the failed operation was routed to
    pub fn shard_index(&self) -> ShardIndex {
        match self {
            GatewayError::StoreUnavailable { shard_index }
            | GatewayError::NotFound { shard_index, .. }
            | GatewayError::Upstream { shard_index, .. } => *shard_index,
        }
    }
}
