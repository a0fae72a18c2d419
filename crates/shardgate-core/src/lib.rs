//! Shardgate Core - Shard directory, stores and gateways
//!
//! This crate provides everything between the HTTP layer and the external
//! document stores: backend clients, the startup-built shard directory, and
//! the record/search gateways that use it.

pub mod config;
pub mod directory;
pub mod error;
pub mod gateway;
pub mod store;

pub use config::{GatewayConfig, NetworkConfig, StoreBackend, MAX_SHARD_COUNT};
pub use directory::{ShardDescriptor, ShardDirectory};
pub use error::{GatewayError, StoreError};
pub use gateway::{
    RecordGateway, SearchGateway, SearchHit, SearchReport, ShardOutcome, ShardSearch,
    UserRecord, SEARCH_LIMIT_PER_SHARD,
};
pub use store::{Document, DocumentStore, Payload, ShardConnector};
