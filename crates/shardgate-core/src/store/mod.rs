//! Document store backends
//!
//! Every shard is one independent document store holding a `users`
//! collection keyed by user id. The gateway only ever talks to the
//! [`DocumentStore`] trait; [`ShardConnector`] builds one store per shard at
//! startup.

mod memory;
pub mod firestore;

pub use memory::{MemoryConnector, MemoryStore};
pub use firestore::{FirestoreConnector, FirestoreCredentials, FirestoreStore};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use shardgate_router::{ShardIndex, UserId};

use crate::error::StoreError;

/// Opaque user payload (field name -> value)
pub type Payload = serde_json::Map<String, Value>;

/// Collection that holds user records in every shard
pub const USERS_COLLECTION: &str = "users";

/// Field matched by name searches
pub const NAME_FIELD: &str = "name";

/// A stored user record together with its document key
///
/// Keys written through the gateway are decimal user ids, but a collection
/// may hold documents created by other tools, so the key stays a string.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub data: Payload,
}

impl Document {
    /// The key as a user id, if it is one
    pub fn user_id(&self) -> Option<UserId> {
        self.key.parse().ok()
    }
}

/// One shard's `users` collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a record, replacing any previous value wholesale
    async fn set(&self, user_id: UserId, payload: &Payload) -> Result<(), StoreError>;

    /// Fetch a record, `None` if the key is absent
    async fn get(&self, user_id: UserId) -> Result<Option<Payload>, StoreError>;

    /// Records whose string `name` field is `>= query`, ordered by name,
    /// at most `limit` of them
    async fn search_by_name(&self, query: &str, limit: usize) -> Result<Vec<Document>, StoreError>;

    /// Backend label for logging (usually the project name)
    fn label(&self) -> &str;
}

/// Opens the store behind one shard index
#[async_trait]
pub trait ShardConnector: Send + Sync {
    async fn connect(&self, shard_index: ShardIndex) -> Result<Arc<dyn DocumentStore>, StoreError>;

    /// Connector name for logging
    fn name(&self) -> &'static str;
}
