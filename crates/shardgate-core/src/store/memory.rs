//! In-process document store
//!
//! Mirrors the query semantics of the hosted store closely enough for local
//! runs and tests: only string `name` fields take part in name searches, and
//! matches come back ordered by name, then by key.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use shardgate_router::{ShardIndex, ShardLabels, UserId};

use crate::error::StoreError;
use super::{Document, DocumentStore, Payload, ShardConnector, NAME_FIELD};

/// Memory-backed `users` collection
pub struct MemoryStore {
    label: String,
    documents: RwLock<BTreeMap<UserId, Payload>>,
}

impl MemoryStore {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn set(&self, user_id: UserId, payload: &Payload) -> Result<(), StoreError> {
        self.documents.write().insert(user_id, payload.clone());
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Payload>, StoreError> {
        Ok(self.documents.read().get(&user_id).cloned())
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        let documents = self.documents.read();

        let mut matches: Vec<(&str, UserId, &Payload)> = documents
            .iter()
            .filter_map(|(user_id, data)| match data.get(NAME_FIELD) {
                Some(Value::String(name)) if name.as_str() >= query => {
                    Some((name.as_str(), *user_id, data))
                }
                _ => None,
            })
            .collect();
        matches.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cmp(&b.1)));

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|(_, user_id, data)| Document {
                key: user_id.to_string(),
                data: data.clone(),
            })
            .collect())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Connector that hands out a fresh memory store per shard
///
/// Indices listed as offline fail to connect, which lets local runs and
/// tests exercise the unavailable-shard paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    labels: ShardLabels,
    offline: HashSet<ShardIndex>,
}

impl MemoryConnector {
    pub fn new(labels: ShardLabels) -> Self {
        Self {
            labels,
            offline: HashSet::new(),
        }
    }

    /// Mark shards that should refuse to connect
    pub fn with_offline(mut self, offline: impl IntoIterator<Item = ShardIndex>) -> Self {
        self.offline.extend(offline);
        self
    }
}

#[async_trait]
impl ShardConnector for MemoryConnector {
    async fn connect(&self, shard_index: ShardIndex) -> Result<Arc<dyn DocumentStore>, StoreError> {
        let project = self.labels.project(shard_index);
        if self.offline.contains(&shard_index) {
            return Err(StoreError::Connect(format!("{} is marked offline", project)));
        }
        Ok(Arc::new(MemoryStore::new(project)))
    }

    fn name(&self) -> &'static str {
        "Memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    #[tokio::test]
    async fn test_set_overwrites_whole_record() {
        let store = MemoryStore::new("ai-card-0");

        store.set(1, &payload(json!({"name": "alice", "age": 30}))).await.unwrap();
        store.set(1, &payload(json!({"name": "alicia"}))).await.unwrap();

        let stored = store.get(1).await.unwrap().unwrap();
        assert_eq!(stored, payload(json!({"name": "alicia"})));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new("ai-card-0");
        assert!(store.is_empty());
        assert!(store.get(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_by_name_filters_and_orders() {
        let store = MemoryStore::new("ai-card-0");
        store.set(1, &payload(json!({"name": "carol"}))).await.unwrap();
        store.set(2, &payload(json!({"name": "alice"}))).await.unwrap();
        store.set(3, &payload(json!({"name": "bob"}))).await.unwrap();
        store.set(4, &payload(json!({"name": 42}))).await.unwrap();
        store.set(5, &payload(json!({"nickname": "zed"}))).await.unwrap();

        let found = store.search_by_name("b", 10).await.unwrap();
        let ids: Vec<_> = found.iter().filter_map(Document::user_id).collect();

        // Non-string and missing names never match
        assert_eq!(ids, vec![3, 1]);
    }

    #[tokio::test]
    async fn test_search_by_name_respects_limit() {
        let store = MemoryStore::new("ai-card-0");
        for i in 0..25u64 {
            store.set(i, &payload(json!({"name": format!("user-{:02}", i)}))).await.unwrap();
        }

        let found = store.search_by_name("", 10).await.unwrap();
        assert_eq!(found.len(), 10);
        assert_eq!(found[0].key, "0");
        assert_eq!(found[9].key, "9");
    }

    #[tokio::test]
    async fn test_connector_offline_shards() {
        let connector = MemoryConnector::default().with_offline([2]);

        let store = connector.connect(1).await.unwrap();
        assert_eq!(store.label(), "ai-card-1");

        let err = connector.connect(2).await.err().unwrap();
        assert!(matches!(err, StoreError::Connect(_)));
    }
}
