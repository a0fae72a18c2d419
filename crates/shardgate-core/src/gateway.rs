//! Record and search gateways
//!
//! ```text
//!                 ┌──────────────────┐
//! put / get ────► │  RecordGateway   │ ── route ──► one shard
//!                 └──────────────────┘
//!                 ┌──────────────────┐
//! search ───────► │  SearchGateway   │ ── fan out ─► every shard
//!                 └──────────────────┘
//! ```
//!
//! Record operations fail fast with a [`GatewayError`]. Searches never fail:
//! a shard that is unavailable or errors simply contributes nothing, and the
//! per-shard outcome is logged and returned in the [`SearchReport`].

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use shardgate_router::{DivisionStrategy, ShardIndex, ShardStrategy, UserId};

use crate::directory::{ShardDescriptor, ShardDirectory};
use crate::error::{GatewayError, StoreError};
use crate::store::Payload;

/// Maximum matches taken from each shard per search
pub const SEARCH_LIMIT_PER_SHARD: usize = 10;

/// A fetched user record
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub shard_index: ShardIndex,
    pub data: Payload,
}

/// Single-shard create/read gateway
pub struct RecordGateway {
    directory: Arc<ShardDirectory>,
    strategy: DivisionStrategy,
}

impl RecordGateway {
    pub fn new(directory: Arc<ShardDirectory>) -> Self {
        Self {
            directory,
            strategy: DivisionStrategy::new(),
        }
    }

    /// Store `payload` for `user_id`, overwriting any previous record
    ///
    /// Returns the shard the record was written to.
    pub async fn put(&self, user_id: UserId, payload: &Payload) -> Result<ShardIndex, GatewayError> {
        let shard_index = self.strategy.route(user_id);
        let store = self
            .directory
            .lookup(shard_index)
            .ok_or(GatewayError::StoreUnavailable { shard_index })?;

        store
            .set(user_id, payload)
            .await
            .map_err(|source| GatewayError::Upstream { shard_index, source })?;

        debug!(user_id, shard_index, "Stored user record");
        Ok(shard_index)
    }

    /// Fetch the record for `user_id` from its shard
    pub async fn get(&self, user_id: UserId) -> Result<UserRecord, GatewayError> {
        let shard_index = self.strategy.route(user_id);
        let store = self
            .directory
            .lookup(shard_index)
            .ok_or(GatewayError::StoreUnavailable { shard_index })?;

        let data = store
            .get(user_id)
            .await
            .map_err(|source| GatewayError::Upstream { shard_index, source })?
            .ok_or(GatewayError::NotFound { user_id, shard_index })?;

        Ok(UserRecord { shard_index, data })
    }
}

/// A search match annotated with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Document key in the shard's `users` collection
    pub key: String,
    pub shard_index: ShardIndex,
    pub data: Payload,
}

impl SearchHit {
    /// The key as a user id, if it is one
    pub fn user_id(&self) -> Option<UserId> {
        self.key.parse().ok()
    }
}

/// What happened on one shard during a search
#[derive(Debug)]
pub enum ShardOutcome {
    /// The shard answered with this many matches
    Answered { hits: usize },
    /// The shard has no live connection
    Unavailable,
    /// The shard's store rejected the query
    Failed { error: StoreError },
}

/// Per-shard result of a search
#[derive(Debug)]
pub struct ShardSearch {
    pub shard_index: ShardIndex,
    pub outcome: ShardOutcome,
}

/// Everything a fan-out search produced
#[derive(Debug, Default)]
pub struct SearchReport {
    /// Matches from all answering shards, unranked
    pub hits: Vec<SearchHit>,
    /// One entry per shard in the directory
    pub shards: Vec<ShardSearch>,
}

impl SearchReport {
    pub fn answered(&self) -> usize {
        self.count(|o| matches!(o, ShardOutcome::Answered { .. }))
    }

    pub fn unavailable(&self) -> usize {
        self.count(|o| matches!(o, ShardOutcome::Unavailable))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ShardOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ShardOutcome) -> bool) -> usize {
        self.shards.iter().filter(|s| pred(&s.outcome)).count()
    }
}

/// Fan-out name search over every shard
pub struct SearchGateway {
    directory: Arc<ShardDirectory>,
}

impl SearchGateway {
    pub fn new(directory: Arc<ShardDirectory>) -> Self {
        Self { directory }
    }

    /// Find records whose `name` is `>= query` on every shard
    ///
    /// Shards are queried concurrently. At most `SEARCH_LIMIT_PER_SHARD` matches
    /// come from each shard; there is no global cap, ordering or dedup.
    pub async fn search(&self, query: &str) -> SearchReport {
        let per_shard = join_all(
            self.directory
                .descriptors()
                .iter()
                .map(|descriptor| self.search_shard(descriptor, query)),
        )
        .await;

        let mut report = SearchReport::default();
        for (shard, mut hits) in per_shard {
            report.hits.append(&mut hits);
            report.shards.push(shard);
        }

        let (failed, unavailable) = (report.failed(), report.unavailable());
        if failed > 0 {
            warn!(
                query,
                failed,
                unavailable,
                answered = report.answered(),
                "Search returned partial results"
            );
        } else {
            debug!(
                query,
                hits = report.hits.len(),
                answered = report.answered(),
                unavailable,
                "Search complete"
            );
        }
        report
    }

    async fn search_shard(
        &self,
        descriptor: &ShardDescriptor,
        query: &str,
    ) -> (ShardSearch, Vec<SearchHit>) {
        let shard_index = descriptor.index();
        let Some(store) = descriptor.handle() else {
            debug!(shard_index, "Skipping unavailable shard");
            return (
                ShardSearch { shard_index, outcome: ShardOutcome::Unavailable },
                Vec::new(),
            );
        };

        match store.search_by_name(query, SEARCH_LIMIT_PER_SHARD).await {
            Ok(documents) => {
                let hits: Vec<SearchHit> = documents
                    .into_iter()
                    .map(|doc| SearchHit {
                        key: doc.key,
                        shard_index,
                        data: doc.data,
                    })
                    .collect();
                let outcome = ShardOutcome::Answered { hits: hits.len() };
                (ShardSearch { shard_index, outcome }, hits)
            }
            Err(error) => {
                warn!(shard_index, store = store.label(), error = %error, "Shard search failed");
                (
                    ShardSearch { shard_index, outcome: ShardOutcome::Failed { error } },
                    Vec::new(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::store::{Document, DocumentStore, MemoryConnector, MemoryStore};

    /// Store whose every call is rejected
    struct BrokenStore;

    #[async_trait]
    impl DocumentStore for BrokenStore {
        async fn set(&self, _: UserId, _: &Payload) -> Result<(), StoreError> {
            Err(StoreError::Api { status: 503, message: "backend down".to_string() })
        }

        async fn get(&self, _: UserId) -> Result<Option<Payload>, StoreError> {
            Err(StoreError::Api { status: 503, message: "backend down".to_string() })
        }

        async fn search_by_name(&self, _: &str, _: usize) -> Result<Vec<Document>, StoreError> {
            Err(StoreError::Api { status: 503, message: "backend down".to_string() })
        }

        fn label(&self) -> &str {
            "broken"
        }
    }

    /// Store whose collection was populated outside the gateway
    struct ImportedStore(Vec<Document>);

    #[async_trait]
    impl DocumentStore for ImportedStore {
        async fn set(&self, _: UserId, _: &Payload) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get(&self, _: UserId) -> Result<Option<Payload>, StoreError> {
            Ok(None)
        }

        async fn search_by_name(&self, _: &str, _: usize) -> Result<Vec<Document>, StoreError> {
            Ok(self.0.clone())
        }

        fn label(&self) -> &str {
            "imported"
        }
    }

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("payload must be an object"),
        }
    }

    async fn memory_directory(shard_count: u64, offline: &[ShardIndex]) -> Arc<ShardDirectory> {
        let connector = MemoryConnector::default().with_offline(offline.iter().copied());
        Arc::new(ShardDirectory::connect(shard_count, &connector).await)
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let gateway = RecordGateway::new(memory_directory(4, &[]).await);
        let data = payload(json!({"name": "alice", "tags": ["a", "b"], "age": 30}));

        let shard_index = gateway.put(12345, &data).await.unwrap();
        assert_eq!(shard_index, 1);

        let record = gateway.get(12345).await.unwrap();
        assert_eq!(record, UserRecord { shard_index: 1, data });
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let gateway = RecordGateway::new(memory_directory(1, &[]).await);

        gateway.put(7, &payload(json!({"name": "a", "extra": 1}))).await.unwrap();
        gateway.put(7, &payload(json!({"name": "b"}))).await.unwrap();

        let record = gateway.get(7).await.unwrap();
        assert_eq!(record.data, payload(json!({"name": "b"})));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let gateway = RecordGateway::new(memory_directory(2, &[]).await);

        let err = gateway.get(10001).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound { user_id: 10001, shard_index: 1 }));
    }

    #[tokio::test]
    async fn test_unavailable_shard() {
        let gateway = RecordGateway::new(memory_directory(3, &[1]).await);
        let data = payload(json!({"name": "x"}));

        let err = gateway.put(15000, &data).await.unwrap_err();
        assert!(matches!(err, GatewayError::StoreUnavailable { shard_index: 1 }));

        let err = gateway.get(15000).await.unwrap_err();
        assert!(matches!(err, GatewayError::StoreUnavailable { shard_index: 1 }));

        // Past the end of the directory
        let err = gateway.get(1_000_000).await.unwrap_err();
        assert!(matches!(err, GatewayError::StoreUnavailable { shard_index: 100 }));
        assert_eq!(err.shard_index(), 100);
    }

    #[tokio::test]
    async fn test_upstream_error() {
        let store: Arc<dyn DocumentStore> = Arc::new(BrokenStore);
        let gateway = RecordGateway::new(Arc::new(ShardDirectory::from_stores(1, [(0, store)])));

        let err = gateway.put(5, &Payload::new()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { shard_index: 0, .. }));

        let err = gateway.get(5).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream { shard_index: 0, .. }));
    }

    #[tokio::test]
    async fn test_search_spans_shards_and_filters() {
        let directory = memory_directory(3, &[]).await;
        let records = RecordGateway::new(directory.clone());
        records.put(1, &payload(json!({"name": "alice"}))).await.unwrap();
        records.put(10001, &payload(json!({"name": "bob"}))).await.unwrap();
        records.put(20001, &payload(json!({"name": "carol"}))).await.unwrap();

        let report = SearchGateway::new(directory).search("b").await;

        let mut found: Vec<_> = report.hits.iter().map(|h| (h.user_id(), h.shard_index)).collect();
        found.sort();
        assert_eq!(found, vec![(Some(10001), 1), (Some(20001), 2)]);
        for hit in &report.hits {
            assert!(hit.data["name"].as_str().unwrap() >= "b");
        }
        assert_eq!(report.answered(), 3);
    }

    #[tokio::test]
    async fn test_search_caps_each_shard() {
        let directory = memory_directory(2, &[]).await;
        let records = RecordGateway::new(directory.clone());
        for i in 0..15u64 {
            records.put(i, &payload(json!({"name": format!("a{:02}", i)}))).await.unwrap();
            records.put(10000 + i, &payload(json!({"name": format!("b{:02}", i)}))).await.unwrap();
        }

        let report = SearchGateway::new(directory).search("").await;

        // 30 records match, each shard gives up at most its cap
        assert_eq!(report.hits.len(), 2 * SEARCH_LIMIT_PER_SHARD);
        assert_eq!(report.hits.iter().filter(|h| h.shard_index == 0).count(), SEARCH_LIMIT_PER_SHARD);
    }

    #[tokio::test]
    async fn test_search_tolerates_bad_shards() {
        let healthy = Arc::new(MemoryStore::new("ai-card-0"));
        healthy.set(3, &payload(json!({"name": "dave"}))).await.unwrap();

        let healthy: Arc<dyn DocumentStore> = healthy;
        let broken: Arc<dyn DocumentStore> = Arc::new(BrokenStore);
        let directory = Arc::new(ShardDirectory::from_stores(3, [(0, healthy), (1, broken)]));

        let report = SearchGateway::new(directory).search("d").await;

        assert_eq!(report.hits.len(), 1);
        assert_eq!(report.hits[0].key, "3");
        assert_eq!(report.answered(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.unavailable(), 1);
        assert_eq!(report.shards.len(), 3);
    }

    #[tokio::test]
    async fn test_search_keeps_non_numeric_keys() {
        let store: Arc<dyn DocumentStore> = Arc::new(ImportedStore(vec![
            Document { key: "alice-legacy".to_string(), data: payload(json!({"name": "zed"})) },
            Document { key: "12".to_string(), data: payload(json!({"name": "zoe"})) },
        ]));
        let directory = Arc::new(ShardDirectory::from_stores(1, [(0, store)]));

        let report = SearchGateway::new(directory).search("a").await;

        assert_eq!(report.hits.len(), 2);
        assert_eq!(report.hits[0].key, "alice-legacy");
        assert_eq!(report.hits[0].user_id(), None);
        assert_eq!(report.hits[1].user_id(), Some(12));
    }

    #[tokio::test]
    async fn test_search_everything_down() {
        let directory = memory_directory(2, &[0, 1]).await;

        let report = SearchGateway::new(directory).search("").await;

        assert!(report.hits.is_empty());
        assert_eq!(report.unavailable(), 2);
    }
}
