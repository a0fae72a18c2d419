//! Configuration module for shardgate

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

use shardgate_router::{ShardIndex, ShardLabels, DEFAULT_SHARD_COUNT};

use crate::error::StoreError;
use crate::store::firestore::DEFAULT_ENDPOINT;
use crate::store::{FirestoreConnector, MemoryConnector, ShardConnector};

/// Largest accepted `SHARD_COUNT`; every shard is connected at startup
pub const MAX_SHARD_COUNT: u64 = 10_000;

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Instance ID, for correlating logs across restarts
    pub instance_id: String,

    /// Network configuration
    pub network: NetworkConfig,

    /// Number of provisioned shards
    pub shard_count: u64,

    /// Names of the external resources behind each shard
    pub labels: ShardLabels,

    /// Where shard data lives
    pub backend: StoreBackend,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Listen address
    pub listen_addr: String,

    /// Listen port
    pub port: u16,
}

/// Store backend selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process stores, lost on restart
    Memory {
        /// Shards that refuse to connect
        offline: Vec<ShardIndex>,
    },

    /// One Firestore project per shard
    Firestore {
        /// Directory holding `{project}.json` credential files
        credentials_dir: PathBuf,

        /// REST endpoint (the emulator's address for local runs)
        endpoint: String,
    },
}

impl StoreBackend {
    /// Build the connector that opens each shard's store
    pub fn connector(&self, labels: &ShardLabels) -> Result<Box<dyn ShardConnector>, StoreError> {
        let connector: Box<dyn ShardConnector> = match self {
            StoreBackend::Memory { offline } => Box::new(
                MemoryConnector::new(labels.clone()).with_offline(offline.iter().copied()),
            ),
            StoreBackend::Firestore { credentials_dir, endpoint } => Box::new(
                FirestoreConnector::new(endpoint.clone(), credentials_dir.clone(), labels.clone())?,
            ),
        };
        Ok(connector)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            instance_id: uuid::Uuid::new_v4().to_string(),
            network: NetworkConfig::default(),
            shard_count: DEFAULT_SHARD_COUNT,
            labels: ShardLabels::default(),
            backend: StoreBackend::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Memory { offline: vec![] }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = GatewayConfig::default();

        if let Some(instance_id) = lookup("INSTANCE_ID") {
            config.instance_id = instance_id;
        }

        // Network
        if let Some(addr) = lookup("GATEWAY_LISTEN_ADDR") {
            config.network.listen_addr = addr;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port) => config.network.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid PORT"),
            }
        }

        // Shards
        if let Some(count) = lookup("SHARD_COUNT") {
            match count.parse::<u64>() {
                Ok(n) if n <= MAX_SHARD_COUNT => config.shard_count = n,
                Ok(n) => warn!(value = n, max = MAX_SHARD_COUNT, "Ignoring SHARD_COUNT above limit"),
                Err(_) => warn!(value = %count, "Ignoring invalid SHARD_COUNT"),
            }
        }
        if let Some(prefix) = lookup("SHARD_PROJECT_PREFIX") {
            config.labels.project_prefix = prefix;
        }
        if let Some(prefix) = lookup("SHARD_MIRROR_PREFIX") {
            config.labels.mirror_prefix = prefix;
        }

        // Backend
        match lookup("SHARD_BACKEND").as_deref() {
            None | Some("memory") => {
                let offline = lookup("SHARD_OFFLINE")
                    .map(|list| parse_index_list(&list))
                    .unwrap_or_default();
                config.backend = StoreBackend::Memory { offline };
            }
            Some("firestore") => {
                config.backend = StoreBackend::Firestore {
                    credentials_dir: lookup("SHARD_CREDENTIALS_DIR")
                        .unwrap_or_else(|| "credentials".to_string())
                        .into(),
                    endpoint: lookup("FIRESTORE_ENDPOINT")
                        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                };
            }
            Some(other) => warn!(value = %other, "Ignoring unknown SHARD_BACKEND, using memory"),
        }

        config
    }

    /// `listen_addr:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.network.listen_addr, self.network.port)
    }
}

/// Parse a comma separated list of shard indices, skipping junk
fn parse_index_list(list: &str) -> Vec<ShardIndex> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(index) => Some(index),
            Err(_) => {
                warn!(value = %s, "Ignoring invalid shard index");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert!(!config.instance_id.is_empty());
        assert_eq!(config.network.port, 5000);
        assert_eq!(config.shard_count, 100);
        assert_eq!(config.labels, ShardLabels::default());
        assert_eq!(config.backend, StoreBackend::Memory { offline: vec![] });
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_overrides() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("GATEWAY_LISTEN_ADDR", "0.0.0.0"),
            ("SHARD_COUNT", "12"),
            ("SHARD_PROJECT_PREFIX", "users"),
            ("SHARD_BACKEND", "firestore"),
            ("SHARD_CREDENTIALS_DIR", "/etc/shardgate"),
            ("FIRESTORE_ENDPOINT", "http://localhost:8200"),
        ]));

        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.shard_count, 12);
        assert_eq!(config.labels.project(3), "users-3");
        assert_eq!(config.labels.mirror(3), "mega-3");
        assert_eq!(
            config.backend,
            StoreBackend::Firestore {
                credentials_dir: PathBuf::from("/etc/shardgate"),
                endpoint: "http://localhost:8200".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("PORT", "http"),
            ("SHARD_COUNT", "-1"),
            ("SHARD_BACKEND", "cassandra"),
        ]));

        assert_eq!(config.network.port, 5000);
        assert_eq!(config.shard_count, 100);
        assert_eq!(config.backend, StoreBackend::default());
    }

    #[test]
    fn test_shard_count_is_bounded() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("SHARD_COUNT", "18446744073709551615")]));
        assert_eq!(config.shard_count, 100);

        let config = GatewayConfig::from_lookup(lookup_from(&[("SHARD_COUNT", "10001")]));
        assert_eq!(config.shard_count, 100);

        let config = GatewayConfig::from_lookup(lookup_from(&[("SHARD_COUNT", "10000")]));
        assert_eq!(config.shard_count, MAX_SHARD_COUNT);
    }

    #[test]
    fn test_offline_list() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("SHARD_OFFLINE", "3, 7,,x,9")]));
        assert_eq!(config.backend, StoreBackend::Memory { offline: vec![3, 7, 9] });
    }

    #[test]
    fn test_firestore_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("SHARD_BACKEND", "firestore")]));
        assert_eq!(
            config.backend,
            StoreBackend::Firestore {
                credentials_dir: PathBuf::from("credentials"),
                endpoint: DEFAULT_ENDPOINT.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_memory_connector_from_backend() {
        let backend = StoreBackend::Memory { offline: vec![1] };
        let connector = backend.connector(&ShardLabels::default()).unwrap();

        assert_eq!(connector.name(), "Memory");
        assert!(connector.connect(0).await.is_ok());
        assert!(connector.connect(1).await.is_err());
    }
}
