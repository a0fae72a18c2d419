//! Shard introspection
//!
//! Everything here is computed from the router alone; no store is touched.

use serde::{Deserialize, Serialize};

use crate::strategy::route;
use crate::types::{ShardIndex, UserId, DEFAULT_MIRROR_PREFIX, DEFAULT_PROJECT_PREFIX};

/// Naming scheme for the external resources backing each shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardLabels {
    /// Prefix of the document-store project (`{prefix}-{index}`)
    pub project_prefix: String,

    /// Prefix of the mirror account (`{prefix}-{index}`)
    pub mirror_prefix: String,
}

impl ShardLabels {
    pub fn new(project_prefix: impl Into<String>, mirror_prefix: impl Into<String>) -> Self {
        Self {
            project_prefix: project_prefix.into(),
            mirror_prefix: mirror_prefix.into(),
        }
    }

    /// Document-store project that holds a shard
    pub fn project(&self, shard_index: ShardIndex) -> String {
        format!("{}-{}", self.project_prefix, shard_index)
    }

    /// Mirror account paired with a shard
    pub fn mirror(&self, shard_index: ShardIndex) -> String {
        format!("{}-{}", self.mirror_prefix, shard_index)
    }
}

impl Default for ShardLabels {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_PREFIX, DEFAULT_MIRROR_PREFIX)
    }
}

/// Where a user lives, as reported by the shard-info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub user_id: UserId,

    pub shard_index: ShardIndex,

    /// Document-store project name
    #[serde(rename = "firebase_project")]
    pub partition_label: String,

    /// Mirror account name
    #[serde(rename = "mega_account")]
    pub mirror_label: String,
}

impl ShardInfo {
    /// Compute the placement of a user
    pub fn for_user(user_id: UserId, labels: &ShardLabels) -> Self {
        let shard_index = route(user_id);
        Self {
            user_id,
            shard_index,
            partition_label: labels.project(shard_index),
            mirror_label: labels.mirror(shard_index),
        }
    }
}
