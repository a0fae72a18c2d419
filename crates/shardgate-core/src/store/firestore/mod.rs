//! Firestore REST backend
//!
//! One Firestore project per shard (`ai-card-0`, `ai-card-1`, ...). Each
//! project's credentials live in `{credentials_dir}/{project}.json`:
//!
//! ```json
//! { "project_id": "ai-card-3", "access_token": "ya29..." }
//! ```
//!
//! A missing or unreadable file leaves that shard out of the directory.
//! `access_token` may be omitted when talking to the local emulator.

mod value;

pub use value::{decode, decode_fields, encode, encode_fields};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use shardgate_router::{ShardIndex, ShardLabels, UserId};

use crate::error::StoreError;
use super::{Document, DocumentStore, Payload, ShardConnector, NAME_FIELD, USERS_COLLECTION};

/// Public Firestore endpoint
pub const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Per-project credentials file
#[derive(Debug, Clone, Deserialize)]
pub struct FirestoreCredentials {
    pub project_id: String,

    #[serde(default)]
    pub access_token: Option<String>,
}

impl FirestoreCredentials {
    /// Load credentials for `project` from a JSON file
    pub async fn load(path: &Path, project: &str) -> Result<Self, StoreError> {
        let invalid = |reason: String| StoreError::Credentials {
            project: project.to_string(),
            reason,
        };

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| invalid(format!("{}: {}", path.display(), e)))?;
        let credentials: Self = serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

        if credentials.project_id != project {
            return Err(invalid(format!(
                "file is for project {}",
                credentials.project_id
            )));
        }
        Ok(credentials)
    }
}

/// `users` collection of one Firestore project
pub struct FirestoreStore {
    client: Client,
    project_id: String,
    /// `projects/{id}/databases/(default)/documents`
    documents_path: String,
    documents_url: String,
    access_token: Option<String>,
}

impl FirestoreStore {
    pub fn new(client: Client, endpoint: &str, credentials: FirestoreCredentials) -> Self {
        let documents_path = format!(
            "projects/{}/databases/(default)/documents",
            credentials.project_id
        );
        let documents_url = format!("{}/v1/{}", endpoint.trim_end_matches('/'), documents_path);
        Self {
            client,
            project_id: credentials.project_id,
            documents_path,
            documents_url,
            access_token: credentials.access_token,
        }
    }

    /// Resource name of a user document, as it appears in API messages
    fn document_name(&self, user_id: UserId) -> String {
        format!("{}/{}/{}", self.documents_path, USERS_COLLECTION, user_id)
    }

    fn document_url(&self, user_id: UserId) -> String {
        format!("{}/{}/{}", self.documents_url, USERS_COLLECTION, user_id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn set(&self, user_id: UserId, payload: &Payload) -> Result<(), StoreError> {
        // PATCH without an update mask replaces the whole document
        let body = json!({ "fields": encode_fields(payload) });
        let response = self
            .request(Method::PATCH, &self.document_url(user_id))
            .json(&body)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn get(&self, user_id: UserId) -> Result<Option<Payload>, StoreError> {
        let response = self
            .request(Method::GET, &self.document_url(user_id))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            // A missing project or database is also a 404; only a 404 that
            // names this document means the record is absent
            let message = error_message(response.text().await.unwrap_or_default());
            if message.contains(&self.document_name(user_id)) {
                return Ok(None);
            }
            return Err(StoreError::Api {
                status: StatusCode::NOT_FOUND.as_u16(),
                message,
            });
        }

        let document: RawDocument = check_status(response).await?.json().await?;
        decode_fields(&document.fields).map(Some)
    }

    async fn search_by_name(&self, query: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}:runQuery", self.documents_url);
        let response = self
            .request(Method::POST, &url)
            .json(&run_query_body(query, limit))
            .send()
            .await?;

        let items: Vec<RunQueryItem> = check_status(response).await?.json().await?;
        documents_from_run_query(items)
    }

    fn label(&self) -> &str {
        &self.project_id
    }
}

/// Connects shards to their Firestore projects
pub struct FirestoreConnector {
    client: Client,
    endpoint: String,
    credentials_dir: PathBuf,
    labels: ShardLabels,
}

impl FirestoreConnector {
    pub fn new(
        endpoint: impl Into<String>,
        credentials_dir: impl Into<PathBuf>,
        labels: ShardLabels,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            credentials_dir: credentials_dir.into(),
            labels,
        })
    }

    /// Where the credentials for a shard are expected
    pub fn credentials_path(&self, shard_index: ShardIndex) -> PathBuf {
        self.credentials_dir
            .join(format!("{}.json", self.labels.project(shard_index)))
    }
}

#[async_trait]
impl ShardConnector for FirestoreConnector {
    async fn connect(&self, shard_index: ShardIndex) -> Result<Arc<dyn DocumentStore>, StoreError> {
        let project = self.labels.project(shard_index);
        let credentials =
            FirestoreCredentials::load(&self.credentials_path(shard_index), &project).await?;

        debug!(shard_index, project = %project, "Loaded Firestore credentials");
        Ok(Arc::new(FirestoreStore::new(
            self.client.clone(),
            &self.endpoint,
            credentials,
        )))
    }

    fn name(&self) -> &'static str {
        "Firestore"
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,

    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Structured query for `name >= query` with a result cap
fn run_query_body(query: &str, limit: usize) -> Value {
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": USERS_COLLECTION }],
            "where": {
                "fieldFilter": {
                    "field": { "fieldPath": NAME_FIELD },
                    "op": "GREATER_THAN_OR_EQUAL",
                    "value": { "stringValue": query },
                }
            },
            "limit": limit,
        }
    })
}

fn documents_from_run_query(items: Vec<RunQueryItem>) -> Result<Vec<Document>, StoreError> {
    items
        .into_iter()
        .filter_map(|item| item.document)
        .map(|document| {
            Ok(Document {
                key: document_key(&document.name).to_string(),
                data: decode_fields(&document.fields)?,
            })
        })
        .collect()
}

/// Last path segment of a document resource name
fn document_key(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// `error.message` from a Firestore error body, or the raw body
fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.error.message)
        .unwrap_or(body)
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = error_message(response.text().await.unwrap_or_default());
    debug!(status = status.as_u16(), message = %message, "Firestore rejected request");
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}
