//! HTTP API
//!
//! JSON endpoints for registering, fetching and searching users, plus
//! shard introspection.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use shardgate_core::{GatewayError, Payload, SearchHit};
use shardgate_router::{ShardIndex, ShardInfo, UserId};

use crate::AppState;

/// HTTP API service
pub struct HttpApi {
    state: Arc<AppState>,
}

impl HttpApi {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router
    pub fn router(self) -> Router {
        Router::new()
            // Users
            .route("/api/register", post(register_user))
            .route("/api/user/:user_id", get(get_user))
            .route("/api/search", get(search_users))

            // Shards
            .route("/api/shard-info/:user_id", get(get_shard_info))
            .route("/api/shards", get(list_shards))

            // Browser front ends are served from other origins
            .layer(CorsLayer::permissive())
            .with_state(self.state)
    }
}

// ==================== Response types ====================

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Gateway errors as HTTP responses
///
/// Store diagnostics are logged, never sent to the caller.
struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            GatewayError::NotFound { .. } => (StatusCode::NOT_FOUND, "User not found"),
            GatewayError::StoreUnavailable { shard_index } => {
                error!(shard_index, "Request routed to unavailable shard");
                (StatusCode::INTERNAL_SERVER_ERROR, "Database not available")
            }
            GatewayError::Upstream { shard_index, source } => {
                error!(shard_index, error = %source, "Shard store rejected request");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage backend error")
            }
        };
        let body = ErrorBody { error: message.to_string() };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct RegisterResponse {
    success: bool,
    shard_index: ShardIndex,
    user_id: UserId,
}

#[derive(Serialize)]
struct UserResponse {
    success: bool,
    data: Payload,
    shard_index: ShardIndex,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<Value>,
}

#[derive(Serialize)]
struct ShardsResponse {
    shard_count: u64,
    available: Vec<ShardIndex>,
    unavailable: Vec<ShardIndex>,
}

// ==================== Request types ====================

#[derive(Deserialize)]
struct RegisterRequest {
    user_id: UserId,
    user_data: Payload,
}

#[derive(Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

// ==================== Handlers ====================

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let shard_index = state.records.put(req.user_id, &req.user_data).await?;

    info!(user_id = req.user_id, shard_index, "User registered via HTTP API");
    Ok(Json(RegisterResponse {
        success: true,
        shard_index,
        user_id: req.user_id,
    }))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    let record = state.records.get(user_id).await?;
    Ok(Json(UserResponse {
        success: true,
        data: record.data,
        shard_index: record.shard_index,
    }))
}

async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let report = state.search.search(&params.q).await;
    Json(SearchResponse {
        results: report.hits.into_iter().map(hit_to_json).collect(),
    })
}

async fn get_shard_info(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> impl IntoResponse {
    Json(ShardInfo::for_user(user_id, &state.labels))
}

async fn list_shards(
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    Json(ShardsResponse {
        shard_count: state.directory.shard_count(),
        available: state.directory.available_indices(),
        unavailable: state.directory.unavailable_indices(),
    })
}

/// Payload fields plus `user_id` and `shard_index`, which win on collision
///
/// `user_id` is a number when the document key is one, else the key itself.
fn hit_to_json(hit: SearchHit) -> Value {
    let user_id = hit
        .user_id()
        .map(Value::from)
        .unwrap_or_else(|| Value::String(hit.key.clone()));
    let mut fields = hit.data;
    fields.insert("user_id".to_string(), user_id);
    fields.insert("shard_index".to_string(), Value::from(hit.shard_index));
    Value::Object(fields)
}
