//! Shardgate Server - HTTP front end for sharded user records
//!
//! The server is responsible for:
//! - Building the shard directory at startup
//! - Routing user reads and writes to their shard
//! - Fanning searches out over every shard
//! - Shutting down cleanly on Ctrl-C

pub mod api;

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use shardgate_core::{GatewayConfig, RecordGateway, SearchGateway, ShardDirectory};
use shardgate_router::ShardLabels;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::api::HttpApi;

/// Shared, read-only state handed to every request
pub struct AppState {
    pub directory: Arc<ShardDirectory>,
    pub records: RecordGateway,
    pub search: SearchGateway,
    pub labels: ShardLabels,
}

impl AppState {
    pub fn new(directory: Arc<ShardDirectory>, labels: ShardLabels) -> Self {
        Self {
            records: RecordGateway::new(directory.clone()),
            search: SearchGateway::new(directory.clone()),
            directory,
            labels,
        }
    }
}

/// Gateway server
pub struct Server {
    config: GatewayConfig,
    state: Arc<AppState>,
}

impl Server {
    /// Connect every shard and assemble the server
    pub async fn bootstrap(config: GatewayConfig) -> anyhow::Result<Self> {
        info!(
            instance_id = %config.instance_id,
            shard_count = config.shard_count,
            "Bootstrapping gateway"
        );

        let connector = config.backend.connector(&config.labels)?;
        let directory = ShardDirectory::connect(config.shard_count, connector.as_ref()).await;

        Ok(Self::with_directory(config, Arc::new(directory)))
    }

    /// Assemble the server around an existing directory
    pub fn with_directory(config: GatewayConfig, directory: Arc<ShardDirectory>) -> Self {
        let state = Arc::new(AppState::new(directory, config.labels.clone()));
        Self { config, state }
    }

    /// HTTP routes
    pub fn router(&self) -> Router {
        HttpApi::new(self.state.clone()).router()
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        self.serve(listener, wait_for_shutdown(tokio::signal::ctrl_c()))
            .await
    }

    /// Serve on `listener` until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!(
            instance_id = %self.config.instance_id,
            addr = %addr,
            available = self.state.directory.available_indices().len(),
            "Gateway started"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!(instance_id = %self.config.instance_id, "Gateway stopped");
        Ok(())
    }

    pub fn instance_id(&self) -> &str {
        &self.config.instance_id
    }

    pub fn directory(&self) -> &Arc<ShardDirectory> {
        &self.state.directory
    }
}

/// Resolve once `signal` fires
///
/// If the signal handler cannot be installed the server keeps running
/// rather than stopping at once.
async fn wait_for_shutdown(signal: impl Future<Output = std::io::Result<()>>) {
    match signal.await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
