//! Shardgate - Main entry point

use shardgate_core::GatewayConfig;
use shardgate_server::Server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration from environment
    let config = GatewayConfig::from_env();

    // Connect shards and serve
    let server = Server::bootstrap(config).await?;
    server.run().await
}
