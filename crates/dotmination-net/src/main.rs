//! Dotmination relay server.

use dotmination_net::{config, run_server, ServerState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = config::server_addr().parse()?;
    info!("Starting Dotmination relay...");

    let listener = TcpListener::bind(addr).await?;
    let state = Arc::new(ServerState::new());

    run_server(listener, state).await
}
