//! LitLens API Server
//!
//! Run with: cargo run -p litlens-web

use litlens_config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting LitLens API server...");

    let (host, port) = (config.server.host.clone(), config.server.port);
    let state = litlens_web::AppState::from_config(config).await?;
    let app = litlens_web::build_router(state);

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
