mod auth;
mod config;
mod dispatcher;
mod error;
mod handlers;
mod models;
mod router;
mod state;

use std::time::Duration;

use anyhow::Context;
use config::GatewayConfig;
use router::create_router;
use state::AppState;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::load()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        wait_timeout_ms = config.wait_timeout_ms,
        "Starting exchange gateway"
    );

    let state = AppState::new(&config);
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(dispatcher.result_ttl().max(Duration::from_secs(1)));
        loop {
            interval.tick().await;
            dispatcher.sweep();
        }
    });
    let app = create_router(state);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;

    tracing::info!("Listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
