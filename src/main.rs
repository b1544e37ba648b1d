use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use std::sync::Arc;

use fleetworthy_backend::core::config::{config_usize, AppPaths};
use fleetworthy_backend::core::logging;
use fleetworthy_backend::server;
use fleetworthy_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    let state = AppState::initialize(paths).await?;

    let config = state.config.load_config();
    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or_else(|| config_usize(&config, "server.port", 5000) as u16);
    let bind_addr = format!("0.0.0.0:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Fleetworthy sales agent listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
