use std::net::TcpListener;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use yatube::{make_router, run_app, AppState, Config};

#[tokio::main]
async fn main() -> yatube::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,yatube=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env()?;
    let address = config.address()?;
    let state = AppState::new(config).await?;
    let listener =
        TcpListener::bind(address).with_context(|| format!("Failed to bind {address}"))?;

    run_app(make_router(state), listener).await
}
