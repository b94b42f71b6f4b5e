mod auth;
mod config;
mod error;
mod export;
mod handlers;
mod pagination;
mod report;
mod spotify;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::handlers::{router, AppState};
use crate::spotify::SpotifyClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let spotify = SpotifyClient::new(&config);
    let addr = SocketAddr::new(config.host, config.port);
    let public_dir = config.public_dir.clone();

    let app = router(&public_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(config, Arc::new(spotify)));

    tracing::info!("listening on {}", addr);
    tracing::info!(public_dir = %public_dir.display(), "serving static files");

    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
