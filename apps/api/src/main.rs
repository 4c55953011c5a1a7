mod auth;
mod config;
mod db;
mod errors;
mod jobs;
mod models;
mod response;
mod routes;
mod state;
mod store;
mod upload;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{Authenticator, PgAuthenticator, StaticAuthenticator};
use crate::config::{Config, StoreBackend};
use crate::db::create_pool;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{JobStore, MemoryStore, PgStore};
use crate::upload::UploadStorage;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Pool API v{}", env!("CARGO_PKG_VERSION"));

    let (store, auth) = build_backend(&config).await?;
    let uploads = Arc::new(UploadStorage::new(config.upload_mode.clone()));

    let state = AppState {
        store,
        auth,
        uploads,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Store and authenticator for the configured backend.
async fn build_backend(config: &Config) -> Result<(Arc<dyn JobStore>, Arc<dyn Authenticator>)> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            let pool = create_pool(url, config.database_max_connections).await?;
            let store: Arc<dyn JobStore> = Arc::new(PgStore::new(pool.clone()));
            let auth: Arc<dyn Authenticator> = Arc::new(PgAuthenticator::new(pool));
            Ok((store, auth))
        }
        StoreBackend::Memory => {
            let store = match &config.memory_seed {
                Some(path) => MemoryStore::load(path).await?,
                None => MemoryStore::new(),
            };
            info!(
                "Using in-memory store with {} dev tokens",
                config.dev_auth_tokens.len()
            );
            let store: Arc<dyn JobStore> = Arc::new(store);
            let auth: Arc<dyn Authenticator> =
                Arc::new(StaticAuthenticator::new(config.dev_auth_tokens.clone()));
            Ok((store, auth))
        }
    }
}
