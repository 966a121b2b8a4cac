use std::sync::Arc;

use anyhow::Context;

use atrium_api::config;
use atrium_api::database;
use atrium_api::server::{app, AppState};
use atrium_api::store::{MemoryStore, PgStore, RecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting Atrium API in {:?} mode", config.environment);

    let store: Arc<dyn RecordStore> = if std::env::var("DATABASE_URL").is_ok() {
        let pool = database::connect().await.context("failed to connect to database")?;
        Arc::new(PgStore::new(pool))
    } else {
        tracing::warn!("DATABASE_URL not set, serving from the in-memory store");
        Arc::new(MemoryStore::new())
    };

    let app = app(AppState { store });

    // Allow tests or deployments to override port via env
    let port = std::env::var("ATRIUM_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Atrium API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
