use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Connect the shared pool. Sizing and the acquire bound come from config so
/// a saturated pool degrades into retryable errors instead of hanging.
pub async fn connect() -> Result<PgPool, DatabaseError> {
    let database = &config::config().database;
    let connection_string = build_connection_string()?;

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.acquire_timeout_secs))
        .connect(&connection_string)
        .await?;

    info!("Connected database pool ({} max connections)", database.max_connections);
    Ok(pool)
}

/// `DATABASE_URL`, with the path swapped to `ATRIUM_DB_NAME` when set.
fn build_connection_string() -> Result<String, DatabaseError> {
    let base = std::env::var("DATABASE_URL")
        .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

    match std::env::var("ATRIUM_DB_NAME") {
        Err(_) => Ok(base),
        Ok(name) => {
            let mut url = url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
            url.set_path(&format!("/{}", name));
            Ok(String::from(url))
        }
    }
}
