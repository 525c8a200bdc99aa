//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! vernont-cli migrate sessions
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for the session store
//!
//! The storefront owns no other tables; catalog, carts and customers live in
//! the commerce backend.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tower_sessions_sqlx_store::PostgresStore;

const DATABASE_URL_VAR: &str = "STOREFRONT_DATABASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn database_url() -> Result<SecretString, MigrationError> {
    let _ = dotenvy::dotenv();
    std::env::var(DATABASE_URL_VAR)
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar(DATABASE_URL_VAR))
}

/// Create the session table and its schema if they do not exist.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing or the database rejects
/// the migration.
pub async fn sessions() -> Result<(), MigrationError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool).migrate().await?;

    tracing::info!("Session store ready");
    Ok(())
}
