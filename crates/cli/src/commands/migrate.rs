//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! crumb migrate
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded at
//! compile time.

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Read the storefront database URL from the environment.
///
/// # Errors
///
/// Returns `MigrationError::MissingEnvVar` if neither variable is set.
pub fn database_url() -> Result<SecretString, MigrationError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MigrationError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Connect to the storefront database.
///
/// # Errors
///
/// Returns `MigrationError` if the URL is missing or the connection fails.
pub async fn connect() -> Result<PgPool, MigrationError> {
    let url = database_url()?;
    info!("Connecting to storefront database...");
    Ok(crumb_storefront::db::create_pool(&url).await?)
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if connecting or migrating fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = connect().await?;

    info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    info!("Storefront migrations complete");
    Ok(())
}
