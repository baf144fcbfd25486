//! Database operations for the storefront `PostgreSQL`.
//!
//! ## Tables
//!
//! - `category` - Product categories (unique slug)
//! - `product` - Catalog products, dietary tags as `TEXT[]`
//! - `customer_order` - Orders placed at checkout, with the courier consignment
//! - `order_item` - Order lines with the unit price frozen at order time
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p crumb-cli -- migrate
//! ```

pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use categories::CategoryRepository;
pub use customers::{CustomerRepository, CustomerSummary};
pub use orders::{NewOrder, OrderRepository, OrderStore};
pub use products::{ProductInput, ProductRepository, ProductSource};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique slug).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map unique and foreign-key violations to `Conflict`, everything else to `Database`.
pub(crate) fn map_constraint(err: sqlx::Error, unique: &str, foreign_key: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return RepositoryError::Conflict(unique.to_owned());
        }
        if db_err.is_foreign_key_violation() {
            return RepositoryError::Conflict(foreign_key.to_owned());
        }
    }
    RepositoryError::Database(err)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
