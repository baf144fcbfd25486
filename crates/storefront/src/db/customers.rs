//! Customers, derived from order history.
//!
//! There are no customer accounts; a customer is everyone who ordered with
//! the same phone number.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;

/// One customer aggregated over their orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct CustomerSummary {
    pub phone: String,
    /// Name from the most recent order.
    pub name: String,
    /// Most recent email given, if any.
    pub email: Option<String>,
    pub order_count: i64,
    /// Sum of order totals, excluding cancelled orders.
    pub lifetime_total: Decimal,
    pub last_order_at: DateTime<Utc>,
}

/// Repository for customer queries.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List customers, most recent order first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<CustomerSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CustomerSummary>(
            r"
            SELECT
                customer_phone AS phone,
                (ARRAY_AGG(customer_name ORDER BY created_at DESC))[1] AS name,
                (ARRAY_AGG(customer_email ORDER BY created_at DESC)
                    FILTER (WHERE customer_email IS NOT NULL))[1] AS email,
                COUNT(*) AS order_count,
                COALESCE(SUM(total) FILTER (WHERE status <> 'cancelled'), 0) AS lifetime_total,
                MAX(created_at) AS last_order_at
            FROM customer_order
            GROUP BY customer_phone
            ORDER BY last_order_at DESC, phone
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }
}
