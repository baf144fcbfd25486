//! Back-office JSON API under `/admin/api`.
//!
//! Every handler takes [`RequireAdmin`](crate::middleware::RequireAdmin), so
//! a request without the bearer key never reaches the database.

pub mod catalog;
pub mod courier;
pub mod customers;
pub mod orders;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Deserialize;

use crate::state::AppState;

/// Default page size for admin listings.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page size for admin listings.
pub const MAX_LIMIT: i64 = 200;

/// `?limit=&offset=` for admin listings.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamp into a valid `(limit, offset)` pair.
    #[must_use]
    pub fn clamped(self) -> (i64, i64) {
        (
            self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            self.offset.unwrap_or(0).max(0),
        )
    }
}

/// Create the admin API router (mounted at `/admin/api`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", post(catalog::create_product))
        .route(
            "/products/{id}",
            put(catalog::update_product).delete(catalog::delete_product),
        )
        .route(
            "/categories",
            get(catalog::list_categories).post(catalog::create_category),
        )
        .route(
            "/categories/{id}",
            put(catalog::update_category).delete(catalog::delete_category),
        )
        .route("/orders", get(orders::list))
        .route("/orders/{id}", get(orders::show))
        .route("/orders/{id}/status", post(orders::update_status))
        .route("/orders/{id}/dispatch", post(orders::dispatch))
        .route("/orders/{id}/tracking", get(orders::tracking))
        .route("/customers", get(customers::list))
        .route("/courier/stores", get(courier::stores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_clamps() {
        assert_eq!(Pagination::default().clamped(), (DEFAULT_LIMIT, 0));
        assert_eq!(
            Pagination {
                limit: Some(10_000),
                offset: Some(-5)
            }
            .clamped(),
            (MAX_LIMIT, 0)
        );
        assert_eq!(
            Pagination {
                limit: Some(0),
                offset: Some(20)
            }
            .clamped(),
            (1, 20)
        );
    }
}
