//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness
//! GET  /health/ready                    - Readiness (database ping)
//!
//! # Catalog
//! GET  /api/products                    - Filtered page: { products, total }
//! GET  /api/products/{slug}             - Product detail
//! GET  /api/categories                  - Category list
//!
//! # Delivery
//! GET  /api/delivery/cities             - Courier cities (cached)
//! GET  /api/delivery/cities/{id}/zones  - Zones of a city (cached)
//! GET  /api/delivery/zones/{id}/areas   - Areas of a zone (cached)
//! POST /api/delivery/quote              - Courier price quote
//!
//! # Orders
//! POST /api/orders                      - Checkout
//! GET  /api/orders/{id}                 - Receipt
//!
//! # Admin (bearer key)
//! /admin/api/...                        - See `admin`
//! ```

pub mod admin;
pub mod catalog;
pub mod delivery;
pub mod extract;
pub mod orders;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// Create the public API router (mounted at `/api`).
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/{slug}", get(catalog::show_product))
        .route("/categories", get(catalog::list_categories))
        .route("/delivery/cities", get(delivery::cities))
        .route("/delivery/cities/{id}/zones", get(delivery::zones))
        .route("/delivery/zones/{id}/areas", get(delivery::areas))
        .route("/delivery/quote", post(delivery::quote))
        .route("/orders", post(orders::create))
        .route("/orders/{id}", get(orders::show))
}

/// Build the full application router with its middleware stack.
///
/// Sentry layers are added by the binary so tests can build the router
/// without a Sentry hub.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api", api_routes())
        .nest("/admin/api", admin::routes())
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
