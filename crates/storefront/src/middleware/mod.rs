//! HTTP middleware stack for the storefront API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! Admin routes are guarded per handler by the [`RequireAdmin`] extractor.

pub mod admin_auth;
pub mod request_id;

pub use admin_auth::{AdminRejection, RequireAdmin};
pub use request_id::request_id_middleware;
