//! Bearer-key guard for the admin API.
//!
//! Every `/admin/api/*` handler takes [`RequireAdmin`] as an argument. The
//! request must carry `Authorization: Bearer <STOREFRONT_ADMIN_API_KEY>`.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use secrecy::ExposeSecret;

use crate::state::AppState;

/// Extractor that requires the admin bearer key.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(_admin: RequireAdmin) -> impl IntoResponse {
///     "secret stuff"
/// }
/// ```
pub struct RequireAdmin;

/// Rejection when the admin key is missing or wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRejection {
    /// No `Authorization: Bearer` header.
    MissingKey,
    /// A key was sent but it does not match.
    InvalidKey,
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        let message = match self {
            Self::MissingKey => "Missing admin API key",
            Self::InvalidKey => "Invalid admin API key",
        };
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": message })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = bearer_token(parts).ok_or(AdminRejection::MissingKey)?;
        let expected = state.config().admin_api_key.expose_secret();

        if constant_time_eq(presented.as_bytes(), expected.as_bytes()) {
            Ok(Self)
        } else {
            tracing::warn!(path = %parts.uri.path(), "Rejected admin request with wrong key");
            Err(AdminRejection::InvalidKey)
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Compare without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/admin/api/orders");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap_or_default().into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc"))), Some("abc"));
        assert_eq!(bearer_token(&parts(Some("Basic abc"))), None);
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"same-key", b"same-key"));
        assert!(!constant_time_eq(b"same-key", b"same-kez"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
