//! Courier authentication.
//!
//! Exchanges the merchant credentials for a bearer token via the password grant.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::CourierError;
use crate::config::PathaoConfig;

/// Tokens are refreshed this many seconds before the courier says they expire.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 86_400;

/// Bearer token issued by the courier.
#[derive(Debug, Clone)]
pub struct CourierToken {
    /// Bearer token for API requests.
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

impl CourierToken {
    /// Build a token that expires `expires_in` seconds from now.
    #[must_use]
    pub fn issued_now(access_token: SecretString, expires_in: i64) -> Self {
        Self {
            access_token,
            expires_at: chrono::Utc::now().timestamp() + expires_in,
        }
    }

    /// Check if the token should no longer be used.
    ///
    /// A token inside the five minute margin counts as expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_within(EXPIRY_MARGIN_SECS)
    }

    /// Check if the token will expire within the given number of seconds.
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - seconds
    }
}

#[derive(Serialize)]
struct IssueTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
    grant_type: &'static str,
}

#[derive(Deserialize)]
struct IssueTokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Issue a fresh token.
///
/// # Errors
///
/// Returns `CourierError::Auth` if the credentials are rejected or the
/// response has no `access_token`, `CourierError::Timeout` if the call
/// exceeds the client timeout.
#[instrument(skip(client, config), fields(username = %config.username))]
pub async fn authenticate(
    client: &reqwest::Client,
    endpoint: &str,
    config: &PathaoConfig,
) -> Result<CourierToken, CourierError> {
    let response = client
        .post(endpoint)
        .json(&IssueTokenRequest {
            client_id: &config.client_id,
            client_secret: config.client_secret.expose_secret(),
            username: &config.username,
            password: config.password.expose_secret(),
            grant_type: "password",
        })
        .send()
        .await?;

    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        return Err(CourierError::Auth(format!("HTTP {status}: {error_text}")));
    }

    let body: IssueTokenResponse = response
        .json()
        .await
        .map_err(|e| CourierError::Auth(format!("unreadable token response: {e}")))?;

    let access_token = body
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CourierError::Auth("token response has no access_token".to_string()))?;

    tracing::info!("Courier token issued");

    Ok(CourierToken::issued_now(
        SecretString::from(access_token),
        body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_at: i64) -> CourierToken {
        CourierToken {
            access_token: SecretString::from("test"),
            expires_at,
        }
    }

    #[test]
    fn test_token_is_expired() {
        let now = chrono::Utc::now().timestamp();

        // Expired an hour ago
        assert!(token(now - 3600).is_expired());

        // Valid for an hour
        assert!(!token(now + 3600).is_expired());

        // Four minutes left falls inside the refresh margin
        assert!(token(now + 240).is_expired());
    }

    #[test]
    fn test_default_lifetime_is_a_day() {
        let issued = CourierToken::issued_now(SecretString::from("t"), DEFAULT_EXPIRES_IN_SECS);
        assert!(!issued.is_expired());
        assert!(issued.expires_within(DEFAULT_EXPIRES_IN_SECS));
    }
}
