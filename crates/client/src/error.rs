//! Client error type.

use thiserror::Error;

/// Errors surfaced to the client UI.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (DNS, TLS, connection reset).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The storefront answered with an error status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// Reading or writing device storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A body or stored value could not be decoded.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Storage(_) | Self::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ClientError::Timeout.is_retryable());
        assert!(
            ClientError::Api {
                status: 502,
                message: "Courier service error".into()
            }
            .is_retryable()
        );
        assert!(
            !ClientError::Api {
                status: 422,
                message: "cart is empty".into()
            }
            .is_retryable()
        );
        assert!(!ClientError::Parse("bad".into()).is_retryable());
    }
}
