//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_ADMIN_API_KEY` - Bearer key for `/admin/api/*` (min 32 chars, high entropy)
//! - `PATHAO_CLIENT_ID` - Courier API client id
//! - `PATHAO_CLIENT_SECRET` - Courier API client secret
//! - `PATHAO_USERNAME` - Courier merchant login
//! - `PATHAO_PASSWORD` - Courier merchant password
//! - `PATHAO_STORE_ID` - Courier pickup store used for quotes and shipments
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `PATHAO_BASE_URL` - Courier API root (default: the sandbox)
//! - `PATHAO_TIMEOUT_SECS` - Per-request courier timeout (default: 20)
//! - `PATHAO_LOCATION_CACHE_SECS` - City/zone/area cache lifetime (default: 86400)
//! - `PATHAO_DEFAULT_ITEM_WEIGHT` - Parcel weight in kg (default: 0.5)
//! - `CHECKOUT_AUTO_DISPATCH` - Hand orders to the courier right after checkout (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crumb_core::StoreId;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_ADMIN_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Courier sandbox, used when `PATHAO_BASE_URL` is unset.
pub const DEFAULT_PATHAO_BASE_URL: &str = "https://courier-api-sandbox.pathao.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer key guarding the back-office API
    pub admin_api_key: SecretString,
    /// Courier API configuration
    pub pathao: PathaoConfig,
    /// Dispatch new orders to the courier as part of checkout
    pub auto_dispatch: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Courier API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PathaoConfig {
    /// API root, without the `/aladdin/api/v1` prefix
    pub base_url: Url,
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    /// Pickup store for quotes and shipments
    pub store_id: StoreId,
    /// Upper bound on every courier request
    pub timeout: Duration,
    /// How long city/zone/area lists are cached
    pub location_cache_ttl: Duration,
    /// Parcel weight in kg used when quoting and dispatching
    pub default_item_weight: Decimal,
}

impl std::fmt::Debug for PathaoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathaoConfig")
            .field("base_url", &self.base_url.as_str())
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("store_id", &self.store_id)
            .field("timeout", &self.timeout)
            .field("location_cache_ttl", &self.location_cache_ttl)
            .field("default_item_weight", &self.default_item_weight)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL")?;
        let host = get_parsed_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = get_parsed_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let admin_api_key = get_validated_secret("STOREFRONT_ADMIN_API_KEY")?;
        validate_admin_key(&admin_api_key, "STOREFRONT_ADMIN_API_KEY")?;

        let pathao = PathaoConfig::from_env()?;
        let auto_dispatch = get_bool_or_default("CHECKOUT_AUTO_DISPATCH", false)?;

        Ok(Self {
            database_url,
            host,
            port,
            admin_api_key,
            pathao,
            auto_dispatch,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl PathaoConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let base_url = get_parsed_or_default::<Url>("PATHAO_BASE_URL", DEFAULT_PATHAO_BASE_URL)?;
        let timeout_secs = get_parsed_or_default::<u64>("PATHAO_TIMEOUT_SECS", "20")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "PATHAO_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let cache_secs = get_parsed_or_default::<u64>("PATHAO_LOCATION_CACHE_SECS", "86400")?;
        let default_item_weight =
            get_parsed_or_default::<Decimal>("PATHAO_DEFAULT_ITEM_WEIGHT", "0.5")?;
        let store_id = get_required_env("PATHAO_STORE_ID")?
            .parse::<StoreId>()
            .map_err(|e| ConfigError::InvalidEnvVar("PATHAO_STORE_ID".to_string(), e.to_string()))?;

        Ok(Self {
            base_url,
            client_id: get_required_env("PATHAO_CLIENT_ID")?,
            client_secret: get_validated_secret("PATHAO_CLIENT_SECRET")?,
            username: get_required_env("PATHAO_USERNAME")?,
            // Merchant passwords are chosen by people, so only presence is checked
            password: get_required_secret("PATHAO_PASSWORD")?,
            store_id,
            timeout: Duration::from_secs(timeout_secs),
            location_cache_ttl: Duration::from_secs(cache_secs),
            default_item_weight,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL with fallback to generic `DATABASE_URL` (used by Fly.io postgres attach).
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn get_parsed_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag (`true`/`false`/`1`/`0`/`yes`/`no`).
fn get_bool_or_default(key: &str, default: bool) -> Result<bool, ConfigError> {
    let Some(value) = get_optional_env(key) else {
        return Ok(default);
    };
    parse_flag(&value).ok_or_else(|| {
        ConfigError::InvalidEnvVar(key.to_string(), format!("expected a boolean, got '{value}'"))
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Validate that the admin key meets minimum length requirements.
fn validate_admin_key(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_ADMIN_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_ADMIN_KEY_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
