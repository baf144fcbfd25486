//! Pathao courier API client.
//!
//! Wraps the courier's REST API behind one long-lived client that owns its
//! bearer token. Callers see domain operations (location lookups, price
//! quotes, shipment creation, tracking) and never handle credentials.
//!
//! # Architecture
//!
//! - Password grant: client id/secret + merchant login → bearer token
//! - Token cached in memory, reused until five minutes before expiry
//! - One request primitive attaches the token and classifies failures
//! - No retries: courier calls are user-initiated and fail fast
//!
//! The [`Courier`] trait is the seam the checkout and fulfillment services
//! depend on, so they can be exercised without the network.

pub mod auth;
pub mod client;
pub mod types;

pub use client::PathaoClient;
pub use types::*;

use async_trait::async_trait;
use crumb_core::{CityId, PriceQuote, ZoneId};
use thiserror::Error;

/// Errors that can occur when interacting with the courier API.
#[derive(Debug, Error)]
pub enum CourierError {
    /// Credentials rejected, or the token response carried no token.
    #[error("Courier authentication failed: {0}")]
    Auth(String),

    /// The courier answered with HTTP status >= 400.
    #[error("Courier API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The price-plan endpoint answered with HTTP status >= 400.
    #[error("Courier pricing failed (HTTP {status}): {body}")]
    Pricing { status: u16, body: String },

    /// The request did not complete within the configured timeout.
    #[error("Courier request timed out")]
    Timeout,

    /// Transport failure (DNS, TLS, connection reset).
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// The courier answered 2xx with a body we could not read.
    #[error("Unexpected courier response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CourierError {
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

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Courier operations used by checkout and fulfillment.
#[async_trait]
pub trait Courier: Send + Sync {
    /// All cities the courier serves.
    async fn cities(&self) -> Result<Vec<City>, CourierError>;

    /// Zones inside a city.
    async fn zones(&self, city_id: CityId) -> Result<Vec<Zone>, CourierError>;

    /// Areas inside a zone.
    async fn areas(&self, zone_id: ZoneId) -> Result<Vec<Area>, CourierError>;

    /// Merchant pickup stores.
    async fn stores(&self) -> Result<Vec<Store>, CourierError>;

    /// Price a delivery.
    async fn price_plan(&self, request: &PriceRequest) -> Result<PriceQuote, CourierError>;

    /// Register a shipment with the courier.
    async fn create_order(&self, request: &ShipmentRequest)
    -> Result<CreatedShipment, CourierError>;

    /// Current courier-side state of a consignment, unmodified.
    async fn track_order(&self, consignment_id: &str) -> Result<serde_json::Value, CourierError>;
}
