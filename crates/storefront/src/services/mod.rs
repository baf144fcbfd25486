//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `locations` - Cached courier city/zone/area directory
//! - `checkout` - Turns a submitted cart into a persisted, priced order
//! - `fulfillment` - Courier dispatch and tracking for persisted orders
//!
//! Services depend on the [`Courier`](crate::courier::Courier),
//! [`OrderStore`](crate::db::OrderStore) and
//! [`ProductSource`](crate::db::ProductSource) seams rather than concrete
//! clients, so handlers pass in the real implementations and tests pass fakes.

pub mod checkout;
pub mod fulfillment;
pub mod locations;

pub use checkout::{
    CheckoutOutcome, CheckoutService, CheckoutSettings, DispatchOutcome, QuoteRequest,
    quote_delivery,
};
pub use fulfillment::{Fulfillment, TrackingReport};
pub use locations::{LocationDirectory, ResolvedLocation};

use thiserror::Error;

use crate::courier::CourierError;
use crate::db::RepositoryError;

/// Errors raised by the checkout and fulfillment services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input: empty cart, unresolved location, bad contact details.
    #[error("{0}")]
    Validation(String),

    /// A referenced product or order does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The operation is not allowed in the order's current state.
    #[error("{0}")]
    Conflict(String),

    /// The courier call failed.
    #[error(transparent)]
    Courier(#[from] CourierError),

    /// The storage layer failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
