//! Client-side half of the Crumb & Co storefront.
//!
//! - [`api::StorefrontApi`] - typed HTTP client for the storefront JSON API
//! - [`cart_store::CartStore`] - the cart, persisted to device storage after
//!   every mutation
//! - [`browser::CatalogBrowser`] - infinite-scroll catalog with server-side
//!   filters and client-side sorting
//! - [`checkout::CheckoutFlow`] - quote and submit, discarding results that
//!   arrive after the shopper left checkout
//!
//! The cart never leaves the device until checkout submits it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod browser;
pub mod cart_store;
pub mod checkout;
pub mod error;

pub use api::{
    AreaEntry, CityEntry, DispatchStatus, Place, PlacedOrder, QuoteInput, StorefrontApi, ZoneEntry,
};
pub use browser::{CatalogBrowser, ListingState};
pub use cart_store::{CartStorage, CartStore, FileStorage, MemoryStorage};
pub use checkout::{CheckoutDetails, CheckoutFlow, FlowState, Outcome, Ticket};
pub use error::ClientError;
