//! Crumb & Co Core - shared domain types and storefront logic.
//!
//! This crate is used by every Crumb & Co component:
//! - `storefront` - Catalog, checkout and admin JSON API server
//! - `client` - Client-side cart, catalog browser and checkout flow
//! - `cli` - Migrations, seeding and a terminal shopper
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Everything here is deterministic and can be
//! exercised without a network or a database.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, contact values, price bands and status enums
//! - [`catalog`] - Products, categories, filter criteria, sorting, paging
//! - [`cart`] - The cart reducer with its derived subtotal
//! - [`order`] - Orders, order lines and checkout payloads
//! - [`delivery`] - Courier location selection and price quotes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod order;
pub mod types;

pub use cart::{AddOptions, Cart, CartItem, CartKey};
pub use catalog::{
    CatalogFeed, Category, FilterError, MAX_PAGE_SIZE, PAGE_SIZE, Product, ProductFilter,
    ProductPage, SortOrder,
};
pub use delivery::{DeliverySelection, DeliveryType, ItemType, PriceQuote};
pub use order::{
    CheckoutLine, CheckoutRequest, CourierShipment, CustomerContact, Order, OrderItem,
};
pub use types::*;
