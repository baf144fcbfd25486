//! Crumb & Co storefront library.
//!
//! Catalog queries, checkout, courier dispatch and the back-office API,
//! served as JSON over axum. The binary in `main.rs` only wires
//! configuration, tracing and Sentry around [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod courier;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
