//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::courier::{Courier, CourierError, PathaoClient};
use crate::services::{CheckoutSettings, Fulfillment, LocationDirectory};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and the courier client.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    courier: Arc<dyn Courier>,
    locations: LocationDirectory,
}

impl AppState {
    /// Create a new application state backed by the Pathao client.
    ///
    /// # Errors
    ///
    /// Returns `CourierError` if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, CourierError> {
        let courier = PathaoClient::new(config.pathao.clone())?;
        Ok(Self::with_courier(config, pool, Arc::new(courier)))
    }

    /// Create application state around any courier implementation.
    #[must_use]
    pub fn with_courier(config: StorefrontConfig, pool: PgPool, courier: Arc<dyn Courier>) -> Self {
        let locations =
            LocationDirectory::new(Arc::clone(&courier), config.pathao.location_cache_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                courier,
                locations,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the courier client.
    #[must_use]
    pub fn courier(&self) -> &dyn Courier {
        self.inner.courier.as_ref()
    }

    /// Get the cached courier location directory.
    #[must_use]
    pub fn locations(&self) -> &LocationDirectory {
        &self.inner.locations
    }

    /// Checkout knobs derived from configuration.
    #[must_use]
    pub fn checkout_settings(&self) -> CheckoutSettings {
        let config = self.config();
        CheckoutSettings {
            store_id: config.pathao.store_id,
            item_weight: config.pathao.default_item_weight,
            auto_dispatch: config.auto_dispatch,
        }
    }

    /// Fulfillment service over the given order store.
    #[must_use]
    pub fn fulfillment<'a>(&'a self, orders: &'a dyn crate::db::OrderStore) -> Fulfillment<'a> {
        let settings = self.checkout_settings();
        Fulfillment::new(self.courier(), orders, settings.store_id, settings.item_weight)
    }
}
