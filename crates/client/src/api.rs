//! Typed HTTP client for the storefront JSON API.

use std::time::Duration;

use crumb_core::{
    AreaId, Category, CheckoutRequest, CityId, DeliveryType, Order, OrderId, PaymentMethod,
    PriceQuote, Product, ProductFilter, ProductPage, ZoneId,
};
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::error::ClientError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// One entry of the courier's location hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Place<Id> {
    pub id: Id,
    pub name: String,
}

pub type CityEntry = Place<CityId>;
pub type ZoneEntry = Place<ZoneId>;
pub type AreaEntry = Place<AreaId>;

/// Body of `POST /api/delivery/quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuoteInput {
    pub city_id: CityId,
    pub zone_id: ZoneId,
    pub delivery_type: DeliveryType,
    pub subtotal: Decimal,
    pub payment_method: PaymentMethod,
}

/// What happened to courier dispatch when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchStatus {
    Skipped,
    Dispatched { consignment_id: String },
    Failed { error: String },
}

/// Reply to a successful checkout.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub dispatch: DispatchStatus,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Storefront API client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct StorefrontApi {
    client: reqwest::Client,
    base_url: Url,
}

impl StorefrontApi {
    /// Create a client for the storefront at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(ClientError::Http)?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Parse(format!("invalid path {path}: {e}")))
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.client.request(method, self.url(path)?).query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_client_error() || status.is_server_error() {
            return Err(api_error(status, &text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        self.send::<(), T>(Method::GET, path, query, None).await
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// One page of products matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self, filter))]
    pub async fn list_products(
        &self,
        filter: &ProductFilter,
        offset: usize,
        limit: usize,
    ) -> Result<ProductPage, ClientError> {
        let mut query = filter.to_query_pairs();
        query.push(("limit", limit.to_string()));
        query.push(("offset", offset.to_string()));
        self.get("api/products", &query).await
    }

    /// A single product by slug, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` for failures other than 404.
    pub async fn product(&self, slug: &str) -> Result<Option<Product>, ClientError> {
        match self.get(&format!("api/products/{slug}"), &[]).await {
            Ok(product) => Ok(Some(product)),
            Err(ClientError::Api { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        self.get("api/categories", &[]).await
    }

    // =========================================================================
    // Delivery
    // =========================================================================

    /// Cities the courier serves.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn cities(&self) -> Result<Vec<CityEntry>, ClientError> {
        self.get("api/delivery/cities", &[]).await
    }

    /// Zones of a city.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn zones(&self, city_id: CityId) -> Result<Vec<ZoneEntry>, ClientError> {
        self.get(&format!("api/delivery/cities/{city_id}/zones"), &[])
            .await
    }

    /// Areas of a zone.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn areas(&self, zone_id: ZoneId) -> Result<Vec<AreaEntry>, ClientError> {
        self.get(&format!("api/delivery/zones/{zone_id}/areas"), &[])
            .await
    }

    /// Delivery price for the cart about to be submitted.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    #[instrument(skip(self))]
    pub async fn quote(&self, input: &QuoteInput) -> Result<PriceQuote, ClientError> {
        self.send(Method::POST, "api/delivery/quote", &[], Some(input))
            .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Submit a checkout.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` with status 422 for validation failures.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn place_order(&self, request: &CheckoutRequest) -> Result<PlacedOrder, ClientError> {
        self.send(Method::POST, "api/orders", &[], Some(request))
            .await
    }

    /// Order receipt.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails.
    pub async fn order(&self, id: OrderId) -> Result<Order, ClientError> {
        self.get(&format!("api/orders/{id}"), &[]).await
    }
}

/// Build `ClientError::Api` from an error reply, preferring its `error` field.
fn api_error(status: StatusCode, body: &str) -> ClientError {
    let message = serde_json::from_str::<ErrorBody>(body).map_or_else(
        |_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        },
        |body| body.error,
    );
    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
