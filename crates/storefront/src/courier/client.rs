//! Pathao REST API client.

use std::sync::Arc;

use async_trait::async_trait;
use crumb_core::{CityId, PriceQuote, ZoneId};
use reqwest::Method;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;
use url::Url;

use super::auth::{CourierToken, authenticate};
use super::types::{
    Area, City, CreateOrderBody, CreatedShipment, Envelope, Listing, PricePlan, PricePlanBody,
    PriceRequest, ShipmentRequest, Store, Zone,
};
use super::{Courier, CourierError};
use crate::config::PathaoConfig;

/// Path prefix shared by every courier endpoint.
const API_PREFIX: &str = "aladdin/api/v1";

/// Pathao courier API client.
///
/// Cheap to clone; clones share the HTTP connection pool and token cache.
///
/// # Authentication
///
/// Uses the password grant. The token is fetched lazily on the first call,
/// cached in memory, and re-issued once it is within five minutes of expiry.
/// Concurrent callers that find the token stale wait on a single refresh.
#[derive(Clone)]
pub struct PathaoClient {
    inner: Arc<PathaoClientInner>,
}

struct PathaoClientInner {
    client: reqwest::Client,
    config: PathaoConfig,
    /// API root, e.g. `https://host/aladdin/api/v1`
    api_root: Url,
    /// In-memory token cache
    token: RwLock<Option<CourierToken>>,
    /// Held while a token is being issued
    refresh: Mutex<()>,
}

impl std::fmt::Debug for PathaoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathaoClient")
            .field("api_root", &self.inner.api_root.as_str())
            .field("store_id", &self.inner.config.store_id)
            .finish_non_exhaustive()
    }
}

impl PathaoClient {
    /// Create a client from configuration.
    ///
    /// No network traffic happens until the first call.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::Http` if the HTTP client cannot be built, or
    /// `CourierError::Parse` if the base URL cannot carry a path.
    pub fn new(config: PathaoConfig) -> Result<Self, CourierError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .build()
            .map_err(CourierError::Http)?;

        let mut api_root = config.base_url.clone();
        api_root
            .path_segments_mut()
            .map_err(|()| {
                CourierError::Parse(format!("invalid courier base URL {}", config.base_url))
            })?
            .pop_if_empty()
            .extend(API_PREFIX.split('/'));

        Ok(Self {
            inner: Arc::new(PathaoClientInner {
                client,
                config,
                api_root,
                token: RwLock::new(None),
                refresh: Mutex::new(()),
            }),
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Issue a new token now, replacing any cached one.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::Auth` if the credentials are rejected.
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<CourierToken, CourierError> {
        let _guard = self.inner.refresh.lock().await;
        let token = self.issue_token().await?;
        *self.inner.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Set the cached token directly.
    pub async fn set_token(&self, token: CourierToken) {
        *self.inner.token.write().await = Some(token);
    }

    /// Check if a usable token is cached.
    pub async fn has_valid_token(&self) -> bool {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    async fn issue_token(&self) -> Result<CourierToken, CourierError> {
        let endpoint = self.endpoint(&["issue-token"]);
        authenticate(&self.inner.client, endpoint.as_str(), &self.inner.config).await
    }

    /// Cached token if still usable.
    async fn cached_token(&self) -> Option<String> {
        self.inner
            .token
            .read()
            .await
            .as_ref()
            .filter(|token| !token.is_expired())
            .map(|token| token.access_token.expose_secret().to_string())
    }

    /// Return a usable bearer token, issuing a new one if needed.
    async fn access_token(&self) -> Result<String, CourierError> {
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _guard = self.inner.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let token = self.issue_token().await?;
        let bearer = token.access_token.expose_secret().to_string();
        *self.inner.token.write().await = Some(token);
        Ok(bearer)
    }

    // =========================================================================
    // Request primitive
    // =========================================================================

    /// Join path segments onto the API root, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.api_root.clone();
        // Checked in `new`: the root always has path segments
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    /// Send an authenticated request and return the raw body of a 2xx reply.
    ///
    /// Any status >= 400 becomes `CourierError::Api` carrying the raw body.
    #[instrument(skip(self, body), fields(method = %method))]
    async fn send<B>(
        &self,
        method: Method,
        path: &[&str],
        body: Option<&B>,
    ) -> Result<String, CourierError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let bearer = self.access_token().await?;

        let mut request = self
            .inner
            .client
            .request(method, self.endpoint(path))
            .bearer_auth(bearer)
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_client_error() || status.is_server_error() {
            tracing::warn!(status = status.as_u16(), path = %path.join("/"), "Courier request failed");
            return Err(CourierError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> Result<T, CourierError> {
        let text = self.send::<()>(Method::GET, path, None).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn post<B, T>(&self, path: &[&str], body: &B) -> Result<T, CourierError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let text = self.send(Method::POST, path, Some(body)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn list<T: DeserializeOwned>(&self, path: &[&str]) -> Result<Vec<T>, CourierError> {
        let envelope: Envelope<Listing<T>> = self.get(path).await?;
        Ok(envelope.data.data)
    }

    /// Fetch the raw price plan for a delivery.
    ///
    /// # Errors
    ///
    /// Returns `CourierError::Pricing` if the courier rejects the request.
    #[instrument(skip(self, request), fields(city = %request.recipient_city, zone = %request.recipient_zone))]
    pub async fn raw_price_plan(&self, request: &PriceRequest) -> Result<PricePlan, CourierError> {
        let body = PricePlanBody::from(request);
        let envelope: Envelope<PricePlan> =
            self.post(&["merchant", "price-plan"], &body)
                .await
                .map_err(|err| match err {
                    CourierError::Api { status, body } => CourierError::Pricing { status, body },
                    other => other,
                })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl Courier for PathaoClient {
    #[instrument(skip(self))]
    async fn cities(&self) -> Result<Vec<City>, CourierError> {
        self.list(&["city-list"]).await
    }

    #[instrument(skip(self))]
    async fn zones(&self, city_id: CityId) -> Result<Vec<Zone>, CourierError> {
        self.list(&["cities", &city_id.to_string(), "zone-list"]).await
    }

    #[instrument(skip(self))]
    async fn areas(&self, zone_id: ZoneId) -> Result<Vec<Area>, CourierError> {
        self.list(&["zones", &zone_id.to_string(), "area-list"]).await
    }

    #[instrument(skip(self))]
    async fn stores(&self) -> Result<Vec<Store>, CourierError> {
        self.list(&["stores"]).await
    }

    async fn price_plan(&self, request: &PriceRequest) -> Result<PriceQuote, CourierError> {
        let plan = self.raw_price_plan(request).await?;
        Ok(plan.quote(request.amount_to_collect))
    }

    #[instrument(skip(self, request), fields(merchant_order_id = %request.merchant_order_id))]
    async fn create_order(
        &self,
        request: &ShipmentRequest,
    ) -> Result<CreatedShipment, CourierError> {
        let body = CreateOrderBody::from(request);
        let envelope: Envelope<CreatedShipment> = self.post(&["orders"], &body).await?;

        tracing::info!(
            consignment_id = %envelope.data.consignment_id,
            "Courier shipment created"
        );

        Ok(envelope.data)
    }

    #[instrument(skip(self))]
    async fn track_order(&self, consignment_id: &str) -> Result<serde_json::Value, CourierError> {
        let envelope: Envelope<serde_json::Value> = self.get(&["orders", consignment_id]).await?;
        Ok(envelope.data)
    }
}
