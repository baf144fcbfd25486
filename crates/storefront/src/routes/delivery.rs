//! Courier reference data and delivery quotes for the checkout page.
//!
//! Location lists come from the cached [`LocationDirectory`](crate::services::LocationDirectory);
//! quotes always hit the courier.

use axum::{Json, extract::State};
use crumb_core::{CityId, PriceQuote, ZoneId};

use super::extract::{ApiJson, ApiPath};
use crate::courier::{Area, City, Zone};
use crate::error::Result;
use crate::services::{QuoteRequest, quote_delivery};
use crate::state::AppState;

/// `GET /api/delivery/cities`
pub async fn cities(State(state): State<AppState>) -> Result<Json<Vec<City>>> {
    let cities = state.locations().cities().await?;
    Ok(Json(cities.as_ref().clone()))
}

/// `GET /api/delivery/cities/{id}/zones`
pub async fn zones(
    State(state): State<AppState>,
    ApiPath(city_id): ApiPath<CityId>,
) -> Result<Json<Vec<Zone>>> {
    let zones = state.locations().zones(city_id).await?;
    Ok(Json(zones.as_ref().clone()))
}

/// `GET /api/delivery/zones/{id}/areas`
pub async fn areas(
    State(state): State<AppState>,
    ApiPath(zone_id): ApiPath<ZoneId>,
) -> Result<Json<Vec<Area>>> {
    let areas = state.locations().areas(zone_id).await?;
    Ok(Json(areas.as_ref().clone()))
}

/// `POST /api/delivery/quote`
pub async fn quote(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<QuoteRequest>,
) -> Result<Json<PriceQuote>> {
    let quote = quote_delivery(state.courier(), &state.checkout_settings(), &request).await?;
    Ok(Json(quote))
}
