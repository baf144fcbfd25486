//! Public order endpoints: checkout submission and receipts.

use axum::{Json, extract::State, http::StatusCode};
use crumb_core::{CheckoutRequest, Order, OrderId};

use super::extract::{ApiJson, ApiPath};
use crate::db::{OrderRepository, OrderStore, ProductRepository};
use crate::error::{AppError, Result};
use crate::services::{CheckoutOutcome, CheckoutService};
use crate::state::AppState;

/// `POST /api/orders` - run checkout and return the stored order.
pub async fn create(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    let products = ProductRepository::new(state.pool());
    let orders = OrderRepository::new(state.pool());

    let outcome = CheckoutService::new(
        &products,
        &orders,
        state.courier(),
        state.locations(),
        state.checkout_settings(),
    )
    .place_order(&request)
    .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// `GET /api/orders/{id}` - order receipt.
pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}
