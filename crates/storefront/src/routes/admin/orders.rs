//! Order management: listing, status changes, courier dispatch and tracking.

use axum::{Json, extract::State};
use crumb_core::{Order, OrderId, OrderStatus};
use serde::Deserialize;

use super::Pagination;
use crate::db::{OrderRepository, OrderStore};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::extract::{ApiJson, ApiPath, ApiQuery};
use crate::services::TrackingReport;
use crate::state::AppState;

/// `?status=&limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Body of `POST /admin/api/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// `GET /admin/api/orders`
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let (limit, offset) = Pagination {
        limit: query.limit,
        offset: query.offset,
    }
    .clamped();
    let orders = OrderRepository::new(state.pool())
        .list(query.status, limit, offset)
        .await?;
    Ok(Json(orders))
}

/// `GET /admin/api/orders/{id}`
pub async fn show(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}

/// `POST /admin/api/orders/{id}/status` - 409 on a disallowed transition.
pub async fn update_status(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = OrderRepository::new(state.pool())
        .update_status(id, update.status)
        .await?;
    Ok(Json(order))
}

/// `POST /admin/api/orders/{id}/dispatch` - create the courier consignment.
///
/// Safe to retry: an order that already has one is returned unchanged.
pub async fn dispatch(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>> {
    let orders = OrderRepository::new(state.pool());
    let order = state.fulfillment(&orders).dispatch_by_id(id).await?;
    Ok(Json(order))
}

/// `GET /admin/api/orders/{id}/tracking` - raw courier status payload.
pub async fn tracking(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<TrackingReport>> {
    let orders = OrderRepository::new(state.pool());
    let report = state.fulfillment(&orders).track(id).await?;
    Ok(Json(report))
}
