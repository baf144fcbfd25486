//! Customers derived from order history.

use axum::{Json, extract::State};

use super::Pagination;
use crate::db::{CustomerRepository, CustomerSummary};
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::routes::extract::ApiQuery;
use crate::state::AppState;

/// `GET /admin/api/customers`
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<Pagination>,
) -> Result<Json<Vec<CustomerSummary>>> {
    let (limit, offset) = page.clamped();
    let customers = CustomerRepository::new(state.pool())
        .list(limit, offset)
        .await?;
    Ok(Json(customers))
}
