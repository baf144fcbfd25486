//! Courier account lookups.

use axum::{Json, extract::State};

use crate::courier::Store;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::state::AppState;

/// `GET /admin/api/courier/stores` - pickup stores on the merchant account.
pub async fn stores(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Store>>> {
    Ok(Json(state.courier().stores().await?))
}
