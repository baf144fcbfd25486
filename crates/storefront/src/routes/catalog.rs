//! Public catalog endpoints.

use axum::{Json, extract::State};
use crumb_core::{Category, PAGE_SIZE, Product, ProductFilter, ProductPage};
use serde::Deserialize;

use super::extract::{ApiPath, ApiQuery};
use crate::db::{CategoryRepository, ProductRepository};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Largest page a caller may request.
#[allow(clippy::cast_possible_wrap)]
pub const MAX_PAGE_SIZE: i64 = crumb_core::MAX_PAGE_SIZE as i64;

/// Raw query string of `GET /api/products`.
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub category: Option<String>,
    pub price: Option<String>,
    pub q: Option<String>,
    pub dietary: Option<String>,
}

impl ProductQuery {
    /// Validate paging and turn the loose parameters into a typed filter.
    fn into_parts(self) -> Result<(ProductFilter, i64, i64)> {
        let filter = ProductFilter::parse(
            self.category.as_deref(),
            self.price.as_deref(),
            self.q.as_deref(),
            self.dietary.as_deref(),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

        #[allow(clippy::cast_possible_wrap)]
        let limit = self.limit.unwrap_or(PAGE_SIZE as i64);
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }

        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(AppError::BadRequest("offset must not be negative".to_owned()));
        }

        Ok((filter, limit, offset))
    }
}

/// `GET /api/products` - one page of matching products plus the total.
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> Result<Json<ProductPage>> {
    let (filter, limit, offset) = query.into_parts()?;
    let page = ProductRepository::new(state.pool())
        .list(&filter, limit, offset)
        .await?;
    Ok(Json(page))
}

/// `GET /api/products/{slug}`
pub async fn show_product(
    State(state): State<AppState>,
    ApiPath(slug): ApiPath<String>,
) -> Result<Json<Product>> {
    ProductRepository::new(state.pool())
        .get_by_slug(&slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product '{slug}'")))
}

/// `GET /api/categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}
