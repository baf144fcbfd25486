//! Product and category maintenance.

use axum::{Json, extract::State, http::StatusCode};
use crumb_core::catalog::is_valid_slug;
use crumb_core::{Category, CategoryId, Product, ProductId};
use serde::Deserialize;

use crate::db::{CategoryRepository, ProductInput, ProductRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::routes::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// Body of category create/update.
#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
}

impl CategoryInput {
    fn validate(self) -> Result<Self> {
        let name = self.name.trim().to_owned();
        if name.is_empty() {
            return Err(AppError::Validation("name is required".to_owned()));
        }
        if !is_valid_slug(&self.slug) {
            return Err(AppError::Validation(
                "slug must be lowercase letters, digits and dashes".to_owned(),
            ));
        }
        Ok(Self {
            name,
            slug: self.slug,
        })
    }
}

/// `POST /admin/api/products`
pub async fn create_product(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<Product>)> {
    let input = input.validate().map_err(AppError::Validation)?;
    let product = ProductRepository::new(state.pool()).create(&input).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "Product created");
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /admin/api/products/{id}`
pub async fn update_product(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<Product>> {
    let input = input.validate().map_err(AppError::Validation)?;
    let product = ProductRepository::new(state.pool()).update(id, &input).await?;
    Ok(Json(product))
}

/// `DELETE /admin/api/products/{id}`
pub async fn delete_product(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<StatusCode> {
    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /admin/api/categories`
pub async fn list_categories(
    _admin: RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::new(state.pool()).list().await?))
}

/// `POST /admin/api/categories`
pub async fn create_category(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<(StatusCode, Json<Category>)> {
    let input = input.validate()?;
    let category = CategoryRepository::new(state.pool())
        .create(&input.name, &input.slug)
        .await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /admin/api/categories/{id}`
pub async fn update_category(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
    ApiJson(input): ApiJson<CategoryInput>,
) -> Result<Json<Category>> {
    let input = input.validate()?;
    let category = CategoryRepository::new(state.pool())
        .update(id, &input.name, &input.slug)
        .await?;
    Ok(Json(category))
}

/// `DELETE /admin/api/categories/{id}` - 409 while products still use it.
pub async fn delete_category(
    _admin: RequireAdmin,
    State(state): State<AppState>,
    ApiPath(id): ApiPath<CategoryId>,
) -> Result<StatusCode> {
    CategoryRepository::new(state.pool()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_input_validation() {
        let ok = CategoryInput {
            name: "  Cakes ".into(),
            slug: "cakes".into(),
        }
        .validate();
        assert!(matches!(ok, Ok(ref input) if input.name == "Cakes"));

        let bad_slug = CategoryInput {
            name: "Cakes".into(),
            slug: "Cakes & Tarts".into(),
        }
        .validate();
        assert!(matches!(bad_slug, Err(AppError::Validation(_))));
    }
}
