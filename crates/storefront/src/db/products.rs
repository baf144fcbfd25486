//! Product repository and the server side of catalog filtering.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crumb_core::catalog::is_valid_slug;
use crumb_core::{CategoryId, Product, ProductFilter, ProductId, ProductPage};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use super::{RepositoryError, map_constraint};

const PRODUCT_COLUMNS: &str = "id, slug, name, description, price, image, category_id, \
     featured, is_bestseller, is_new, is_popular, dietary_options, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    slug: String,
    name: String,
    description: String,
    price: Decimal,
    image: Option<String>,
    category_id: i64,
    featured: bool,
    is_bestseller: bool,
    is_new: bool,
    is_popular: bool,
    dietary_options: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            slug: row.slug,
            name: row.name,
            description: row.description,
            price: row.price,
            image: row.image,
            category_id: CategoryId::new(row.category_id),
            featured: row.featured,
            is_bestseller: row.is_bestseller,
            is_new: row.is_new,
            is_popular: row.is_popular,
            dietary_options: row.dietary_options.into_iter().collect(),
            created_at: Some(row.created_at),
        }
    }
}

// =============================================================================
// Input
// =============================================================================

/// Fields an admin supplies when creating or editing a product.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductInput {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub is_bestseller: bool,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_popular: bool,
    #[serde(default)]
    pub dietary_options: BTreeSet<String>,
}

impl ProductInput {
    /// Check the input and normalize dietary tags to lowercase.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(mut self) -> Result<Self, String> {
        self.name = self.name.trim().to_owned();
        if self.name.is_empty() {
            return Err("name is required".to_owned());
        }
        if !is_valid_slug(&self.slug) {
            return Err("slug must be lowercase letters, digits and dashes".to_owned());
        }
        if self.price < Decimal::ZERO {
            return Err("price must not be negative".to_owned());
        }

        let mut tags = BTreeSet::new();
        for tag in self.dietary_options {
            let tag = tag.trim().to_lowercase();
            if !is_valid_slug(&tag) {
                return Err(format!("dietary tag '{tag}' is not a valid tag"));
            }
            tags.insert(tag);
        }
        self.dietary_options = tags;
        self.image = self.image.filter(|image| !image.trim().is_empty());

        Ok(self)
    }
}

// =============================================================================
// Filtering
// =============================================================================

/// Escape `%`, `_` and `\` so user text is matched literally by `ILIKE`.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Append the `WHERE` clause for `filter`.
///
/// Mirrors [`ProductFilter::matches`]: any price band, all dietary tags.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    builder.push(" WHERE TRUE");

    if let Some(slug) = &filter.category {
        // An unknown slug yields NULL and matches nothing
        builder
            .push(" AND category_id = (SELECT id FROM category WHERE slug = ")
            .push_bind(slug.clone())
            .push(")");
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }

    if !filter.price_bands.is_empty() {
        builder.push(" AND (");
        for (i, band) in filter.price_bands.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder
                .push("price BETWEEN ")
                .push_bind(band.min)
                .push(" AND ")
                .push_bind(band.max);
        }
        builder.push(")");
    }

    if !filter.dietary.is_empty() {
        let tags: Vec<String> = filter.dietary.iter().cloned().collect();
        builder
            .push(" AND dietary_options @> ")
            .push_bind(tags)
            .push("::text[]");
    }
}

// =============================================================================
// Lookup seam
// =============================================================================

/// Product lookup used by checkout to resolve cart lines.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Every product whose id is in `ids`. Unknown ids are skipped.
    async fn products_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `filter`, newest first.
    ///
    /// `id` breaks ties so consecutive offsets never skip or repeat rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: &ProductFilter,
        limit: i64,
        offset: i64,
    ) -> Result<ProductPage, RepositoryError> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM product");
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM product"));
        push_filters(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows: Vec<ProductRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok(ProductPage {
            products: rows.into_iter().map(Into::into).collect(),
            total: u64::try_from(total).unwrap_or_default(),
        })
    }

    /// Get a product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE slug = $1"))
                .bind(slug)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> =
            sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    /// Get every product whose id is in `ids`. Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i64> = ids.iter().map(ProductId::as_i64).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken or the category does not exist.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row: ProductRow = sqlx::query_as(&format!(
            r"
            INSERT INTO product (slug, name, description, price, image, category_id,
                                 featured, is_bestseller, is_new, is_popular, dietary_options)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.image)
        .bind(input.category_id)
        .bind(input.featured)
        .bind(input.is_bestseller)
        .bind(input.is_new)
        .bind(input.is_popular)
        .bind(input.dietary_options.iter().cloned().collect::<Vec<_>>())
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, "product slug already exists", "category does not exist"))?;

        Ok(row.into())
    }

    /// Replace every editable field of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists.
    /// Returns `RepositoryError::Conflict` if the slug is taken or the category does not exist.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn update(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            r"
            UPDATE product
            SET slug = $2, name = $3, description = $4, price = $5, image = $6,
                category_id = $7, featured = $8, is_bestseller = $9, is_new = $10,
                is_popular = $11, dietary_options = $12, updated_at = now()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&input.slug)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(&input.image)
        .bind(input.category_id)
        .bind(input.featured)
        .bind(input.is_bestseller)
        .bind(input.is_new)
        .bind(input.is_popular)
        .bind(input.dietary_options.iter().cloned().collect::<Vec<_>>())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_constraint(e, "product slug already exists", "category does not exist"))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a product. Past orders keep their frozen lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such product exists.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ProductSource for ProductRepository<'_> {
    async fn products_by_id(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        self.get_many(ids).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off_now"), "50\\% off\\_now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_filters_build_expected_sql() {
        let filter = ProductFilter::parse(
            Some("breads"),
            Some("0-10,50-1000"),
            Some("rye"),
            Some("vegan,gluten-free"),
        )
        .unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product");
        push_filters(&mut builder, &filter);
        let sql = builder.sql();

        assert!(sql.contains("category_id = (SELECT id FROM category WHERE slug = $1)"));
        assert!(sql.contains("(name ILIKE $2 OR description ILIKE $3)"));
        assert!(sql.contains("(price BETWEEN $4 AND $5 OR price BETWEEN $6 AND $7)"));
        assert!(sql.contains("dietary_options @> $8::text[]"));
    }

    #[test]
    fn test_empty_filter_has_no_predicates() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM product");
        push_filters(&mut builder, &ProductFilter::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM product WHERE TRUE");
    }

    #[test]
    fn test_product_input_validation() {
        let input: ProductInput = serde_json::from_value(serde_json::json!({
            "slug": "rye-loaf",
            "name": "  Rye Loaf ",
            "price": "180",
            "category_id": 1,
            "dietary_options": ["Vegan"]
        }))
        .unwrap();

        let valid = input.clone().validate().unwrap();
        assert_eq!(valid.name, "Rye Loaf");
        assert!(valid.dietary_options.contains("vegan"));

        let bad_slug = ProductInput {
            slug: "Rye Loaf".into(),
            ..input.clone()
        };
        assert!(bad_slug.validate().is_err());

        let negative = ProductInput {
            price: Decimal::from(-1),
            ..input
        };
        assert!(negative.validate().is_err());
    }
}
