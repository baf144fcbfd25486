//! Category repository.

use crumb_core::{Category, CategoryId};
use sqlx::PgPool;
use tracing::instrument;

use super::{RepositoryError, map_constraint};

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    slug: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: CategoryId::new(row.id),
            name: row.name,
            slug: row.slug,
        }
    }
}

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List all categories by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> =
            sqlx::query_as("SELECT id, name, slug FROM category ORDER BY name, id")
                .fetch_all(self.pool)
                .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a category by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, slug FROM category WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self))]
    pub async fn create(&self, name: &str, slug: &str) -> Result<Category, RepositoryError> {
        let row: CategoryRow = sqlx::query_as(
            "INSERT INTO category (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(self.pool)
        .await
        .map_err(|e| map_constraint(e, "category slug already exists", "invalid category"))?;

        Ok(row.into())
    }

    /// Rename a category or change its slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such category exists.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: CategoryId,
        name: &str,
        slug: &str,
    ) -> Result<Category, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(
            "UPDATE category SET name = $2, slug = $3 WHERE id = $1 RETURNING id, name, slug",
        )
        .bind(id)
        .bind(name)
        .bind(slug)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| map_constraint(e, "category slug already exists", "invalid category"))?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    /// Delete a category that no product references.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if products still belong to it.
    /// Returns `RepositoryError::NotFound` if no such category exists.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let in_use: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product WHERE category_id = $1")
            .bind(id)
            .fetch_one(self.pool)
            .await?;

        if in_use > 0 {
            return Err(RepositoryError::Conflict(format!(
                "category still has {in_use} product(s)"
            )));
        }

        // The foreign key still guards against a product inserted since the count
        let result = sqlx::query("DELETE FROM category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| map_constraint(e, "category slug already exists", "category still has products"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
