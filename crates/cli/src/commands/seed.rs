//! Seed the catalog from a YAML file.
//!
//! Seeding is repeatable: categories are matched by slug and created when
//! missing, products are matched by slug and created or overwritten.
//!
//! ```yaml
//! categories:
//!   - slug: breads
//!     name: Breads
//!     products:
//!       - slug: sourdough-loaf
//!         name: Sourdough Loaf
//!         price: 450
//!         dietary_options: [vegan]
//! ```

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use crumb_core::CategoryId;
use crumb_core::catalog::is_valid_slug;
use crumb_storefront::db::{CategoryRepository, ProductInput, ProductRepository, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info};

use super::migrate::{self, MigrationError};

/// Top-level seed document.
#[derive(Debug, Deserialize)]
pub struct SeedCatalog {
    pub categories: Vec<SeedCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
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

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Could not read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("product '{0}': {1}")]
    Product(String, String),

    #[error(transparent)]
    Connect(#[from] MigrationError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Counts reported after a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories_created: usize,
    pub products_created: usize,
    pub products_updated: usize,
}

/// Check the whole document before touching the database.
///
/// Returns one message per problem; empty means valid.
#[must_use]
pub fn validate_catalog(catalog: &SeedCatalog) -> Vec<String> {
    let mut errors = Vec::new();
    let mut category_slugs = HashSet::new();
    let mut product_slugs = HashSet::new();

    for category in &catalog.categories {
        if !is_valid_slug(&category.slug) {
            errors.push(format!("category '{}': invalid slug", category.slug));
        }
        if !category_slugs.insert(category.slug.as_str()) {
            errors.push(format!("category '{}': duplicate slug", category.slug));
        }

        for product in &category.products {
            if !product_slugs.insert(product.slug.as_str()) {
                errors.push(format!("product '{}': duplicate slug", product.slug));
            }
            if let Err(message) = product_input(product, CategoryId::new(0)).validate() {
                errors.push(format!("product '{}': {message}", product.slug));
            }
        }
    }

    errors
}

fn product_input(product: &SeedProduct, category_id: CategoryId) -> ProductInput {
    ProductInput {
        slug: product.slug.clone(),
        name: product.name.clone(),
        description: product.description.clone(),
        price: product.price,
        image: product.image.clone(),
        category_id,
        featured: product.featured,
        is_bestseller: product.is_bestseller,
        is_new: product.is_new,
        is_popular: product.is_popular,
        dietary_options: product.dietary_options.clone(),
    }
}

/// Upsert every category and product in `catalog`.
///
/// # Errors
///
/// Returns `SeedError::Repository` on the first failed write.
pub async fn apply(pool: &PgPool, catalog: &SeedCatalog) -> Result<SeedSummary, SeedError> {
    let categories = CategoryRepository::new(pool);
    let products = ProductRepository::new(pool);
    let existing = categories.list().await?;
    let mut summary = SeedSummary::default();

    for seed in &catalog.categories {
        let category = if let Some(found) = existing.iter().find(|c| c.slug == seed.slug) {
            found.clone()
        } else {
            summary.categories_created += 1;
            categories.create(seed.name.trim(), &seed.slug).await?
        };

        for product in &seed.products {
            let input = product_input(product, category.id)
                .validate()
                .map_err(|message| SeedError::Product(product.slug.clone(), message))?;

            match products.get_by_slug(&input.slug).await? {
                Some(current) => {
                    products.update(current.id, &input).await?;
                    summary.products_updated += 1;
                }
                None => {
                    products.create(&input).await?;
                    summary.products_created += 1;
                }
            }
        }
    }

    Ok(summary)
}

/// Seed the catalog from the YAML file at `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn catalog(file_path: &Path) -> Result<(), SeedError> {
    info!(path = %file_path.display(), "Loading catalog seed");

    let content = tokio::fs::read_to_string(file_path).await?;
    let catalog: SeedCatalog = serde_yaml::from_str(&content)?;

    let errors = validate_catalog(&catalog);
    if !errors.is_empty() {
        error!("Seed validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(SeedError::Invalid(errors.len()));
    }

    let pool = migrate::connect().await?;
    let summary = apply(&pool, &catalog).await?;

    info!("Seeding complete");
    info!("  Categories created: {}", summary.categories_created);
    info!("  Products created: {}", summary.products_created);
    info!("  Products updated: {}", summary.products_updated);

    Ok(())
}
