//! Catalog model: products, categories, filter criteria, sorting and paging.
//!
//! Filtering is split between server and client. Category, price bands,
//! free-text search and dietary tags are sent to the server as query
//! parameters and change which products are returned; sorting is applied on
//! the client over whatever pages it has already accumulated.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CategoryId, PriceBand, PriceBandError, ProductId};

/// Number of products requested per page by the storefront.
pub const PAGE_SIZE: usize = 6;

/// Largest page a caller may request.
pub const MAX_PAGE_SIZE: usize = 48;

/// Longest free-text search accepted.
pub const MAX_SEARCH_LENGTH: usize = 100;

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
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
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of catalog results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: u64,
}

/// Errors raised while turning loose query parameters into a [`ProductFilter`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error(transparent)]
    PriceBand(#[from] PriceBandError),
    #[error("category must be a valid slug")]
    Category,
    #[error("search text must be at most {MAX_SEARCH_LENGTH} characters")]
    SearchTooLong,
    #[error("dietary tag '{0}' is not a valid tag")]
    DietaryTag(String),
}

/// Whether `s` is a URL-safe slug: lowercase ASCII letters, digits and
/// single dashes, not starting or ending with a dash.
#[must_use]
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 120
        && !s.starts_with('-')
        && !s.ends_with('-')
        && !s.contains("--")
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Strongly-typed catalog filter criteria.
///
/// - `search`: case-insensitive substring of name or description
/// - `category`: a single category slug
/// - `price_bands`: a product matches if its price is in ANY band
/// - `dietary`: a product matches only if it carries ALL tags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price_bands: Vec<PriceBand>,
    pub dietary: BTreeSet<String>,
}

impl ProductFilter {
    /// Build a filter from raw query-string values, validating each one.
    ///
    /// Blank values are treated as absent. Dietary tags are lowercased.
    ///
    /// # Errors
    ///
    /// Returns a [`FilterError`] naming the first invalid parameter.
    pub fn parse(
        category: Option<&str>,
        price: Option<&str>,
        search: Option<&str>,
        dietary: Option<&str>,
    ) -> Result<Self, FilterError> {
        let category = non_blank(category).map(str::to_owned);
        if category.as_deref().is_some_and(|slug| !is_valid_slug(slug)) {
            return Err(FilterError::Category);
        }

        let search = non_blank(search).map(str::to_owned);
        if search
            .as_deref()
            .is_some_and(|q| q.chars().count() > MAX_SEARCH_LENGTH)
        {
            return Err(FilterError::SearchTooLong);
        }

        let price_bands = match non_blank(price) {
            Some(raw) => PriceBand::parse_list(raw)?,
            None => Vec::new(),
        };

        let mut tags = BTreeSet::new();
        for tag in non_blank(dietary).unwrap_or_default().split(',') {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() {
                continue;
            }
            if !is_valid_slug(&tag) {
                return Err(FilterError::DietaryTag(tag));
            }
            tags.insert(tag);
        }

        Ok(Self {
            search,
            category,
            price_bands,
            dietary: tags,
        })
    }

    /// Whether no criteria are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.category.is_none()
            && self.price_bands.is_empty()
            && self.dietary.is_empty()
    }

    /// Serialize back into the query parameters `parse` accepts.
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(category) = &self.category {
            pairs.push(("category", category.clone()));
        }
        if !self.price_bands.is_empty() {
            let bands: Vec<String> = self.price_bands.iter().map(ToString::to_string).collect();
            pairs.push(("price", bands.join(",")));
        }
        if let Some(search) = &self.search {
            pairs.push(("q", search.clone()));
        }
        if !self.dietary.is_empty() {
            let tags: Vec<&str> = self.dietary.iter().map(String::as_str).collect();
            pairs.push(("dietary", tags.join(",")));
        }
        pairs
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Client-side sort orders over the accumulated product list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    /// Featured products first, otherwise load order.
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    /// Most recent `created_at` first; a missing timestamp counts as the epoch.
    Newest,
    /// Bestsellers first, otherwise load order.
    Bestselling,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "featured" => Ok(Self::Featured),
            "price-low" => Ok(Self::PriceLow),
            "price-high" => Ok(Self::PriceHigh),
            "newest" => Ok(Self::Newest),
            "bestselling" => Ok(Self::Bestselling),
            _ => Err(format!("unknown sort order: {s}")),
        }
    }
}

/// Stable sort of `products` in place.
pub fn sort_products(products: &mut [Product], order: SortOrder) {
    match order {
        SortOrder::Featured => products.sort_by_key(|p| !p.featured),
        SortOrder::PriceLow => products.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceHigh => products.sort_by(|a, b| b.price.cmp(&a.price)),
        // DateTime<Utc>::default() is the Unix epoch
        SortOrder::Newest => products.sort_by(|a, b| {
            b.created_at
                .unwrap_or_default()
                .cmp(&a.created_at.unwrap_or_default())
        }),
        SortOrder::Bestselling => products.sort_by_key(|p| !p.is_bestseller),
    }
}

/// Accumulates pages for infinite-scroll style loading.
///
/// The next page is requested at `offset = loaded count`. The feed is
/// exhausted once the loaded count reaches the total the server reported,
/// or when the server returns an empty page early.
#[derive(Debug, Clone, Default)]
pub struct CatalogFeed {
    items: Vec<Product>,
    total: Option<u64>,
    stalled: bool,
}

impl CatalogFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Offset of the next page to fetch, or `None` when nothing is left.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        if self.is_exhausted() {
            None
        } else {
            Some(self.items.len())
        }
    }

    /// Whether every matching product has been loaded.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        if self.stalled {
            return true;
        }
        self.total
            .is_some_and(|total| self.items.len() as u64 >= total)
    }

    /// Append a freshly fetched page.
    pub fn push_page(&mut self, page: ProductPage) {
        if page.products.is_empty() {
            self.stalled = true;
        }
        self.total = Some(page.total);
        self.items.extend(page.products);
    }

    /// Drop everything loaded so far; the next fetch starts at offset 0.
    pub fn reset(&mut self) {
        self.items.clear();
        self.total = None;
        self.stalled = false;
    }

    /// Products loaded so far, in load order.
    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    /// Total reported by the most recent page, if any page was loaded.
    #[must_use]
    pub const fn total(&self) -> Option<u64> {
        self.total
    }

    /// Whether the server has confirmed there are no matches at all.
    #[must_use]
    pub fn is_empty_result(&self) -> bool {
        self.total == Some(0) || (self.stalled && self.items.is_empty())
    }

    /// A sorted copy of the loaded products. Never triggers a fetch.
    #[must_use]
    pub fn sorted(&self, order: SortOrder) -> Vec<Product> {
        let mut products = self.items.clone();
        sort_products(&mut products, order);
        products
    }
}
