//! Infinite-scroll catalog browsing.
//!
//! Filters are applied by the server, so changing them throws away the
//! loaded pages and starts again at offset 0. Sorting is applied here over
//! whatever has been loaded and never fetches.

use crumb_core::{CatalogFeed, MAX_PAGE_SIZE, PAGE_SIZE, Product, ProductFilter, SortOrder};
use tracing::{debug, instrument};

use crate::api::StorefrontApi;
use crate::error::ClientError;

/// What the product grid should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingState {
    /// Nothing loaded yet and no answer from the server.
    Loading,
    /// The server confirmed nothing matches the filters.
    Empty,
    /// Products to show, already sorted.
    Ready(Vec<Product>),
    /// The last fetch failed; show a retry affordance.
    Failed(String),
}

/// Catalog state held by the client.
#[derive(Debug, Clone)]
pub struct CatalogBrowser {
    filter: ProductFilter,
    sort: SortOrder,
    feed: CatalogFeed,
    page_size: usize,
    error: Option<String>,
}

impl Default for CatalogBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogBrowser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter: ProductFilter::default(),
            sort: SortOrder::default(),
            feed: CatalogFeed::new(),
            page_size: PAGE_SIZE,
            error: None,
        }
    }

    /// Use a page size other than the default of six, clamped to what the
    /// server accepts.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    #[must_use]
    pub const fn filter(&self) -> &ProductFilter {
        &self.filter
    }

    #[must_use]
    pub const fn sort(&self) -> SortOrder {
        self.sort
    }

    /// Replace the server-side criteria.
    ///
    /// Returns `true` when the criteria changed and loaded pages were dropped;
    /// the caller should then call [`CatalogBrowser::load_more`].
    pub fn set_filter(&mut self, filter: ProductFilter) -> bool {
        if filter == self.filter {
            return false;
        }
        self.filter = filter;
        self.feed.reset();
        self.error = None;
        true
    }

    /// Change the client-side sort. Never fetches.
    pub const fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
    }

    /// Whether another page can be requested.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.feed.next_offset().is_some()
    }

    /// Number of products loaded so far.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.feed.items().len()
    }

    /// Fetch the next page at `offset = loaded count`.
    ///
    /// Returns how many products the page added; `0` once the feed is
    /// exhausted, without making a request.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the request fails. Loaded pages are kept and
    /// the same page can be retried.
    #[instrument(skip(self, api), fields(loaded = self.loaded()))]
    pub async fn load_more(&mut self, api: &StorefrontApi) -> Result<usize, ClientError> {
        let Some(offset) = self.feed.next_offset() else {
            return Ok(0);
        };

        match api.list_products(&self.filter, offset, self.page_size).await {
            Ok(page) => {
                let added = page.products.len();
                self.feed.push_page(page);
                self.error = None;
                debug!(added, total = ?self.feed.total(), "Catalog page loaded");
                Ok(added)
            }
            Err(err) => {
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// The current view of the grid.
    #[must_use]
    pub fn listing(&self) -> ListingState {
        if let Some(error) = &self.error {
            return ListingState::Failed(error.clone());
        }
        if self.feed.is_empty_result() {
            return ListingState::Empty;
        }
        if self.feed.total().is_none() {
            return ListingState::Loading;
        }
        ListingState::Ready(self.feed.sorted(self.sort))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_browser_is_loading() {
        let browser = CatalogBrowser::new();
        assert_eq!(browser.listing(), ListingState::Loading);
        assert!(browser.has_more());
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(CatalogBrowser::new().with_page_size(0).page_size, 1);
        assert_eq!(CatalogBrowser::new().with_page_size(500).page_size, MAX_PAGE_SIZE);
        assert_eq!(CatalogBrowser::new().with_page_size(12).page_size, 12);
    }

    #[test]
    fn test_unchanged_filter_keeps_pages() {
        let mut browser = CatalogBrowser::new();
        assert!(!browser.set_filter(ProductFilter::default()));

        let vegan = ProductFilter::parse(None, None, None, Some("vegan")).unwrap_or_default();
        assert!(browser.set_filter(vegan.clone()));
        assert!(!browser.set_filter(vegan));
    }
}
