//! Catalog browsing against a mocked storefront.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use crumb_client::{CatalogBrowser, ListingState, StorefrontApi};
use crumb_core::{ProductFilter, SortOrder};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn product(id: i64, price: &str) -> Value {
    json!({
        "id": id,
        "slug": format!("loaf-{id}"),
        "name": format!("Loaf {id}"),
        "description": "",
        "price": price,
        "image": null,
        "category_id": 1
    })
}

fn api(server: &MockServer) -> StorefrontApi {
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    StorefrontApi::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_pages_are_requested_at_loaded_count() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product(1, "300"), product(2, "120")],
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product(3, "80")],
            "total": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    let mut browser = CatalogBrowser::new().with_page_size(2);

    assert_eq!(browser.load_more(&api).await.unwrap(), 2);
    assert_eq!(browser.load_more(&api).await.unwrap(), 1);
    assert!(!browser.has_more());
    // Exhausted: no third request.
    assert_eq!(browser.load_more(&api).await.unwrap(), 0);

    browser.set_sort(SortOrder::PriceLow);
    let ListingState::Ready(products) = browser.listing() else {
        panic!("expected products");
    };
    let ids: Vec<i64> = products.iter().map(|p| p.id.as_i64()).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn test_filter_change_restarts_at_offset_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("dietary", "vegan"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product(9, "150")],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product(1, "300"), product(2, "120")],
            "total": 10
        })))
        .mount(&server)
        .await;

    let api = api(&server);
    let mut browser = CatalogBrowser::new().with_page_size(2);
    browser.load_more(&api).await.unwrap();
    assert_eq!(browser.loaded(), 2);

    let vegan = ProductFilter::parse(None, None, None, Some("vegan")).unwrap();
    assert!(browser.set_filter(vegan));
    assert_eq!(browser.loaded(), 0);
    assert_eq!(browser.listing(), ListingState::Loading);

    browser.load_more(&api).await.unwrap();
    let ListingState::Ready(products) = browser.listing() else {
        panic!("expected products");
    };
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].slug, "loaf-9");
}

#[tokio::test]
async fn test_no_matches_is_empty_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "products": [], "total": 0 })),
        )
        .mount(&server)
        .await;

    let api = api(&server);
    let mut browser = CatalogBrowser::new();
    assert_eq!(browser.load_more(&api).await.unwrap(), 0);
    assert_eq!(browser.listing(), ListingState::Empty);
    assert!(!browser.has_more());
}

#[tokio::test]
async fn test_failed_fetch_keeps_loaded_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product(1, "300")],
            "total": 5
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("offset", "1"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Internal server error" })),
        )
        .mount(&server)
        .await;

    let api = api(&server);
    let mut browser = CatalogBrowser::new().with_page_size(1);
    browser.load_more(&api).await.unwrap();

    let err = browser.load_more(&api).await.unwrap_err();
    assert!(err.is_retryable());
    assert!(matches!(browser.listing(), ListingState::Failed(_)));
    assert_eq!(browser.loaded(), 1);
    assert!(browser.has_more());
}
