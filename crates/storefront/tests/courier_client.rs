//! Pathao client behavior against a stubbed courier API.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use crumb_core::{CityId, DeliveryType, ItemType, StoreId, ZoneId};
use crumb_storefront::config::PathaoConfig;
use crumb_storefront::courier::auth::CourierToken;
use crumb_storefront::courier::{Courier, CourierError, PathaoClient, PriceRequest};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> PathaoConfig {
    PathaoConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        client_id: "7N1aMJQbWm".to_string(),
        client_secret: SecretString::from("wRcaibZkUdSNz2EI9ZyuXLlNrnAv0TdPUPXMnD39"),
        username: "merchant@crumbandco.shop".to_string(),
        password: SecretString::from("merchant-password"),
        store_id: StoreId::new(148_236),
        timeout: Duration::from_secs(5),
        location_cache_ttl: Duration::from_secs(60),
        default_item_weight: Decimal::new(5, 1),
    }
}

async fn mount_token(server: &MockServer, token: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/aladdin/api/v1/issue-token"))
        .and(body_partial_json(json!({ "grant_type": "password" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 432_000,
            "access_token": token,
            "refresh_token": "unused"
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn cities_body() -> serde_json::Value {
    json!({
        "message": "City successfully fetched.",
        "type": "success",
        "code": 200,
        "data": { "data": [
            { "city_id": 1, "city_name": "Dhaka" },
            { "city_id": 2, "city_name": "Chittagong" }
        ]}
    })
}

fn price_request() -> PriceRequest {
    PriceRequest {
        store_id: StoreId::new(148_236),
        item_type: ItemType::Parcel,
        delivery_type: DeliveryType::Normal,
        item_weight: Decimal::new(5, 1),
        recipient_city: CityId::new(1),
        recipient_zone: ZoneId::new(298),
        amount_to_collect: Decimal::from(250),
    }
}

#[tokio::test]
async fn test_token_reused_within_lifetime() {
    let server = MockServer::start().await;
    mount_token(&server, "token-one", 1).await;

    Mock::given(method("GET"))
        .and(path("/aladdin/api/v1/city-list"))
        .and(header("authorization", "Bearer token-one"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/aladdin/api/v1/merchant/price-plan"))
        .and(header("authorization", "Bearer token-one"))
        .and(body_partial_json(json!({ "delivery_type": 48, "item_type": 2 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "price",
            "data": {
                "price": 60,
                "discount": 0,
                "promo_discount": 0,
                "plan_id": 69,
                "cod_enabled": 1,
                "cod_percentage": 0.01,
                "additional_charge": 0,
                "final_price": 60
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();

    let cities = client.cities().await.unwrap();
    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].name, "Dhaka");

    let quote = client.price_plan(&price_request()).await.unwrap();
    assert_eq!(quote.price, Decimal::from(60));
    assert_eq!(quote.cod_charge, Decimal::new(250, 2));
    assert_eq!(quote.total_price, Decimal::new(6250, 2));

    assert!(client.has_valid_token().await);
}

#[tokio::test]
async fn test_expired_token_reauthenticates_once() {
    let server = MockServer::start().await;
    mount_token(&server, "fresh-token", 1).await;

    Mock::given(method("GET"))
        .and(path("/aladdin/api/v1/city-list"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(2)
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();

    // Inside the five minute margin counts as expired
    client
        .set_token(CourierToken::issued_now(SecretString::from("stale-token"), 60))
        .await;
    assert!(!client.has_valid_token().await);

    client.cities().await.unwrap();
    client.cities().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_calls_share_one_refresh() {
    let server = MockServer::start().await;
    mount_token(&server, "shared-token", 1).await;

    Mock::given(method("GET"))
        .and(path("/aladdin/api/v1/city-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(4)
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let (a, b, c, d) = tokio::join!(
        client.cities(),
        client.cities(),
        client.cities(),
        client.cities()
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok() && d.is_ok());
}

#[tokio::test]
async fn test_rejected_credentials_are_auth_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/aladdin/api/v1/issue-token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Invalid credentials"
        })))
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let err = client.cities().await.unwrap_err();
    assert!(matches!(err, CourierError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn test_token_response_without_token_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/aladdin/api/v1/issue-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 432_000
        })))
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(err, CourierError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn test_error_status_keeps_raw_body() {
    let server = MockServer::start().await;
    mount_token(&server, "token", 1).await;

    Mock::given(method("GET"))
        .and(path("/aladdin/api/v1/cities/1/zone-list"))
        .respond_with(ResponseTemplate::new(422).set_body_string("{\"message\":\"bad city\"}"))
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let err = client.zones(CityId::new(1)).await.unwrap_err();
    match err {
        CourierError::Api { status, body } => {
            assert_eq!(status, 422);
            assert!(body.contains("bad city"));
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_price_plan_failure_is_pricing_error() {
    let server = MockServer::start().await;
    mount_token(&server, "token", 1).await;

    Mock::given(method("POST"))
        .and(path("/aladdin/api/v1/merchant/price-plan"))
        .respond_with(ResponseTemplate::new(400).set_body_string("zone not serviceable"))
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let err = client.price_plan(&price_request()).await.unwrap_err();
    assert!(
        matches!(err, CourierError::Pricing { status: 400, ref body } if body == "zone not serviceable"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_create_and_track_order() {
    let server = MockServer::start().await;
    mount_token(&server, "token", 1).await;

    Mock::given(method("POST"))
        .and(path("/aladdin/api/v1/orders"))
        .and(body_partial_json(json!({
            "merchant_order_id": "42",
            "amount_to_collect": 311,
            "recipient_area": 7
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Order Created Successfully",
            "data": {
                "consignment_id": "DL121224VS8TTJ",
                "merchant_order_id": 42,
                "order_status": "Pending",
                "delivery_fee": 80
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/aladdin/api/v1/orders/DL121224VS8TTJ"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "consignment_id": "DL121224VS8TTJ",
                "order_status": "Pickup_Requested",
                "order_status_slug": "Pickup_Requested"
            }
        })))
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let created = client
        .create_order(&crumb_storefront::courier::ShipmentRequest {
            store_id: StoreId::new(148_236),
            merchant_order_id: "42".to_string(),
            recipient_name: "Rumana Akter".to_string(),
            recipient_phone: "01712345678".to_string(),
            recipient_address: "House 4, Road 27, Dhanmondi".to_string(),
            recipient_city: CityId::new(1),
            recipient_zone: ZoneId::new(298),
            recipient_area: crumb_core::AreaId::new(7),
            delivery_type: DeliveryType::Normal,
            item_type: ItemType::Parcel,
            special_instruction: None,
            item_quantity: 3,
            item_weight: Decimal::new(5, 1),
            item_description: "Croissant x2, Baguette x1".to_string(),
            amount_to_collect: Decimal::new(31050, 2),
        })
        .await
        .unwrap();

    assert_eq!(created.consignment_id, "DL121224VS8TTJ");
    assert_eq!(created.merchant_order_id, "42");
    assert_eq!(created.order_status, "Pending");

    let payload = client.track_order("DL121224VS8TTJ").await.unwrap();
    assert_eq!(payload["order_status"], "Pickup_Requested");
}

#[tokio::test]
async fn test_consignment_id_is_one_encoded_path_segment() {
    let server = MockServer::start().await;
    mount_token(&server, "token", 1).await;

    Mock::given(method("GET"))
        .and(path("/aladdin/api/v1/orders/DL%2F12%203%3Fx"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "order_status": "Pending" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PathaoClient::new(config(&server)).unwrap();
    let payload = client.track_order("DL/12 3?x").await.unwrap();
    assert_eq!(payload["order_status"], "Pending");
}

#[tokio::test]
async fn test_base_url_path_is_kept() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/courier/aladdin/api/v1/issue-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "expires_in": 432_000,
            "access_token": "token"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/courier/aladdin/api/v1/city-list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cities_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(&server);
    config.base_url = Url::parse(&format!("{}/courier/", server.uri())).unwrap();
    let client = PathaoClient::new(config).unwrap();

    assert_eq!(client.cities().await.unwrap().len(), 2);
}
