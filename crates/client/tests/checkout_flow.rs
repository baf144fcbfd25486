//! Client checkout flow against a mocked storefront.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::time::Duration;

use crumb_client::{
    CartStore, CheckoutDetails, CheckoutFlow, ClientError, DispatchStatus, FlowState,
    MemoryStorage, Outcome, QuoteInput, StorefrontApi,
};
use crumb_core::{
    AddOptions, AreaId, CategoryId, CityId, CustomerContact, DeliverySelection, DeliveryType,
    PaymentMethod, Phone, Product, ProductId, ZoneId,
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> StorefrontApi {
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    StorefrontApi::new(base, Duration::from_secs(5)).unwrap()
}

fn croissant() -> Product {
    Product {
        id: ProductId::new(1),
        slug: "croissant".into(),
        name: "Butter Croissant".into(),
        description: String::new(),
        price: Decimal::from(100),
        image: None,
        category_id: CategoryId::new(1),
        featured: false,
        is_bestseller: false,
        is_new: false,
        is_popular: false,
        dietary_options: BTreeSet::new(),
        created_at: None,
    }
}

fn delivery() -> DeliverySelection {
    DeliverySelection {
        city_id: CityId::new(1),
        zone_id: ZoneId::new(10),
        area_id: AreaId::new(100),
        delivery_type: DeliveryType::Normal,
    }
}

fn details() -> CheckoutDetails {
    CheckoutDetails {
        contact: CustomerContact {
            name: "Nadia Rahman".into(),
            phone: Phone::parse("01712345678").unwrap(),
            email: None,
        },
        address: "House 12, Road 5, Dhanmondi".into(),
        delivery: delivery(),
        payment_method: PaymentMethod::CashOnDelivery,
        note: None,
    }
}

fn placed_order() -> Value {
    json!({
        "order": {
            "id": 42,
            "contact": { "name": "Nadia Rahman", "phone": "01712345678", "email": null },
            "items": [{
                "product_id": 1,
                "name": "Butter Croissant",
                "quantity": 2,
                "unit_price": "100",
                "size": null,
                "color": null
            }],
            "subtotal": "200",
            "delivery_quote": {
                "price": "60",
                "cod_charge": "0",
                "promo_discount": "0",
                "total_price": "60"
            },
            "total": "260",
            "payment_method": "cash_on_delivery",
            "address": "House 12, Road 5, Dhanmondi",
            "delivery": { "city_id": 1, "zone_id": 10, "area_id": 100, "delivery_type": "normal" },
            "note": null,
            "status": "pending",
            "shipment": null,
            "created_at": "2026-03-01T10:00:00Z",
            "updated_at": "2026-03-01T10:00:00Z"
        },
        "dispatch": { "status": "skipped" }
    })
}

fn cart_with_two_croissants() -> CartStore<MemoryStorage> {
    let mut cart = CartStore::open(MemoryStorage::new());
    cart.add_item(&croissant(), AddOptions::default()).unwrap();
    cart.add_item(&croissant(), AddOptions::default()).unwrap();
    cart
}

#[tokio::test]
async fn test_submit_places_order_and_clears_cart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .and(body_partial_json(json!({
            "lines": [{ "product_id": 1, "quantity": 2 }],
            "payment_method": "cash_on_delivery"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(placed_order()))
        .expect(1)
        .mount(&server)
        .await;

    let api = api(&server);
    let mut cart = cart_with_two_croissants();
    let old_cart_id = cart.cart().id();

    let flow = CheckoutFlow::new();
    flow.enter();
    let outcome = flow.submit(&api, &mut cart, details()).await.unwrap();

    let Outcome::Applied(placed) = outcome else {
        panic!("expected the order to be applied");
    };
    assert_eq!(placed.order.total, Decimal::from(260));
    assert_eq!(placed.dispatch, DispatchStatus::Skipped);
    assert!(matches!(flow.state(), FlowState::Placed(_)));
    assert!(cart.cart().is_empty());
    assert_ne!(cart.cart().id(), old_cart_id);
}

#[tokio::test]
async fn test_late_confirmation_is_discarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(placed_order())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let api = api(&server);
    let mut cart = cart_with_two_croissants();
    let before = cart.cart().clone();

    let flow = CheckoutFlow::new();
    flow.enter();

    let (outcome, ()) = tokio::join!(flow.submit(&api, &mut cart, details()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        flow.leave();
    });

    assert!(matches!(outcome.unwrap(), Outcome::Discarded));
    assert_eq!(flow.state(), FlowState::Closed);
    assert_eq!(cart.cart(), &before);
}

#[tokio::test]
async fn test_rejected_submit_keeps_cart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/orders"))
        .respond_with(
            ResponseTemplate::new(422).set_body_json(json!({ "error": "address is required" })),
        )
        .mount(&server)
        .await;

    let api = api(&server);
    let mut cart = cart_with_two_croissants();
    let flow = CheckoutFlow::new();
    flow.enter();

    let mut bad = details();
    bad.address = "   ".into();
    let err = flow.submit(&api, &mut cart, bad).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 422, ref message } if message == "address is required"));
    assert_eq!(flow.state(), FlowState::Failed(err.to_string()));
    assert_eq!(cart.cart().item_count(), 2);
}

#[tokio::test]
async fn test_quote_is_applied_while_open() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/delivery/quote"))
        .and(body_partial_json(json!({ "city_id": 1, "zone_id": 10 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "price": "60",
            "cod_charge": "2",
            "promo_discount": "0",
            "total_price": "62"
        })))
        .mount(&server)
        .await;

    let api = api(&server);
    let flow = CheckoutFlow::new();
    let input = QuoteInput {
        city_id: CityId::new(1),
        zone_id: ZoneId::new(10),
        delivery_type: DeliveryType::Normal,
        subtotal: Decimal::from(200),
        payment_method: PaymentMethod::CashOnDelivery,
    };

    // Closed flow: nothing is sent.
    assert!(matches!(
        flow.request_quote(&api, &input).await.unwrap(),
        Outcome::Discarded
    ));

    flow.enter();
    let Outcome::Applied(quote) = flow.request_quote(&api, &input).await.unwrap() else {
        panic!("expected a quote");
    };
    assert_eq!(quote.total_price, Decimal::from(62));
    assert_eq!(flow.state(), FlowState::Quoted(quote));
}
