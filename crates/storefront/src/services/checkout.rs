//! Checkout workflow.
//!
//! `cart → pending order`: validate the submission, resolve the delivery
//! location, get a courier quote, then persist the order with its lines and
//! the confirmed quote. Courier dispatch is optional and happens only after
//! the order is safely stored; a dispatch failure never fails the checkout.
//!
//! A checkout carrying a `cart_id` that already produced an order returns
//! that order, so a shopper retrying after a lost confirmation does not pay
//! twice.

use std::collections::HashMap;

use crumb_core::order::MAX_ADDRESS_LENGTH;
use crumb_core::{
    CheckoutLine, CheckoutRequest, CityId, DeliveryType, ItemType, Order, OrderItem,
    PaymentMethod, PriceQuote, Product, ProductId, StoreId, ZoneId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{Fulfillment, LocationDirectory, ServiceError};
use crate::courier::{Courier, PriceRequest};
use crate::db::{NewOrder, OrderStore, ProductSource};

/// Most lines accepted in one order.
pub const MAX_ORDER_LINES: usize = 50;

/// Most units of one line accepted in one order.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Knobs for the checkout workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// Courier pickup store used for quotes and shipments.
    pub store_id: StoreId,
    /// Parcel weight in kg.
    pub item_weight: Decimal,
    /// Dispatch to the courier immediately after the order is stored.
    pub auto_dispatch: bool,
}

/// What happened to courier dispatch during checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Auto-dispatch is off; the back office dispatches later.
    Skipped,
    /// The courier accepted the shipment.
    Dispatched { consignment_id: String },
    /// The courier call failed; the order stays pending and can be retried.
    Failed { error: String },
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub dispatch: DispatchOutcome,
}

impl CheckoutOutcome {
    /// Outcome for an order placed by an earlier checkout of the same cart.
    fn existing(order: Order) -> Self {
        let dispatch = order
            .shipment
            .as_ref()
            .map_or(DispatchOutcome::Skipped, |shipment| DispatchOutcome::Dispatched {
                consignment_id: shipment.consignment_id.clone(),
            });
        Self { order, dispatch }
    }
}

/// Composes product lookup, location checks, courier pricing and persistence.
pub struct CheckoutService<'a> {
    products: &'a dyn ProductSource,
    orders: &'a dyn OrderStore,
    courier: &'a dyn Courier,
    locations: &'a LocationDirectory,
    settings: CheckoutSettings,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub fn new(
        products: &'a dyn ProductSource,
        orders: &'a dyn OrderStore,
        courier: &'a dyn Courier,
        locations: &'a LocationDirectory,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            products,
            orders,
            courier,
            locations,
            settings,
        }
    }

    /// Turn a submitted cart into a persisted `pending` order.
    ///
    /// Line prices are taken from the submission: they are the prices the
    /// customer saw when adding to the cart.
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for an empty cart, bad contact details or
    ///   a delivery location the courier does not serve
    /// - `ServiceError::NotFound` if a line references an unknown product
    /// - `ServiceError::Courier` if location lookup or pricing fails
    /// - `ServiceError::Repository` if the order cannot be stored
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn place_order(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutOutcome, ServiceError> {
        validate(request)?;

        if let Some(cart_id) = request.cart_id
            && let Some(existing) = self.orders.find_by_cart(cart_id).await?
        {
            tracing::info!(order_id = %existing.id, %cart_id, "Cart already checked out");
            return Ok(CheckoutOutcome::existing(existing));
        }

        let items = self.order_items(request).await?;
        let subtotal: Decimal = items.iter().map(OrderItem::line_total).sum();

        self.locations.resolve(&request.delivery).await?;

        let delivery_quote = quote_delivery(
            self.courier,
            &self.settings,
            &QuoteRequest {
                city_id: request.delivery.city_id,
                zone_id: request.delivery.zone_id,
                delivery_type: request.delivery.delivery_type,
                subtotal: Some(subtotal),
                payment_method: request.payment_method,
            },
        )
        .await?;

        let new_order = NewOrder {
            cart_id: request.cart_id,
            contact: request.contact.clone(),
            address: request.address.trim().to_owned(),
            delivery: request.delivery,
            payment_method: request.payment_method,
            note: request
                .note
                .as_deref()
                .map(str::trim)
                .filter(|note| !note.is_empty())
                .map(str::to_owned),
            items,
            subtotal,
            delivery_quote,
            total: subtotal + delivery_quote.total_price,
        };

        let order = self.orders.insert(&new_order).await?;
        tracing::info!(order_id = %order.id, total = %order.total, "Checkout complete");

        if !self.settings.auto_dispatch {
            return Ok(CheckoutOutcome {
                order,
                dispatch: DispatchOutcome::Skipped,
            });
        }

        let fulfillment = Fulfillment::new(
            self.courier,
            self.orders,
            self.settings.store_id,
            self.settings.item_weight,
        );

        match fulfillment.dispatch(&order).await {
            Ok(dispatched) => {
                let consignment_id = dispatched
                    .shipment
                    .as_ref()
                    .map(|shipment| shipment.consignment_id.clone())
                    .unwrap_or_default();
                Ok(CheckoutOutcome {
                    order: dispatched,
                    dispatch: DispatchOutcome::Dispatched { consignment_id },
                })
            }
            Err(err) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %err,
                    "Courier dispatch failed; order left pending"
                );
                Ok(CheckoutOutcome {
                    order,
                    dispatch: DispatchOutcome::Failed {
                        error: err.to_string(),
                    },
                })
            }
        }
    }

    /// Resolve every line against the catalog and freeze its price.
    async fn order_items(&self, request: &CheckoutRequest) -> Result<Vec<OrderItem>, ServiceError> {
        let ids: Vec<ProductId> = request.lines.iter().map(|line| line.product_id).collect();
        let products: HashMap<ProductId, Product> = self
            .products
            .products_by_id(&ids)
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();

        request
            .lines
            .iter()
            .map(|line| {
                let product = products
                    .get(&line.product_id)
                    .ok_or_else(|| ServiceError::NotFound(format!("product {}", line.product_id)))?;

                if let Some(drift) = price_drift(line, product) {
                    tracing::warn!(
                        product_id = %line.product_id,
                        submitted = %line.unit_price,
                        catalog = %product.price,
                        %drift,
                        "Submitted price differs from catalog price"
                    );
                }

                Ok(OrderItem {
                    product_id: line.product_id,
                    name: product.name.clone(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    size: line.size.clone(),
                    color: line.color.clone(),
                })
            })
            .collect()
    }
}

/// Input for a delivery price quote ahead of checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct QuoteRequest {
    pub city_id: CityId,
    pub zone_id: ZoneId,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    /// Cart subtotal; the courier charges a fee on cash it collects.
    #[serde(default)]
    pub subtotal: Option<Decimal>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
}

impl QuoteRequest {
    /// Cash the courier will collect on delivery.
    #[must_use]
    pub fn amount_to_collect(&self) -> Decimal {
        match self.subtotal {
            Some(subtotal) if self.payment_method.collects_on_delivery() => {
                subtotal.max(Decimal::ZERO)
            }
            _ => Decimal::ZERO,
        }
    }
}

/// Ask the courier what delivering a parcel to `request`'s zone costs.
///
/// # Errors
///
/// Returns `ServiceError::Courier` if the price-plan call fails.
#[instrument(skip(courier, settings))]
pub async fn quote_delivery(
    courier: &dyn Courier,
    settings: &CheckoutSettings,
    request: &QuoteRequest,
) -> Result<PriceQuote, ServiceError> {
    let quote = courier
        .price_plan(&PriceRequest {
            store_id: settings.store_id,
            item_type: ItemType::Parcel,
            delivery_type: request.delivery_type,
            item_weight: settings.item_weight,
            recipient_city: request.city_id,
            recipient_zone: request.zone_id,
            amount_to_collect: request.amount_to_collect(),
        })
        .await?;
    Ok(quote)
}

/// How far a submitted line price is from the current catalog price, if at all.
fn price_drift(line: &CheckoutLine, product: &Product) -> Option<Decimal> {
    let drift = line.unit_price - product.price;
    (!drift.is_zero()).then_some(drift)
}

/// Reject malformed submissions before any I/O.
fn validate(request: &CheckoutRequest) -> Result<(), ServiceError> {
    let invalid = |message: &str| Err(ServiceError::Validation(message.to_owned()));

    if request.lines.is_empty() {
        return invalid("cart is empty");
    }
    if request.lines.len() > MAX_ORDER_LINES {
        return invalid("too many lines in one order");
    }
    for line in &request.lines {
        if line.quantity == 0 || line.quantity > MAX_LINE_QUANTITY {
            return Err(ServiceError::Validation(format!(
                "quantity for product {} must be between 1 and {MAX_LINE_QUANTITY}",
                line.product_id
            )));
        }
        if line.unit_price < Decimal::ZERO {
            return invalid("line price must not be negative");
        }
    }

    if request.contact.name.trim().is_empty() {
        return invalid("name is required");
    }

    let address = request.address.trim();
    if address.is_empty() {
        return invalid("delivery address is required");
    }
    if address.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(ServiceError::Validation(format!(
            "delivery address must be at most {MAX_ADDRESS_LENGTH} characters"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        serde_json::from_value(serde_json::json!({
            "lines": [{"product_id": 1, "quantity": 2, "unit_price": "100"}],
            "contact": {"name": "Rumana", "phone": "01712345678"},
            "address": "House 4, Road 2",
            "delivery": {"city_id": 1, "zone_id": 2, "area_id": 3}
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_accepts_well_formed_request() {
        assert!(validate(&request()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_cart() {
        let mut empty = request();
        empty.lines.clear();
        assert!(matches!(validate(&empty), Err(ServiceError::Validation(ref m)) if m == "cart is empty"));
    }

    #[test]
    fn test_validate_rejects_blank_contact_and_address() {
        let mut blank_name = request();
        blank_name.contact.name = "   ".into();
        assert!(validate(&blank_name).is_err());

        let mut blank_address = request();
        blank_address.address = String::new();
        assert!(validate(&blank_address).is_err());

        let mut long_address = request();
        long_address.address = "x".repeat(MAX_ADDRESS_LENGTH + 1);
        assert!(validate(&long_address).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_quantity() {
        let mut zero = request();
        zero.lines[0].quantity = 0;
        assert!(validate(&zero).is_err());
    }

    #[test]
    fn test_price_drift_against_catalog() {
        let request = request();
        let line = &request.lines[0];
        let mut product: Product = serde_json::from_value(serde_json::json!({
            "id": 1, "slug": "croissant", "name": "Croissant", "description": "",
            "price": "100", "image": null, "category_id": 1
        }))
        .unwrap();
        assert_eq!(price_drift(line, &product), None);

        product.price = Decimal::from(120);
        assert_eq!(price_drift(line, &product), Some(Decimal::from(-20)));
    }

    #[test]
    fn test_quote_collects_only_for_cash_on_delivery() {
        let cod: QuoteRequest = serde_json::from_value(serde_json::json!({
            "city_id": 1, "zone_id": 2, "subtotal": "250"
        }))
        .unwrap();
        assert_eq!(cod.amount_to_collect(), Decimal::from(250));

        let prepaid = QuoteRequest {
            payment_method: PaymentMethod::Bkash,
            ..cod
        };
        assert_eq!(prepaid.amount_to_collect(), Decimal::ZERO);

        let no_subtotal = QuoteRequest {
            subtotal: None,
            ..cod
        };
        assert_eq!(no_subtotal.amount_to_collect(), Decimal::ZERO);
    }

    #[test]
    fn test_dispatch_outcome_shape() {
        let json = serde_json::to_value(DispatchOutcome::Dispatched {
            consignment_id: "DL1".into(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "dispatched", "consignment_id": "DL1"}));
        assert_eq!(
            serde_json::to_value(DispatchOutcome::Skipped).unwrap(),
            serde_json::json!({"status": "skipped"})
        );
    }
}
