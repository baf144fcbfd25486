//! Orders and the checkout payload that creates them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::delivery::{DeliverySelection, PriceQuote};
use crate::types::{Email, OrderId, OrderStatus, PaymentMethod, Phone, ProductId};

/// Longest delivery address accepted.
pub const MAX_ADDRESS_LENGTH: usize = 220;

/// Who receives the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub phone: Phone,
    #[serde(default)]
    pub email: Option<Email>,
}

/// One cart line as submitted at checkout, carrying the price the customer saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// The client cart this order was built from. A repeated checkout for the
    /// same cart returns the order already placed instead of a second one.
    #[serde(default)]
    pub cart_id: Option<Uuid>,
    pub lines: Vec<CheckoutLine>,
    pub contact: CustomerContact,
    pub address: String,
    pub delivery: DeliverySelection,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub note: Option<String>,
}

/// A persisted order line with its price frozen at order time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl OrderItem {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The courier's record of a dispatched order.
///
/// `status` mirrors the courier's own vocabulary and is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierShipment {
    pub consignment_id: String,
    pub merchant_order_id: String,
    pub status: String,
    pub invoice_id: Option<String>,
    pub delivery_fee: Option<Decimal>,
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub contact: CustomerContact,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub delivery_quote: PriceQuote,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub address: String,
    pub delivery: DeliverySelection,
    pub note: Option<String>,
    pub status: OrderStatus,
    pub shipment: Option<CourierShipment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// What the courier must collect at the door.
    #[must_use]
    pub fn amount_to_collect(&self) -> Decimal {
        if self.payment_method.collects_on_delivery() {
            self.total
        } else {
            Decimal::ZERO
        }
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Short human description used on courier labels.
    #[must_use]
    pub fn item_description(&self) -> String {
        self.items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.quantity))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Id handed to the courier as the merchant order id.
    #[must_use]
    pub fn merchant_order_id(&self) -> String {
        self.id.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryType;
    use crate::types::{AreaId, CityId, ZoneId};

    fn order(payment_method: PaymentMethod) -> Order {
        let now = Utc::now();
        Order {
            id: OrderId::new(12),
            contact: CustomerContact {
                name: "Rumana".into(),
                phone: Phone::parse("01712345678").unwrap(),
                email: None,
            },
            items: vec![
                OrderItem {
                    product_id: ProductId::new(1),
                    name: "Sourdough".into(),
                    quantity: 2,
                    unit_price: Decimal::from(100),
                    size: None,
                    color: None,
                },
                OrderItem {
                    product_id: ProductId::new(2),
                    name: "Brownie".into(),
                    quantity: 1,
                    unit_price: Decimal::from(50),
                    size: None,
                    color: None,
                },
            ],
            subtotal: Decimal::from(250),
            delivery_quote: PriceQuote::flat(Decimal::from(60)),
            total: Decimal::from(310),
            payment_method,
            address: "House 4, Road 2".into(),
            delivery: DeliverySelection {
                city_id: CityId::new(1),
                zone_id: ZoneId::new(2),
                area_id: AreaId::new(3),
                delivery_type: DeliveryType::Normal,
            },
            note: None,
            status: OrderStatus::Pending,
            shipment: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_amount_to_collect_depends_on_payment() {
        assert_eq!(order(PaymentMethod::CashOnDelivery).amount_to_collect(), Decimal::from(310));
        assert_eq!(order(PaymentMethod::Bkash).amount_to_collect(), Decimal::ZERO);
    }

    #[test]
    fn test_label_helpers() {
        let order = order(PaymentMethod::CashOnDelivery);
        assert_eq!(order.item_quantity(), 3);
        assert_eq!(order.item_description(), "Sourdough x2, Brownie x1");
        assert_eq!(order.merchant_order_id(), "12");
    }

    #[test]
    fn test_checkout_request_defaults() {
        let request: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "lines": [
                {"product_id": 1, "quantity": 2, "unit_price": "100"},
                {"product_id": 2, "quantity": 1, "unit_price": "50"}
            ],
            "contact": {"name": "Rumana", "phone": "01712345678"},
            "address": "House 4, Road 2",
            "delivery": {"city_id": 1, "zone_id": 2, "area_id": 3}
        }))
        .unwrap();
        assert_eq!(request.cart_id, None);
        assert_eq!(request.lines[1].unit_price, Decimal::from(50));
        assert_eq!(request.payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(request.note, None);
    }
}
