//! Courier request and response types.
//!
//! Response payloads arrive wrapped as `{ message, type, code, data }`; lists
//! are nested one level deeper as `data.data`. Location types re-serialize
//! with short field names for the storefront API.

use crumb_core::{AreaId, CityId, DeliveryType, ItemType, PriceQuote, StoreId, ZoneId};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// Standard response wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// List payload inside the standard wrapper.
#[derive(Debug, Deserialize)]
pub(crate) struct Listing<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A city served by the courier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    #[serde(alias = "city_id")]
    pub id: CityId,
    #[serde(alias = "city_name")]
    pub name: String,
}

/// A zone inside a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(alias = "zone_id")]
    pub id: ZoneId,
    #[serde(alias = "zone_name")]
    pub name: String,
}

/// An area inside a zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    #[serde(alias = "area_id")]
    pub id: AreaId,
    #[serde(alias = "area_name")]
    pub name: String,
    #[serde(default, deserialize_with = "flag")]
    pub home_delivery_available: bool,
    #[serde(default, deserialize_with = "flag")]
    pub pickup_available: bool,
}

/// A merchant pickup store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    #[serde(alias = "store_id")]
    pub id: StoreId,
    #[serde(alias = "store_name")]
    pub name: String,
    #[serde(default, alias = "store_address")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub is_active: bool,
    #[serde(default)]
    pub city_id: Option<CityId>,
    #[serde(default)]
    pub zone_id: Option<ZoneId>,
}

/// Inputs for a delivery price quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRequest {
    pub store_id: StoreId,
    pub item_type: ItemType,
    pub delivery_type: DeliveryType,
    /// Parcel weight in kg.
    pub item_weight: Decimal,
    pub recipient_city: CityId,
    pub recipient_zone: ZoneId,
    /// Cash to collect at the door, used to derive the COD charge.
    pub amount_to_collect: Decimal,
}

#[derive(Debug, Serialize)]
pub(crate) struct PricePlanBody {
    store_id: i64,
    item_type: u8,
    delivery_type: u8,
    #[serde(with = "rust_decimal::serde::float")]
    item_weight: Decimal,
    recipient_city: i64,
    recipient_zone: i64,
}

impl From<&PriceRequest> for PricePlanBody {
    fn from(request: &PriceRequest) -> Self {
        Self {
            store_id: request.store_id.as_i64(),
            item_type: request.item_type.courier_code(),
            delivery_type: request.delivery_type.courier_code(),
            item_weight: request.item_weight,
            recipient_city: request.recipient_city.as_i64(),
            recipient_zone: request.recipient_zone.as_i64(),
        }
    }
}

/// Raw price plan as the courier returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct PricePlan {
    pub price: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub promo_discount: Decimal,
    #[serde(default)]
    pub plan_id: Option<i64>,
    #[serde(default, deserialize_with = "flag")]
    pub cod_enabled: bool,
    /// Fraction of the collected amount charged for COD, e.g. `0.01`.
    #[serde(default)]
    pub cod_percentage: Decimal,
    #[serde(default)]
    pub additional_charge: Decimal,
    pub final_price: Decimal,
}

impl PricePlan {
    /// Fold the plan into a customer-facing quote.
    #[must_use]
    pub fn quote(&self, amount_to_collect: Decimal) -> PriceQuote {
        let cod_charge = if self.cod_enabled && amount_to_collect > Decimal::ZERO {
            (amount_to_collect * self.cod_percentage).round_dp(2)
        } else {
            Decimal::ZERO
        };

        PriceQuote {
            price: self.price,
            cod_charge,
            promo_discount: self.promo_discount,
            total_price: self.final_price + cod_charge,
        }
    }
}

/// A shipment to register with the courier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipmentRequest {
    pub store_id: StoreId,
    /// Our order id; the courier deduplicates on it.
    pub merchant_order_id: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_address: String,
    pub recipient_city: CityId,
    pub recipient_zone: ZoneId,
    pub recipient_area: AreaId,
    pub delivery_type: DeliveryType,
    pub item_type: ItemType,
    pub special_instruction: Option<String>,
    pub item_quantity: u32,
    pub item_weight: Decimal,
    pub item_description: String,
    pub amount_to_collect: Decimal,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateOrderBody<'a> {
    store_id: i64,
    merchant_order_id: &'a str,
    recipient_name: &'a str,
    recipient_phone: &'a str,
    recipient_address: &'a str,
    recipient_city: i64,
    recipient_zone: i64,
    recipient_area: i64,
    delivery_type: u8,
    item_type: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    special_instruction: Option<&'a str>,
    item_quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    item_weight: Decimal,
    item_description: &'a str,
    /// Whole taka; the courier rejects fractional amounts.
    amount_to_collect: i64,
}

impl<'a> From<&'a ShipmentRequest> for CreateOrderBody<'a> {
    fn from(request: &'a ShipmentRequest) -> Self {
        Self {
            store_id: request.store_id.as_i64(),
            merchant_order_id: &request.merchant_order_id,
            recipient_name: &request.recipient_name,
            recipient_phone: &request.recipient_phone,
            recipient_address: &request.recipient_address,
            recipient_city: request.recipient_city.as_i64(),
            recipient_zone: request.recipient_zone.as_i64(),
            recipient_area: request.recipient_area.as_i64(),
            delivery_type: request.delivery_type.courier_code(),
            item_type: request.item_type.courier_code(),
            special_instruction: request.special_instruction.as_deref(),
            item_quantity: request.item_quantity,
            item_weight: request.item_weight,
            item_description: &request.item_description,
            amount_to_collect: request
                .amount_to_collect
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_i64()
                .unwrap_or_default(),
        }
    }
}

/// The courier's acknowledgement of a new shipment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedShipment {
    #[serde(deserialize_with = "stringly")]
    pub consignment_id: String,
    #[serde(deserialize_with = "stringly")]
    pub merchant_order_id: String,
    pub order_status: String,
    #[serde(default)]
    pub delivery_fee: Option<Decimal>,
    #[serde(default)]
    pub invoice_id: Option<String>,
}

/// Accept `true`/`false` as well as the courier's `1`/`0`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
        Flag::Null(()) => false,
    })
}

/// Accept ids sent either as strings or numbers.
fn stringly<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(value) => value,
        Id::Int(value) => value.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_city_listing_parses_courier_shape() {
        let body = json!({
            "message": "City successfully fetched.",
            "type": "success",
            "code": 200,
            "data": { "data": [
                { "city_id": 1, "city_name": "Dhaka" },
                { "city_id": 2, "city_name": "Chittagong" }
            ]}
        });

        let envelope: Envelope<Listing<City>> = serde_json::from_value(body).unwrap();
        assert_eq!(envelope.data.data.len(), 2);
        assert_eq!(envelope.data.data[0].name, "Dhaka");

        let out = serde_json::to_value(&envelope.data.data[0]).unwrap();
        assert_eq!(out, json!({ "id": 1, "name": "Dhaka" }));
    }

    #[test]
    fn test_area_flags_accept_integers() {
        let area: Area = serde_json::from_value(json!({
            "area_id": 37,
            "area_name": "Bonolota",
            "home_delivery_available": 1,
            "pickup_available": false
        }))
        .unwrap();
        assert!(area.home_delivery_available);
        assert!(!area.pickup_available);
    }

    #[test]
    fn test_quote_adds_cod_charge() {
        let plan: PricePlan = serde_json::from_value(json!({
            "price": 60,
            "discount": 0,
            "promo_discount": 0,
            "plan_id": 69,
            "cod_enabled": 1,
            "cod_percentage": 0.01,
            "additional_charge": 0,
            "final_price": 60
        }))
        .unwrap();

        let quote = plan.quote(Decimal::from(310));
        assert_eq!(quote.cod_charge, Decimal::new(310, 2));
        assert_eq!(quote.total_price, Decimal::new(6310, 2));

        let prepaid = plan.quote(Decimal::ZERO);
        assert_eq!(prepaid.cod_charge, Decimal::ZERO);
        assert_eq!(prepaid.total_price, Decimal::from(60));
    }

    #[test]
    fn test_create_order_body_uses_courier_codes() {
        let request = ShipmentRequest {
            store_id: StoreId::new(7),
            merchant_order_id: "42".into(),
            recipient_name: "Rumana".into(),
            recipient_phone: "01712345678".into(),
            recipient_address: "House 4, Road 2, Dhanmondi".into(),
            recipient_city: CityId::new(1),
            recipient_zone: ZoneId::new(2),
            recipient_area: AreaId::new(3),
            delivery_type: DeliveryType::Normal,
            item_type: ItemType::Parcel,
            special_instruction: None,
            item_quantity: 3,
            item_weight: Decimal::new(5, 1),
            item_description: "Sourdough x2, Brownie x1".into(),
            amount_to_collect: Decimal::new(31050, 2),
        };

        let body = serde_json::to_value(CreateOrderBody::from(&request)).unwrap();
        assert_eq!(body["delivery_type"], 48);
        assert_eq!(body["item_type"], 2);
        assert_eq!(body["item_weight"], 0.5);
        assert_eq!(body["amount_to_collect"], 311);
        assert!(body.get("special_instruction").is_none());
    }

    #[test]
    fn test_created_shipment_accepts_numeric_ids() {
        let shipment: CreatedShipment = serde_json::from_value(json!({
            "consignment_id": "DL121224VS8TTJ",
            "merchant_order_id": 42,
            "order_status": "Pending",
            "delivery_fee": 80
        }))
        .unwrap();
        assert_eq!(shipment.merchant_order_id, "42");
        assert_eq!(shipment.invoice_id, None);
    }
}
