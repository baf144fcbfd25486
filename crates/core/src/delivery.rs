//! Courier delivery selection and price quotes.
//!
//! Recipients are located through the courier's three-level hierarchy
//! (city → zone → area), each level identified by the courier's numeric ids.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AreaId, CityId, ZoneId};

/// Delivery speed offered by the courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "delivery_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// Standard 48-hour delivery.
    #[default]
    Normal,
    /// Same-day on-demand delivery.
    OnDemand,
}

impl DeliveryType {
    /// Numeric code the courier API expects.
    #[must_use]
    pub const fn courier_code(self) -> u8 {
        match self {
            Self::Normal => 48,
            Self::OnDemand => 12,
        }
    }
}

/// Kind of parcel handed to the courier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Document,
    #[default]
    Parcel,
}

impl ItemType {
    /// Numeric code the courier API expects.
    #[must_use]
    pub const fn courier_code(self) -> u8 {
        match self {
            Self::Document => 1,
            Self::Parcel => 2,
        }
    }
}

/// Where and how an order should be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySelection {
    pub city_id: CityId,
    pub zone_id: ZoneId,
    pub area_id: AreaId,
    #[serde(default)]
    pub delivery_type: DeliveryType,
}

/// A courier price quote.
///
/// `total_price` is what the customer pays for delivery: the courier's final
/// plan price plus the cash-on-delivery charge, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: Decimal,
    pub cod_charge: Decimal,
    pub promo_discount: Decimal,
    pub total_price: Decimal,
}

impl PriceQuote {
    /// A quote with no cash-on-delivery component.
    #[must_use]
    pub fn flat(price: Decimal) -> Self {
        Self {
            price,
            cod_charge: Decimal::ZERO,
            promo_discount: Decimal::ZERO,
            total_price: price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_courier_codes() {
        assert_eq!(DeliveryType::Normal.courier_code(), 48);
        assert_eq!(DeliveryType::OnDemand.courier_code(), 12);
        assert_eq!(ItemType::Parcel.courier_code(), 2);
    }

    #[test]
    fn test_selection_defaults_to_normal_delivery() {
        let selection: DeliverySelection =
            serde_json::from_str(r#"{"city_id": 1, "zone_id": 2, "area_id": 3}"#)
                .expect("valid selection");
        assert_eq!(selection.delivery_type, DeliveryType::Normal);
        assert_eq!(PriceQuote::flat(Decimal::from(60)).total_price, Decimal::from(60));
    }
}
