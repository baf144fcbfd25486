//! Courier dispatch and tracking for persisted orders.
//!
//! Dispatch is decoupled from checkout: it may run right after the order is
//! written or later from the back office, and it may be retried. The
//! courier deduplicates on the merchant order id; this side refuses to
//! create a second consignment for an order that already has one.

use crumb_core::{CourierShipment, ItemType, Order, OrderId, StoreId};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use super::ServiceError;
use crate::courier::{Courier, ShipmentRequest};
use crate::db::OrderStore;

/// Raw courier tracking payload for an order.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingReport {
    pub order_id: OrderId,
    pub consignment_id: String,
    /// The courier's status string, when the payload carries one.
    pub courier_status: Option<String>,
    /// Passed through from the courier unmodified.
    pub payload: serde_json::Value,
}

/// Hands orders to the courier and reads back their progress.
pub struct Fulfillment<'a> {
    courier: &'a dyn Courier,
    orders: &'a dyn OrderStore,
    store_id: StoreId,
    item_weight: Decimal,
}

impl<'a> Fulfillment<'a> {
    #[must_use]
    pub fn new(
        courier: &'a dyn Courier,
        orders: &'a dyn OrderStore,
        store_id: StoreId,
        item_weight: Decimal,
    ) -> Self {
        Self {
            courier,
            orders,
            store_id,
            item_weight,
        }
    }

    /// Build the courier request for an order.
    #[must_use]
    pub fn shipment_request(&self, order: &Order) -> ShipmentRequest {
        ShipmentRequest {
            store_id: self.store_id,
            merchant_order_id: order.merchant_order_id(),
            recipient_name: order.contact.name.clone(),
            recipient_phone: order.contact.phone.as_str().to_owned(),
            recipient_address: order.address.clone(),
            recipient_city: order.delivery.city_id,
            recipient_zone: order.delivery.zone_id,
            recipient_area: order.delivery.area_id,
            delivery_type: order.delivery.delivery_type,
            item_type: ItemType::Parcel,
            special_instruction: order.note.clone(),
            item_quantity: order.item_quantity(),
            item_weight: self.item_weight,
            item_description: order.item_description(),
            amount_to_collect: order.amount_to_collect(),
        }
    }

    /// Register `order` with the courier and record the consignment.
    ///
    /// An order that already has a consignment is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Conflict` for delivered or cancelled orders,
    /// `ServiceError::Courier` if the courier rejects the shipment.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn dispatch(&self, order: &Order) -> Result<Order, ServiceError> {
        if order.shipment.is_some() {
            tracing::debug!("Order already dispatched");
            return Ok(order.clone());
        }

        if order.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "order {} is {} and cannot be dispatched",
                order.id, order.status
            )));
        }

        let request = self.shipment_request(order);
        let created = self.courier.create_order(&request).await?;

        let shipment = CourierShipment {
            consignment_id: created.consignment_id,
            merchant_order_id: created.merchant_order_id,
            status: created.order_status,
            invoice_id: created.invoice_id,
            delivery_fee: created.delivery_fee,
        };

        Ok(self.orders.record_shipment(order.id, &shipment).await?)
    }

    /// Load an order by id and dispatch it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist, otherwise
    /// as [`Fulfillment::dispatch`].
    pub async fn dispatch_by_id(&self, id: OrderId) -> Result<Order, ServiceError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id}")))?;
        self.dispatch(&order).await
    }

    /// Fetch the courier's view of an order and store its status string.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the order does not exist,
    /// `ServiceError::Conflict` if it was never dispatched.
    #[instrument(skip(self))]
    pub async fn track(&self, id: OrderId) -> Result<TrackingReport, ServiceError> {
        let order = self
            .orders
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id}")))?;

        let Some(shipment) = order.shipment else {
            return Err(ServiceError::Conflict(format!(
                "order {id} has not been dispatched"
            )));
        };

        let payload = self.courier.track_order(&shipment.consignment_id).await?;
        let courier_status = payload
            .get("order_status")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        if let Some(status) = courier_status.as_deref()
            && status != shipment.status
        {
            self.orders.set_courier_status(id, status).await?;
        }

        Ok(TrackingReport {
            order_id: id,
            consignment_id: shipment.consignment_id,
            courier_status,
            payload,
        })
    }
}
