//! Order repository.
//!
//! An order and its lines are written in one transaction, so a failed
//! checkout never leaves a partial order behind. Orders placed from a client
//! cart carry its id; at most one order exists per cart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crumb_core::{
    AreaId, CityId, CourierShipment, CustomerContact, DeliverySelection, DeliveryType, Email,
    Order, OrderId, OrderItem, OrderStatus, PaymentMethod, Phone, PriceQuote, ProductId, ZoneId,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::RepositoryError;

const ORDER_COLUMNS: &str = "id, customer_name, customer_phone, customer_email, address, \
     city_id, zone_id, area_id, delivery_type, payment_method, note, subtotal, delivery_price, \
     cod_charge, promo_discount, delivery_charge, total, status, consignment_id, courier_status, \
     courier_invoice_id, courier_fee, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    customer_name: String,
    customer_phone: String,
    customer_email: Option<String>,
    address: String,
    city_id: i64,
    zone_id: i64,
    area_id: i64,
    delivery_type: DeliveryType,
    payment_method: PaymentMethod,
    note: Option<String>,
    subtotal: Decimal,
    delivery_price: Decimal,
    cod_charge: Decimal,
    promo_discount: Decimal,
    delivery_charge: Decimal,
    total: Decimal,
    status: OrderStatus,
    consignment_id: Option<String>,
    courier_status: Option<String>,
    courier_invoice_id: Option<String>,
    courier_fee: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i64,
    product_id: i64,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    size: Option<String>,
    color: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative quantity on order {}", row.order_id))
        })?;

        Ok(Self {
            product_id: ProductId::new(row.product_id),
            name: row.name,
            quantity,
            unit_price: row.unit_price,
            size: row.size,
            color: row.color,
        })
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
        let phone = Phone::parse(&self.customer_phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid phone in database: {e}"))
        })?;
        let email = self
            .customer_email
            .as_deref()
            .map(Email::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
            })?;

        let merchant_order_id = self.id.to_string();
        let shipment = self.consignment_id.map(|consignment_id| CourierShipment {
            consignment_id,
            merchant_order_id,
            status: self.courier_status.unwrap_or_default(),
            invoice_id: self.courier_invoice_id,
            delivery_fee: self.courier_fee,
        });

        Ok(Order {
            id: OrderId::new(self.id),
            contact: CustomerContact {
                name: self.customer_name,
                phone,
                email,
            },
            items,
            subtotal: self.subtotal,
            delivery_quote: PriceQuote {
                price: self.delivery_price,
                cod_charge: self.cod_charge,
                promo_discount: self.promo_discount,
                total_price: self.delivery_charge,
            },
            total: self.total,
            payment_method: self.payment_method,
            address: self.address,
            delivery: DeliverySelection {
                city_id: CityId::new(self.city_id),
                zone_id: ZoneId::new(self.zone_id),
                area_id: AreaId::new(self.area_id),
                delivery_type: self.delivery_type,
            },
            note: self.note,
            status: self.status,
            shipment,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// =============================================================================
// Input
// =============================================================================

/// A fully priced order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Client cart the order was placed from.
    pub cart_id: Option<Uuid>,
    pub contact: CustomerContact,
    pub address: String,
    pub delivery: DeliverySelection,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    pub items: Vec<OrderItem>,
    pub subtotal: Decimal,
    pub delivery_quote: PriceQuote,
    pub total: Decimal,
}

// =============================================================================
// Store seam
// =============================================================================

/// Order persistence used by the checkout and fulfillment services.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order and all of its lines atomically, status `pending`.
    ///
    /// If an order for the same `cart_id` already exists, that order is
    /// returned and nothing is written.
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    /// The order placed from `cart_id`, if any.
    async fn find_by_cart(&self, cart_id: Uuid) -> Result<Option<Order>, RepositoryError>;

    /// Load an order with its lines.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Attach a courier consignment. An order that already has one is returned unchanged.
    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &CourierShipment,
    ) -> Result<Order, RepositoryError>;

    /// Store the courier's latest status string verbatim.
    async fn set_courier_status(&self, id: OrderId, status: &str) -> Result<(), RepositoryError>;
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load lines for every order in `rows` and assemble the orders.
    async fn hydrate(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT order_id, product_id, name, unit_price, quantity, size, color
            FROM order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, position
            ",
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id;
            items.entry(order_id).or_default().push(row.try_into()?);
        }

        rows.into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_order(lines)
            })
            .collect()
    }

    async fn fetch(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// List orders newest first, optionally filtered by status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored contact is invalid.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<OrderStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r"
            SELECT {ORDER_COLUMNS} FROM customer_order
            WHERE $1::order_status IS NULL OR status = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        self.hydrate(rows).await
    }

    /// Move an order to `next`, enforcing the status transition table.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current: Option<OrderStatus> =
            sqlx::query_scalar("SELECT status FROM customer_order WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let current = current.ok_or(RepositoryError::NotFound)?;
        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot move order from {current} to {next}"
            )));
        }

        sqlx::query("UPDATE customer_order SET status = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, from = %current, to = %next, "Order status changed");

        self.fetch(id).await?.ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderStore for OrderRepository<'_> {
    #[instrument(skip(self, order), fields(lines = order.items.len()))]
    async fn insert(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id: Option<i64> = sqlx::query_scalar(
            r"
            INSERT INTO customer_order (
                cart_id, customer_name, customer_phone, customer_email, address,
                city_id, zone_id, area_id, delivery_type, payment_method, note,
                subtotal, delivery_price, cod_charge, promo_discount, delivery_charge, total,
                status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    'pending')
            ON CONFLICT (cart_id) WHERE cart_id IS NOT NULL DO NOTHING
            RETURNING id
            ",
        )
        .bind(order.cart_id)
        .bind(&order.contact.name)
        .bind(order.contact.phone.as_str())
        .bind(order.contact.email.as_ref().map(Email::as_str))
        .bind(&order.address)
        .bind(order.delivery.city_id)
        .bind(order.delivery.zone_id)
        .bind(order.delivery.area_id)
        .bind(order.delivery.delivery_type)
        .bind(order.payment_method)
        .bind(&order.note)
        .bind(order.subtotal)
        .bind(order.delivery_quote.price)
        .bind(order.delivery_quote.cod_charge)
        .bind(order.delivery_quote.promo_discount)
        .bind(order.delivery_quote.total_price)
        .bind(order.total)
        .fetch_optional(&mut *tx)
        .await?;

        // A concurrent checkout for the same cart won the insert
        let Some(id) = id else {
            tx.rollback().await?;
            let cart_id = order.cart_id.ok_or(RepositoryError::NotFound)?;
            tracing::info!(%cart_id, "Order already placed for cart");
            return self.find_by_cart(cart_id).await?.ok_or(RepositoryError::NotFound);
        };

        for (position, item) in order.items.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| RepositoryError::Conflict("too many order lines".to_owned()))?;
            let quantity = i32::try_from(item.quantity)
                .map_err(|_| RepositoryError::Conflict("quantity out of range".to_owned()))?;

            sqlx::query(
                r"
                INSERT INTO order_item (order_id, position, product_id, name, unit_price,
                                        quantity, size, color)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ",
            )
            .bind(id)
            .bind(position)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.unit_price)
            .bind(quantity)
            .bind(&item.size)
            .bind(&item.color)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = id, total = %order.total, "Order persisted");

        self.fetch(OrderId::new(id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.fetch(id).await
    }

    async fn find_by_cart(&self, cart_id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM customer_order WHERE cart_id = $1"
        ))
        .bind(cart_id)
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, shipment), fields(consignment_id = %shipment.consignment_id))]
    async fn record_shipment(
        &self,
        id: OrderId,
        shipment: &CourierShipment,
    ) -> Result<Order, RepositoryError> {
        let updated = sqlx::query(
            r"
            UPDATE customer_order
            SET consignment_id = $2, courier_status = $3, courier_invoice_id = $4,
                courier_fee = $5, updated_at = now()
            WHERE id = $1 AND consignment_id IS NULL
            ",
        )
        .bind(id)
        .bind(&shipment.consignment_id)
        .bind(&shipment.status)
        .bind(&shipment.invoice_id)
        .bind(shipment.delivery_fee)
        .execute(self.pool)
        .await
        .map_err(|e| super::map_constraint(e, "consignment already recorded", "invalid order"))?;

        if updated.rows_affected() == 0 {
            tracing::debug!(order_id = %id, "Order already has a consignment");
        }

        self.fetch(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn set_courier_status(&self, id: OrderId, status: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE customer_order SET courier_status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
