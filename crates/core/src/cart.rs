//! The shopping cart reducer.
//!
//! A cart is an ordered list of line items keyed by
//! `(product_id, size, color)`. Adding an item whose key already exists bumps
//! that line's quantity; distinct variants are distinct lines. The subtotal
//! is always derived from the lines and recomputed after every mutation.
//!
//! Every mutation builds the new line list off to the side and swaps it in
//! whole, so an observer never sees a half-applied edit.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::Product;
use crate::order::CheckoutLine;
use crate::types::ProductId;

/// Identity of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CartKey {
    pub product_id: ProductId,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl CartKey {
    /// Key for a product without variant discriminators.
    #[must_use]
    pub const fn product(product_id: ProductId) -> Self {
        Self {
            product_id,
            size: None,
            color: None,
        }
    }
}

/// Optional overrides when adding a product to the cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOptions {
    /// Unit price to snapshot instead of the product's list price.
    pub price: Option<Decimal>,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// A single cart line. The price is snapshotted when the line is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CartItem {
    fn matches(&self, key: &CartKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// `price * quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Reasons a stored cart snapshot is rejected on load.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartSnapshotError {
    #[error("line for product {0} has quantity 0")]
    ZeroQuantity(ProductId),
    #[error("line for product {0} has a negative price")]
    NegativePrice(ProductId),
    #[error("duplicate line for product {0}")]
    DuplicateLine(ProductId),
}

/// Wire/storage form of a cart. `subtotal` is written for readers but is
/// ignored on the way back in.
#[derive(Serialize, Deserialize)]
struct CartSnapshot {
    id: Uuid,
    items: Vec<CartItem>,
    #[serde(default)]
    subtotal: Option<Decimal>,
}

/// A client-owned shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CartSnapshot", into = "CartSnapshot")]
pub struct Cart {
    id: Uuid,
    items: Vec<CartItem>,
    subtotal: Decimal,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    /// A fresh, empty cart with a newly generated opaque id.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            items: Vec::new(),
            subtotal: Decimal::ZERO,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Sum of `price * quantity` over all lines.
    #[must_use]
    pub const fn subtotal(&self) -> Decimal {
        self.subtotal
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Find the line for `key`, if any.
    #[must_use]
    pub fn line(&self, key: &CartKey) -> Option<&CartItem> {
        self.items.iter().find(|item| item.matches(key))
    }

    /// Add one unit of `product`.
    ///
    /// An existing line with the same key gains one unit; otherwise a new
    /// line is appended at quantity 1 with the (possibly overridden) price.
    pub fn add_item(&mut self, product: &Product, options: AddOptions) {
        let key = CartKey {
            product_id: product.id,
            size: options.size,
            color: options.color,
        };

        let mut lines = self.items.clone();
        if let Some(line) = lines.iter_mut().find(|item| item.matches(&key)) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            lines.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                price: options.price.unwrap_or(product.price),
                image: product.image.clone(),
                quantity: 1,
                size: key.size,
                color: key.color,
            });
        }
        self.replace_lines(lines);
    }

    /// Drop the line for `key` entirely. No-op if absent.
    pub fn remove_item(&mut self, key: &CartKey) {
        if self.line(key).is_none() {
            return;
        }
        let lines = self
            .items
            .iter()
            .filter(|item| !item.matches(key))
            .cloned()
            .collect();
        self.replace_lines(lines);
    }

    /// Set the quantity of the line for `key`.
    ///
    /// Quantities below 1 are ignored (use [`Cart::remove_item`] to delete),
    /// as are keys with no line. Returns whether the cart changed.
    pub fn update_quantity(&mut self, key: &CartKey, quantity: u32) -> bool {
        if quantity < 1 || self.line(key).is_none() {
            return false;
        }
        let lines = self
            .items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                if item.matches(key) {
                    item.quantity = quantity;
                }
                item
            })
            .collect();
        self.replace_lines(lines);
        true
    }

    /// Replace this cart with a fresh empty one carrying a new id.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Snapshot the lines for checkout submission.
    #[must_use]
    pub fn checkout_lines(&self) -> Vec<CheckoutLine> {
        self.items
            .iter()
            .map(|item| CheckoutLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.price,
                size: item.size.clone(),
                color: item.color.clone(),
            })
            .collect()
    }

    fn replace_lines(&mut self, lines: Vec<CartItem>) {
        self.subtotal = Self::derive_subtotal(&lines);
        self.items = lines;
    }

    fn derive_subtotal(lines: &[CartItem]) -> Decimal {
        lines.iter().map(CartItem::line_total).sum()
    }
}

impl TryFrom<CartSnapshot> for Cart {
    type Error = CartSnapshotError;

    fn try_from(snapshot: CartSnapshot) -> Result<Self, Self::Error> {
        for (index, item) in snapshot.items.iter().enumerate() {
            if item.quantity == 0 {
                return Err(CartSnapshotError::ZeroQuantity(item.product_id));
            }
            if item.price.is_sign_negative() {
                return Err(CartSnapshotError::NegativePrice(item.product_id));
            }
            let key = CartKey {
                product_id: item.product_id,
                size: item.size.clone(),
                color: item.color.clone(),
            };
            if snapshot.items.iter().skip(index + 1).any(|other| other.matches(&key)) {
                return Err(CartSnapshotError::DuplicateLine(item.product_id));
            }
        }

        let mut cart = Self {
            id: snapshot.id,
            items: Vec::new(),
            subtotal: Decimal::ZERO,
        };
        cart.replace_lines(snapshot.items);
        Ok(cart)
    }
}

impl From<Cart> for CartSnapshot {
    fn from(cart: Cart) -> Self {
        Self {
            id: cart.id,
            items: cart.items,
            subtotal: Some(cart.subtotal),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::CategoryId;

    fn product(id: i64, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("product-{id}"),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::from(price),
            image: Some(format!("/img/{id}.jpg")),
            category_id: CategoryId::new(1),
            featured: false,
            is_bestseller: false,
            is_new: false,
            is_popular: false,
            dietary_options: std::collections::BTreeSet::new(),
            created_at: None,
        }
    }

    fn sized(size: &str) -> AddOptions {
        AddOptions {
            size: Some(size.to_owned()),
            ..AddOptions::default()
        }
    }

    #[test]
    fn test_repeated_adds_accumulate_quantity() {
        let mut cart = Cart::new();
        let loaf = product(1, 120);
        let bun = product(2, 35);

        for round in 0..5 {
            cart.add_item(&loaf, AddOptions::default());
            if round % 2 == 0 {
                cart.add_item(&bun, sized("small"));
            }
        }

        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.line(&CartKey::product(loaf.id)).unwrap().quantity, 5);
        let bun_key = CartKey {
            product_id: bun.id,
            size: Some("small".into()),
            color: None,
        };
        assert_eq!(cart.line(&bun_key).unwrap().quantity, 3);
        assert_eq!(cart.subtotal(), Decimal::from(5 * 120 + 3 * 35));
        assert_eq!(cart.item_count(), 8);
    }

    #[test]
    fn test_variants_are_distinct_lines() {
        let mut cart = Cart::new();
        let cake = product(7, 900);
        cart.add_item(&cake, sized("1lb"));
        cart.add_item(&cake, sized("2lb"));
        cart.add_item(&cake, AddOptions::default());
        assert_eq!(cart.items().len(), 3);
    }

    #[test]
    fn test_price_override_is_snapshotted() {
        let mut cart = Cart::new();
        let mut cake = product(7, 900);
        cart.add_item(
            &cake,
            AddOptions {
                price: Some(Decimal::from(1500)),
                size: Some("2lb".into()),
                color: None,
            },
        );
        cake.price = Decimal::from(1);
        cart.add_item(&cake, sized("2lb"));

        let line = &cart.items()[0];
        assert_eq!(line.price, Decimal::from(1500));
        assert_eq!(line.quantity, 2);
        assert_eq!(cart.subtotal(), Decimal::from(3000));
    }

    #[test]
    fn test_remove_then_add_starts_fresh() {
        let mut cart = Cart::new();
        let loaf = product(1, 100);
        cart.add_item(&loaf, AddOptions::default());
        cart.add_item(&loaf, AddOptions::default());
        cart.remove_item(&CartKey::product(loaf.id));
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);

        cart.add_item(&loaf, AddOptions::default());
        assert_eq!(cart.items()[0].quantity, 1);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, 10), AddOptions::default());
        let before = cart.clone();
        cart.remove_item(&CartKey::product(ProductId::new(99)));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_update_quantity_zero_is_noop() {
        let mut cart = Cart::new();
        let loaf = product(1, 100);
        cart.add_item(&loaf, AddOptions::default());
        let before = cart.clone();

        assert!(!cart.update_quantity(&CartKey::product(loaf.id), 0));
        assert_eq!(cart, before);

        assert!(cart.update_quantity(&CartKey::product(loaf.id), 4));
        assert_eq!(cart.subtotal(), Decimal::from(400));
        assert!(!cart.update_quantity(&CartKey::product(ProductId::new(2)), 4));
    }

    #[test]
    fn test_clear_issues_new_id() {
        let mut cart = Cart::new();
        let old_id = cart.id();
        cart.add_item(&product(1, 10), AddOptions::default());
        cart.clear();
        assert!(cart.is_empty());
        assert_ne!(cart.id(), old_id);
    }

    #[test]
    fn test_snapshot_round_trip_and_subtotal_rederived() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, 100), AddOptions::default());
        cart.add_item(&product(1, 100), AddOptions::default());
        cart.add_item(&product(2, 50), sized("large"));

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
        assert_eq!(restored.subtotal(), Decimal::from(250));

        let mut tampered: serde_json::Value = serde_json::from_str(&json).unwrap();
        tampered["subtotal"] = serde_json::json!("1");
        let restored: Cart = serde_json::from_value(tampered).unwrap();
        assert_eq!(restored.subtotal(), Decimal::from(250));
    }

    #[test]
    fn test_snapshot_rejects_invalid_lines() {
        let id = Uuid::new_v4();
        let zero = serde_json::json!({
            "id": id,
            "items": [{"product_id": 1, "name": "x", "price": "1", "image": null, "quantity": 0}]
        });
        assert!(serde_json::from_value::<Cart>(zero).is_err());

        let duplicate = serde_json::json!({
            "id": id,
            "items": [
                {"product_id": 1, "name": "x", "price": "1", "image": null, "quantity": 1},
                {"product_id": 1, "name": "x", "price": "1", "image": null, "quantity": 2}
            ]
        });
        assert!(serde_json::from_value::<Cart>(duplicate).is_err());
    }
}
