//! File-backed cart persistence.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;

use crumb_client::{CartStorage, CartStore, FileStorage};
use crumb_core::{AddOptions, CartKey, CategoryId, Product, ProductId};
use rust_decimal::Decimal;

fn baguette() -> Product {
    Product {
        id: ProductId::new(7),
        slug: "baguette".into(),
        name: "Baguette".into(),
        description: String::new(),
        price: Decimal::new(14050, 2),
        image: None,
        category_id: CategoryId::new(2),
        featured: false,
        is_bestseller: true,
        is_new: false,
        is_popular: false,
        dietary_options: BTreeSet::new(),
        created_at: None,
    }
}

#[test]
fn test_cart_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cart.json");

    let mut store = CartStore::open(FileStorage::new(&path));
    store.add_item(&baguette(), AddOptions::default()).unwrap();
    store
        .update_quantity(&CartKey::product(ProductId::new(7)), 3)
        .unwrap();
    let before = store.cart().clone();
    drop(store);

    let reopened = CartStore::open(FileStorage::new(&path));
    assert_eq!(reopened.cart(), &before);
    assert_eq!(reopened.cart().subtotal(), Decimal::new(42150, 2));
}

#[test]
fn test_missing_file_is_empty_cart() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("cart.json"));
    assert!(storage.load().unwrap().is_none());
    assert!(CartStore::open(storage).cart().is_empty());
}

#[test]
fn test_corrupt_file_is_replaced_on_next_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cart.json");
    std::fs::write(&path, "{ truncated").unwrap();

    let mut store = CartStore::open(FileStorage::new(&path));
    assert!(store.cart().is_empty());

    store.add_item(&baguette(), AddOptions::default()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("Baguette"));
    assert_eq!(CartStore::open(FileStorage::new(&path)).cart().item_count(), 1);
}
