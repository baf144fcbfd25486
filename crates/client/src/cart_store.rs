//! Client-local cart persistence.
//!
//! The cart is stored as one JSON document. Every mutation writes the whole
//! snapshot back, so a restart rebuilds the exact same cart. Loading never
//! fails: a missing, unreadable or corrupt snapshot yields a fresh empty cart.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

use crumb_core::{AddOptions, Cart, CartKey, Product};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Durable storage for the serialized cart.
pub trait CartStorage {
    /// Read the stored snapshot, `None` if nothing was stored yet.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the backing store cannot be read.
    fn load(&self) -> Result<Option<String>, ClientError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the backing store cannot be written.
    fn save(&self, snapshot: &str) -> Result<(), ClientError>;
}

/// Cart snapshot kept in a single JSON file.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CartStorage for FileStorage {
    fn load(&self) -> Result<Option<String>, ClientError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, snapshot: &str) -> Result<(), ClientError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(snapshot.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: RefCell<Option<String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `snapshot`.
    #[must_use]
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            snapshot: RefCell::new(Some(snapshot.into())),
        }
    }

    /// The last saved snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.snapshot.borrow().clone()
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, ClientError> {
        Ok(self.snapshot.borrow().clone())
    }

    fn save(&self, snapshot: &str) -> Result<(), ClientError> {
        *self.snapshot.borrow_mut() = Some(snapshot.to_owned());
        Ok(())
    }
}

/// The shopper's cart, written through to storage on every change.
#[derive(Debug)]
pub struct CartStore<S: CartStorage> {
    storage: S,
    cart: Cart,
}

impl<S: CartStorage> CartStore<S> {
    /// Load the stored cart, or start an empty one.
    pub fn open(storage: S) -> Self {
        let cart = match storage.load() {
            Ok(Some(snapshot)) => match serde_json::from_str::<Cart>(&snapshot) {
                Ok(cart) => {
                    debug!(cart_id = %cart.id(), lines = cart.items().len(), "Cart restored");
                    cart
                }
                Err(err) => {
                    warn!(error = %err, "Stored cart is corrupt, starting empty");
                    Cart::new()
                }
            },
            Ok(None) => Cart::new(),
            Err(err) => {
                warn!(error = %err, "Could not read stored cart, starting empty");
                Cart::new()
            }
        };

        Self { storage, cart }
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Add one unit of `product`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the snapshot cannot be saved. The in-memory
    /// cart keeps the change either way.
    pub fn add_item(&mut self, product: &Product, options: AddOptions) -> Result<(), ClientError> {
        self.cart.add_item(product, options);
        self.persist()
    }

    /// Drop the line for `key` entirely.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the snapshot cannot be saved.
    pub fn remove_item(&mut self, key: &CartKey) -> Result<(), ClientError> {
        self.cart.remove_item(key);
        self.persist()
    }

    /// Set a line's quantity. Quantities below 1 change nothing.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the snapshot cannot be saved.
    pub fn update_quantity(&mut self, key: &CartKey, quantity: u32) -> Result<bool, ClientError> {
        if !self.cart.update_quantity(key, quantity) {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Replace the cart with a fresh empty one.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the snapshot cannot be saved.
    pub fn clear(&mut self) -> Result<(), ClientError> {
        self.cart.clear();
        self.persist()
    }

    fn persist(&self) -> Result<(), ClientError> {
        let snapshot = serde_json::to_string(&self.cart)?;
        self.storage.save(&snapshot)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use crumb_core::{CategoryId, ProductId};
    use rust_decimal::Decimal;

    use super::*;

    fn product(id: i64, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("bun-{id}"),
            name: format!("Bun {id}"),
            description: String::new(),
            price: Decimal::from(price),
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

    #[test]
    fn test_every_mutation_is_saved() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_item(&product(1, 100), AddOptions::default()).unwrap();
        store.add_item(&product(1, 100), AddOptions::default()).unwrap();

        let saved: Cart = serde_json::from_str(&store.storage().snapshot().unwrap()).unwrap();
        assert_eq!(&saved, store.cart());
        assert_eq!(saved.subtotal(), Decimal::from(200));
    }

    #[test]
    fn test_reopen_restores_identical_cart() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_item(&product(1, 100), AddOptions::default()).unwrap();
        store
            .add_item(
                &product(2, 50),
                AddOptions {
                    size: Some("large".into()),
                    ..AddOptions::default()
                },
            )
            .unwrap();
        let before = store.cart().clone();

        let snapshot = store.storage().snapshot().unwrap();
        let reopened = CartStore::open(MemoryStorage::with_snapshot(snapshot));
        assert_eq!(reopened.cart(), &before);
    }

    #[test]
    fn test_corrupt_snapshot_starts_empty() {
        for junk in ["", "not json", r#"{"id": 5}"#, r#"{"items": []}"#] {
            let store = CartStore::open(MemoryStorage::with_snapshot(junk));
            assert!(store.cart().is_empty(), "{junk}");
        }
    }

    #[test]
    fn test_zero_quantity_update_is_noop() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_item(&product(1, 100), AddOptions::default()).unwrap();
        let saved = store.storage().snapshot();

        let key = CartKey::product(ProductId::new(1));
        assert!(!store.update_quantity(&key, 0).unwrap());
        assert_eq!(store.storage().snapshot(), saved);
        assert_eq!(store.cart().line(&key).unwrap().quantity, 1);
    }

    #[test]
    fn test_clear_issues_new_cart_id() {
        let mut store = CartStore::open(MemoryStorage::new());
        store.add_item(&product(1, 100), AddOptions::default()).unwrap();
        let old_id = store.cart().id();

        store.clear().unwrap();
        assert!(store.cart().is_empty());
        assert_ne!(store.cart().id(), old_id);
    }
}
