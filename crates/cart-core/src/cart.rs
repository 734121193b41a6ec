//! # Cart Store
//!
//! The single owner of cart contents. All mutations go through
//! [`CartStore`], which merges repeated additions of the same product,
//! writes the item list through a [`KeyValueStore`] after every change, and
//! notifies subscribers with a [`CartEvent`].
//!
//! The drawer flag (`is_open`) lives next to the items but is never
//! persisted: a rehydrated cart always starts closed.

use crate::error::CartResult;
use crate::product::{Price, Product};
use crate::storage::KeyValueStore;
use crate::summary::{self, CartSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Storage key the item list is persisted under
pub const CART_STORAGE_KEY: &str = "mariachi-cart-storage";

/// One product-and-quantity pairing in the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product snapshot taken when the item was added
    pub product: Product,

    /// Quantity, always ≥ 1 while the item is in the cart
    pub quantity: u32,

    /// When the product was first added
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(product: Product, quantity: u32) -> Self {
        Self {
            product,
            quantity,
            added_at: Utc::now(),
        }
    }

    pub fn product_id(&self) -> &str {
        &self.product.id
    }

    /// Unit price × quantity
    pub fn line_total(&self) -> Price {
        self.product.unit_price().times(self.quantity)
    }
}

/// Cart contents plus the mini-cart drawer flag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub items: Vec<CartItem>,
    pub is_open: bool,
}

/// Shape read from durable storage. `is_open` is deliberately absent.
#[derive(Debug, Default, Deserialize)]
struct PersistedCart {
    #[serde(default)]
    items: Vec<CartItem>,
}

#[derive(Serialize)]
struct PersistedCartRef<'a> {
    items: &'a [CartItem],
}

/// Change notification emitted after a committed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    Added {
        product_id: String,
        product_name: String,
        quantity: u32,
    },
    Updated {
        product_id: String,
        quantity: u32,
    },
    Removed {
        product_id: String,
    },
    Cleared,
}

type Listener = Box<dyn Fn(&CartEvent, &CartState) + Send + Sync>;

/// Cart store backed by a key-value store
pub struct CartStore<S: KeyValueStore> {
    state: CartState,
    storage: S,
    listeners: Vec<Listener>,
}

impl<S: KeyValueStore> std::fmt::Debug for CartStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S: KeyValueStore> CartStore<S> {
    /// Create a store, rehydrating items from `storage` if present.
    ///
    /// A missing key yields an empty cart. Unreadable JSON is discarded with
    /// a warning; a failing storage backend is an error.
    pub fn load(storage: S) -> CartResult<Self> {
        let items = match storage.get(CART_STORAGE_KEY)? {
            Some(raw) => match serde_json::from_str::<PersistedCart>(&raw) {
                Ok(persisted) => persisted.items,
                Err(e) => {
                    warn!("Discarding unreadable cart storage: {}", e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        debug!("Rehydrated cart with {} items", items.len());

        Ok(Self {
            state: CartState {
                items,
                is_open: false,
            },
            storage,
            listeners: Vec::new(),
        })
    }

    /// Register an observer for committed mutations
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&CartEvent, &CartState) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ==========================================
    // Item management
    // ==========================================

    /// Add `quantity` of `product`, merging into an existing line.
    /// A zero quantity changes nothing.
    pub fn add_item(&mut self, product: &Product, quantity: u32) -> CartResult<()> {
        if quantity == 0 {
            return Ok(());
        }

        let mut items = self.state.items.clone();

        match items.iter_mut().find(|item| item.product.id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(quantity),
            None => items.push(CartItem::new(product.clone(), quantity)),
        }

        self.commit(
            items,
            CartEvent::Added {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity,
            },
        )
    }

    /// Remove the line for `product_id`; absent ids are a no-op
    pub fn remove_item(&mut self, product_id: &str) -> CartResult<()> {
        if !self.has_item(product_id) {
            return Ok(());
        }

        let items = self
            .state
            .items
            .iter()
            .filter(|item| item.product.id != product_id)
            .cloned()
            .collect();

        self.commit(
            items,
            CartEvent::Removed {
                product_id: product_id.to_string(),
            },
        )
    }

    /// Replace the quantity of a line. Zero or negative removes the line.
    /// Stock limits are enforced by the catalog layer before this call.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CartResult<()> {
        if quantity <= 0 {
            return self.remove_item(product_id);
        }
        if !self.has_item(product_id) {
            return Ok(());
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let items = self
            .state
            .items
            .iter()
            .cloned()
            .map(|mut item| {
                if item.product.id == product_id {
                    item.quantity = quantity;
                }
                item
            })
            .collect();

        self.commit(
            items,
            CartEvent::Updated {
                product_id: product_id.to_string(),
                quantity,
            },
        )
    }

    /// Empty the cart. Call once per confirmed payment.
    pub fn clear_cart(&mut self) -> CartResult<()> {
        self.commit(Vec::new(), CartEvent::Cleared)
    }

    // ==========================================
    // Drawer state
    // ==========================================

    pub fn toggle_cart(&mut self) {
        self.state.is_open = !self.state.is_open;
    }

    pub fn open_cart(&mut self) {
        self.state.is_open = true;
    }

    pub fn close_cart(&mut self) {
        self.state.is_open = false;
    }

    // ==========================================
    // Queries
    // ==========================================

    pub fn state(&self) -> &CartState {
        &self.state
    }

    pub fn items(&self) -> &[CartItem] {
        &self.state.items
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn is_empty(&self) -> bool {
        self.state.items.is_empty()
    }

    /// Sum of all quantities
    pub fn item_count(&self) -> u32 {
        summary::item_count(&self.state.items)
    }

    pub fn has_item(&self, product_id: &str) -> bool {
        self.state
            .items
            .iter()
            .any(|item| item.product.id == product_id)
    }

    pub fn get_item(&self, product_id: &str) -> Option<&CartItem> {
        self.state
            .items
            .iter()
            .find(|item| item.product.id == product_id)
    }

    /// Freshly computed summary
    pub fn summary(&self) -> CartSummary {
        CartSummary::calculate(&self.state.items)
    }

    pub fn subtotal(&self) -> Price {
        self.summary().subtotal
    }

    pub fn total(&self) -> Price {
        self.summary().total
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Persist `items`, then make them current and notify subscribers.
    /// A storage failure leaves the in-memory cart untouched.
    fn commit(&mut self, items: Vec<CartItem>, event: CartEvent) -> CartResult<()> {
        let raw = serde_json::to_string(&PersistedCartRef { items: &items })?;
        self.storage.set(CART_STORAGE_KEY, &raw)?;
        self.state.items = items;

        debug!(?event, items = self.state.items.len(), "Cart updated");
        for listener in &self.listeners {
            listener(&event, &self.state);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CartError;
    use crate::product::Currency;
    use crate::storage::MemoryStore;
    use std::sync::{Arc, Mutex};

    fn product(id: &str, price: f64) -> Product {
        Product::simple(id, format!("Product {}", id), price, Currency::MXN)
    }

    fn empty_cart() -> CartStore<MemoryStore> {
        CartStore::load(MemoryStore::new()).unwrap()
    }

    /// Storage that refuses every write
    struct FullStore;

    impl KeyValueStore for FullStore {
        fn get(&self, _key: &str) -> CartResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> CartResult<()> {
            Err(CartError::Storage("quota exceeded".to_string()))
        }

        fn remove(&self, _key: &str) -> CartResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = empty_cart();
        let p = product("p1", 100.0);

        cart.add_item(&p, 2).unwrap();
        cart.add_item(&p, 3).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get_item("p1").unwrap().quantity, 5);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_add_keeps_insertion_order_and_added_at() {
        let mut cart = empty_cart();
        cart.add_item(&product("a", 10.0), 1).unwrap();
        cart.add_item(&product("b", 10.0), 1).unwrap();
        let first_added = cart.get_item("a").unwrap().added_at;

        cart.add_item(&product("a", 10.0), 1).unwrap();

        let ids: Vec<_> = cart.items().iter().map(|i| i.product_id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(cart.get_item("a").unwrap().added_at, first_added);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", 100.0), 1).unwrap();
        let before = cart.state().clone();

        cart.remove_item("missing").unwrap();

        assert_eq!(cart.state(), &before);
    }

    #[test]
    fn test_zero_quantity_equals_remove() {
        let mut a = empty_cart();
        let mut b = empty_cart();
        for cart in [&mut a, &mut b] {
            cart.add_item(&product("p1", 100.0), 2).unwrap();
            cart.add_item(&product("p2", 50.0), 1).unwrap();
        }

        a.update_quantity("p1", 0).unwrap();
        b.remove_item("p1").unwrap();

        assert_eq!(a.items(), b.items());
        assert!(!a.has_item("p1"));

        a.update_quantity("p2", -3).unwrap();
        assert!(a.is_empty());
    }

    #[test]
    fn test_update_quantity_replaces() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", 100.0), 2).unwrap();

        cart.update_quantity("p1", 7).unwrap();
        assert_eq!(cart.get_item("p1").unwrap().quantity, 7);

        cart.update_quantity("missing", 4).unwrap();
        assert_eq!(cart.items().len(), 1);
    }

    #[test]
    fn test_drawer_flags() {
        let mut cart = empty_cart();
        assert!(!cart.is_open());
        cart.toggle_cart();
        assert!(cart.is_open());
        cart.close_cart();
        assert!(!cart.is_open());
        cart.open_cart();
        assert!(cart.is_open());
    }

    #[test]
    fn test_persistence_roundtrip_resets_drawer() {
        let storage = MemoryStore::new();
        let mut cart = CartStore::load(storage.clone()).unwrap();
        cart.add_item(&product("p1", 100.0), 2).unwrap();
        cart.add_item(&product("p2", 50.0), 1).unwrap();
        cart.open_cart();

        let reloaded = CartStore::load(storage).unwrap();

        let before: Vec<_> = cart.items().iter().map(|i| (i.product_id(), i.quantity)).collect();
        let after: Vec<_> = reloaded.items().iter().map(|i| (i.product_id(), i.quantity)).collect();
        assert_eq!(before, after);
        assert!(!reloaded.is_open());
    }

    #[test]
    fn test_persisted_shape_excludes_drawer() {
        let storage = MemoryStore::new();
        let mut cart = CartStore::load(storage.clone()).unwrap();
        cart.add_item(&product("p1", 100.0), 1).unwrap();
        cart.toggle_cart();

        let raw = storage.get(CART_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(value["items"][0]["product"]["_id"], "p1");
        assert_eq!(value["items"][0]["quantity"], 1);
        assert!(value["items"][0]["addedAt"].is_string());
    }

    #[test]
    fn test_unreadable_storage_starts_empty() {
        let storage = MemoryStore::new();
        storage.set(CART_STORAGE_KEY, "{not json").unwrap();

        let cart = CartStore::load(storage).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_storage_failure_aborts_mutation() {
        let mut cart = CartStore::load(FullStore).unwrap();

        let result = cart.add_item(&product("p1", 100.0), 1);

        assert!(matches!(result, Err(CartError::Storage(_))));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_cart_persists_empty_list() {
        let storage = MemoryStore::new();
        let mut cart = CartStore::load(storage.clone()).unwrap();
        cart.add_item(&product("p1", 100.0), 1).unwrap();

        cart.clear_cart().unwrap();

        assert!(cart.is_empty());
        assert!(CartStore::load(storage).unwrap().is_empty());
    }

    #[test]
    fn test_subscribers_receive_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut cart = empty_cart();
        cart.subscribe(move |event, state| {
            sink.lock().unwrap().push((event.clone(), state.items.len()));
        });

        cart.add_item(&product("p1", 100.0), 1).unwrap();
        cart.update_quantity("p1", 3).unwrap();
        cart.remove_item("p1").unwrap();
        cart.remove_item("p1").unwrap();
        cart.clear_cart().unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(
            seen[0],
            (
                CartEvent::Added {
                    product_id: "p1".into(),
                    product_name: "Product p1".into(),
                    quantity: 1
                },
                1
            )
        );
        assert_eq!(
            seen[1].0,
            CartEvent::Updated {
                product_id: "p1".into(),
                quantity: 3
            }
        );
        assert_eq!(seen[2], (CartEvent::Removed { product_id: "p1".into() }, 0));
        assert_eq!(seen[3].0, CartEvent::Cleared);
    }

    #[test]
    fn test_store_summary_is_fresh() {
        let mut cart = empty_cart();
        cart.add_item(&product("p1", 100.0), 2).unwrap();
        cart.add_item(&product("p2", 50.0), 1).unwrap();
        assert_eq!(cart.total(), Price::new(440.0, Currency::MXN));

        cart.remove_item("p2").unwrap();
        assert_eq!(cart.subtotal(), Price::new(200.0, Currency::MXN));
        assert_eq!(cart.summary().item_count, 2);
    }

    #[test]
    fn test_summary_of_oversized_cart_does_not_overflow() {
        let mut cart = empty_cart();
        cart.add_item(&product("vault", 100_000_000.0), u32::MAX).unwrap();
        cart.add_item(&product("vault", 100_000_000.0), 1).unwrap();

        assert_eq!(cart.item_count(), u32::MAX);
        assert_eq!(cart.subtotal().amount, i64::MAX);
        assert_eq!(cart.total().amount, i64::MAX);
    }
}
