//! # cart-wasm
//!
//! WebAssembly bindings for storefront-cart-rs.
//!
//! This crate provides the browser side of the cart:
//! - `WasmCart`, the cart store persisted to `localStorage`
//! - Summary and price formatting for the cart drawer
//! - The full-page redirect to a hosted checkout URL
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmCart, redirect_to_checkout } from 'storefront-cart-wasm';
//!
//! await init();
//!
//! const cart = new WasmCart();
//! cart.add_item(product, 1);
//! console.log(cart.summary().total);
//!
//! const request = cart.checkout_request('fan@example.com');
//! const res = await fetch('/api/stripe/create-checkout-session', { method: 'POST', body: JSON.stringify(request) });
//! redirect_to_checkout((await res.json()).data.url);
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use cart_core::{
    CartError, CartEvent, CartItem, CartResult, CartStore, CartSummary, CheckoutForm,
    CheckoutSessionRequest, Currency, KeyValueStore, MemoryStore, Navigator, Price, Product,
};
use serde::Serialize;
use std::collections::HashMap;
use wasm_bindgen::prelude::*;

// =============================================================================
// Storage
// =============================================================================

fn js_storage_error(err: JsValue) -> CartError {
    CartError::Storage(format!("localStorage: {:?}", err))
}

/// `window.localStorage`
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Open the window's localStorage. Fails outside a browser window or
    /// when storage is disabled (private mode, sandboxed iframes).
    pub fn open() -> CartResult<Self> {
        let window = web_sys::window()
            .ok_or_else(|| CartError::Storage("No window available".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(js_storage_error)?
            .ok_or_else(|| CartError::Storage("localStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> CartResult<Option<String>> {
        self.storage.get_item(key).map_err(js_storage_error)
    }

    fn set(&self, key: &str, value: &str) -> CartResult<()> {
        // Throws QuotaExceededError when full
        self.storage.set_item(key, value).map_err(js_storage_error)
    }

    fn remove(&self, key: &str) -> CartResult<()> {
        self.storage.remove_item(key).map_err(js_storage_error)
    }
}

/// localStorage when the browser offers it, otherwise a per-page memory map
pub enum BrowserStore {
    Local(LocalStorage),
    Memory(MemoryStore),
}

impl KeyValueStore for BrowserStore {
    fn get(&self, key: &str) -> CartResult<Option<String>> {
        match self {
            BrowserStore::Local(s) => s.get(key),
            BrowserStore::Memory(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> CartResult<()> {
        match self {
            BrowserStore::Local(s) => s.set(key, value),
            BrowserStore::Memory(s) => s.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> CartResult<()> {
        match self {
            BrowserStore::Local(s) => s.remove(key),
            BrowserStore::Memory(s) => s.remove(key),
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    Ok(value.serialize(&serializer)?)
}

fn log_event(event: &CartEvent, _state: &cart_core::CartState) {
    if let CartEvent::Added {
        product_name,
        quantity,
        ..
    } = event
    {
        web_sys::console::log_1(&JsValue::from_str(&format!(
            "{} agregado al carrito (x{})",
            product_name, quantity
        )));
    }
}

/// Browser cart store
#[wasm_bindgen]
pub struct WasmCart {
    store: CartStore<BrowserStore>,
}

#[wasm_bindgen]
impl WasmCart {
    /// Rehydrate from localStorage, falling back to memory when it is unavailable
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<WasmCart, JsError> {
        let backend = match LocalStorage::open() {
            Ok(local) => BrowserStore::Local(local),
            Err(e) => {
                web_sys::console::warn_1(&JsValue::from_str(&format!(
                    "Cart will not persist: {}",
                    e
                )));
                BrowserStore::Memory(MemoryStore::new())
            }
        };

        let mut store = CartStore::load(backend)?;
        store.subscribe(log_event);
        Ok(WasmCart { store })
    }

    /// Cart kept only for the lifetime of the page
    pub fn in_memory() -> Result<WasmCart, JsError> {
        Ok(Self::with_store(BrowserStore::Memory(MemoryStore::new()))?)
    }

    /// Add `quantity` of `product` (backend product JSON)
    pub fn add_item(&mut self, product: JsValue, quantity: u32) -> Result<(), JsError> {
        let product: Product = serde_wasm_bindgen::from_value(product)?;
        Ok(self.add_product(&product, quantity)?)
    }

    pub fn remove_item(&mut self, product_id: &str) -> Result<(), JsError> {
        Ok(self.store.remove_item(product_id)?)
    }

    /// Set the quantity of a line; zero or less removes it
    pub fn update_quantity(&mut self, product_id: &str, quantity: i32) -> Result<(), JsError> {
        Ok(self.store.update_quantity(product_id, i64::from(quantity))?)
    }

    pub fn clear_cart(&mut self) -> Result<(), JsError> {
        Ok(self.store.clear_cart()?)
    }

    pub fn toggle_cart(&mut self) {
        self.store.toggle_cart();
    }

    pub fn open_cart(&mut self) {
        self.store.open_cart();
    }

    pub fn close_cart(&mut self) {
        self.store.close_cart();
    }

    #[wasm_bindgen(getter)]
    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    #[wasm_bindgen(getter)]
    pub fn item_count(&self) -> u32 {
        self.store.item_count()
    }

    pub fn has_item(&self, product_id: &str) -> bool {
        self.store.has_item(product_id)
    }

    /// Current lines as plain JS objects
    pub fn items(&self) -> Result<JsValue, JsError> {
        to_js(&self.store.items())
    }

    /// Subtotal, tax, shipping, discount and total for the drawer
    pub fn summary(&self) -> Result<JsValue, JsError> {
        to_js(&self.store.summary())
    }

    /// Validated body for the session-creation endpoint
    pub fn checkout_request(
        &self,
        customer_email: &str,
        metadata: JsValue,
    ) -> Result<JsValue, JsError> {
        let metadata: HashMap<String, String> = if metadata.is_undefined() || metadata.is_null() {
            HashMap::new()
        } else {
            serde_wasm_bindgen::from_value(metadata)?
        };
        to_js(&self.build_checkout_request(customer_email, metadata)?)
    }
}

impl WasmCart {
    /// Cart over an explicit backend
    pub fn with_store(backend: BrowserStore) -> CartResult<Self> {
        Ok(Self {
            store: CartStore::load(backend)?,
        })
    }

    pub fn add_product(&mut self, product: &Product, quantity: u32) -> CartResult<()> {
        self.store.add_item(product, quantity)
    }

    pub fn cart_items(&self) -> &[CartItem] {
        self.store.items()
    }

    pub fn cart_summary(&self) -> CartSummary {
        self.store.summary()
    }

    pub fn build_checkout_request(
        &self,
        customer_email: &str,
        metadata: HashMap<String, String>,
    ) -> CartResult<CheckoutSessionRequest> {
        let mut form = CheckoutForm::new(customer_email);
        form.metadata = metadata;
        form.validate(self.store.items())
    }
}

// =============================================================================
// Free functions
// =============================================================================

/// Summary for an arbitrary list of cart items (JSON array)
#[wasm_bindgen]
pub fn cart_summary(items: JsValue) -> Result<JsValue, JsError> {
    let items: Vec<CartItem> = serde_wasm_bindgen::from_value(items)?;
    to_js(&CartSummary::calculate(&items))
}

/// Format an amount in minor units, e.g. `format_price(25000, "mxn")` is "MX$250.00"
#[wasm_bindgen]
pub fn format_price(cents: i64, currency: Option<String>) -> Result<String, JsError> {
    Ok(format_minor_units(cents, currency.as_deref())?)
}

fn format_minor_units(cents: i64, currency: Option<&str>) -> CartResult<String> {
    let currency = match currency {
        Some(code) => parse_currency(code)?,
        None => Currency::default(),
    };
    Ok(Price::from_cents(cents, currency).display())
}

fn parse_currency(code: &str) -> CartResult<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_string()))
        .map_err(|_| CartError::InvalidRequest(format!("Unsupported currency: {}", code)))
}

/// Navigates the current window
struct WindowNavigator;

impl Navigator for WindowNavigator {
    fn navigate(&self, url: &str) -> CartResult<()> {
        let window = web_sys::window()
            .ok_or_else(|| CartError::InvalidRequest("No window available".to_string()))?;
        window
            .location()
            .set_href(url)
            .map_err(|e| CartError::InvalidRequest(format!("Navigation failed: {:?}", e)))
    }
}

/// Full-page redirect to a hosted checkout URL
#[wasm_bindgen]
pub fn redirect_to_checkout(url: &str) -> Result<(), JsError> {
    let url = checkout_target(url)?;
    Ok(WindowNavigator.navigate(url)?)
}

fn checkout_target(url: &str) -> CartResult<&str> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CartError::missing_checkout_url());
    }
    Ok(url)
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
