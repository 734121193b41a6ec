//! # Application State
//!
//! Shared state for the Axum application.
//! Holds the product catalog, the singleton cart session and the checkout gateway.

use cart_core::{
    BoxedCheckoutGateway, CartEvent, CartResult, CartStore, CheckoutFlow, FileStore,
    KeyValueStore, ProductCatalog, CART_STORAGE_KEY,
};
use cart_stripe::StripeCheckoutClient;
use std::collections::VecDeque;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Storage backend shared by the server's cart
pub type BoxedStore = Box<dyn KeyValueStore + Send + Sync>;

/// Paid session ids that already emptied the cart, stored beside the cart
pub const CLEARED_SESSIONS_KEY: &str = "mariachi-cart-cleared-sessions";

/// Most recent paid sessions remembered
pub const MAX_CLEARED_SESSIONS: usize = 32;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this storefront
    pub base_url: String,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Directory for the file-backed cart storage
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            data_dir: std::env::var("CART_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Everything guarded by the cart lock: the store, the submission guard and
/// the sessions whose payment already emptied the cart.
#[derive(Debug)]
pub struct CartSession {
    pub store: CartStore<BoxedStore>,
    pub checkout: CheckoutFlow,
    cleared_sessions: VecDeque<String>,
}

impl CartSession {
    pub fn new(store: CartStore<BoxedStore>) -> Self {
        let cleared_sessions = load_cleared_sessions(store.storage());
        Self {
            store,
            checkout: CheckoutFlow::new(),
            cleared_sessions,
        }
    }

    /// Clear the cart for a paid session. Returns `false` when this session
    /// already cleared it, so a reloaded success page keeps new items.
    pub fn clear_for_session(&mut self, session_id: &str) -> CartResult<bool> {
        if self.cleared_sessions.iter().any(|id| id == session_id) {
            return Ok(false);
        }
        self.store.clear_cart()?;

        self.cleared_sessions.push_back(session_id.to_string());
        while self.cleared_sessions.len() > MAX_CLEARED_SESSIONS {
            self.cleared_sessions.pop_front();
        }

        // The cart is already empty; a lost id only risks a second clear
        let raw = serde_json::to_string(&self.cleared_sessions)?;
        if let Err(e) = self.store.storage().set(CLEARED_SESSIONS_KEY, &raw) {
            warn!("Failed to persist cleared checkout sessions: {}", e);
        }
        Ok(true)
    }
}

fn load_cleared_sessions(storage: &BoxedStore) -> VecDeque<String> {
    let raw = match storage.get(CLEARED_SESSIONS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return VecDeque::new(),
        Err(e) => {
            warn!("Cleared checkout sessions unreadable: {}", e);
            return VecDeque::new();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(ids) => ids,
        Err(e) => {
            warn!(
                "Discarding cleared checkout sessions stored beside {}: {}",
                CART_STORAGE_KEY, e
            );
            VecDeque::new()
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Product catalog
    pub catalog: Arc<ProductCatalog>,
    /// The singleton cart
    pub cart: Arc<Mutex<CartSession>>,
    /// Hosted checkout backend
    pub gateway: BoxedCheckoutGateway,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create state from the environment: file-backed cart, catalog from
    /// `config/products.toml` and the Stripe checkout client.
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();
        let catalog = load_product_catalog()?;

        let storage: BoxedStore = Box::new(FileStore::new(&config.data_dir));

        let gateway = StripeCheckoutClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe checkout: {}", e))?;

        Self::with_parts(config, catalog, storage, Arc::new(gateway)).map_err(Into::into)
    }

    /// Assemble state from explicit parts
    pub fn with_parts(
        config: AppConfig,
        catalog: ProductCatalog,
        storage: BoxedStore,
        gateway: BoxedCheckoutGateway,
    ) -> CartResult<Self> {
        let mut store = CartStore::load(storage)?;
        store.subscribe(log_cart_event);

        Ok(Self {
            catalog: Arc::new(catalog),
            cart: Arc::new(Mutex::new(CartSession::new(store))),
            gateway,
            config,
        })
    }
}

fn log_cart_event(event: &CartEvent, state: &cart_core::CartState) {
    match event {
        CartEvent::Added {
            product_name,
            quantity,
            ..
        } => info!("Added {} x{} to cart", product_name, quantity),
        CartEvent::Updated {
            product_id,
            quantity,
        } => info!("Cart item {} set to {}", product_id, quantity),
        CartEvent::Removed { product_id } => info!("Cart item {} removed", product_id),
        CartEvent::Cleared => info!("Cart cleared"),
    }
    tracing::debug!("Cart now holds {} lines", state.items.len());
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    tracing::warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cart_core::{Currency, MemoryStore, Product};

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: "test".to_string(),
            data_dir: PathBuf::from("data"),
        };

        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:3000");

        let bad = AppConfig {
            host: "not a host".to_string(),
            ..config
        };
        assert!(bad.socket_addr().is_err());
    }

    #[test]
    fn test_shipped_catalog_parses() {
        let catalog =
            ProductCatalog::from_toml(include_str!("../../../config/products.toml")).unwrap();

        assert_eq!(catalog.products.len(), 5);
        assert_eq!(catalog.available_products().count(), 4);

        let vinyl = catalog.get("vinyl-lp-en-vivo").unwrap();
        assert_eq!(vinyl.unit_price().amount, 54900);

        let shirt = catalog.get("playera-tour").unwrap();
        assert_eq!(shirt.unit_price().amount, 38000);
        assert_eq!(shirt.max_quantity(), 99);
    }

    #[test]
    fn test_clear_for_session_runs_once() {
        let store = CartStore::load(Box::new(MemoryStore::new()) as BoxedStore).unwrap();
        let mut session = CartSession::new(store);
        let vinyl = Product::simple("vinyl", "Vinyl", 650.0, Currency::MXN);

        session.store.add_item(&vinyl, 1).unwrap();
        assert!(session.clear_for_session("cs_1").unwrap());
        assert!(session.store.is_empty());

        session.store.add_item(&vinyl, 2).unwrap();
        assert!(!session.clear_for_session("cs_1").unwrap());
        assert_eq!(session.store.item_count(), 2);
    }

    #[test]
    fn test_cleared_sessions_survive_restart() {
        let storage = MemoryStore::new();
        let vinyl = Product::simple("vinyl", "Vinyl", 650.0, Currency::MXN);

        let store = CartStore::load(Box::new(storage.clone()) as BoxedStore).unwrap();
        let mut session = CartSession::new(store);
        session.store.add_item(&vinyl, 1).unwrap();
        assert!(session.clear_for_session("cs_1").unwrap());
        drop(session);

        // Same storage, fresh process
        let store = CartStore::load(Box::new(storage) as BoxedStore).unwrap();
        let mut session = CartSession::new(store);
        session.store.add_item(&vinyl, 3).unwrap();
        assert!(!session.clear_for_session("cs_1").unwrap());
        assert_eq!(session.store.item_count(), 3);
    }

    #[test]
    fn test_cleared_sessions_are_bounded() {
        let storage = MemoryStore::new();
        let store = CartStore::load(Box::new(storage.clone()) as BoxedStore).unwrap();
        let mut session = CartSession::new(store);

        for n in 0..=MAX_CLEARED_SESSIONS {
            assert!(session.clear_for_session(&format!("cs_{}", n)).unwrap());
        }

        let raw = storage.get(CLEARED_SESSIONS_KEY).unwrap().unwrap();
        let ids: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(ids.len(), MAX_CLEARED_SESSIONS);
        assert_eq!(ids.first().map(String::as_str), Some("cs_1"));

        // The oldest id was forgotten, so it clears again
        assert!(session.clear_for_session("cs_0").unwrap());
    }

    #[test]
    fn test_corrupt_cleared_sessions_are_ignored() {
        let storage = MemoryStore::new();
        storage.set(CLEARED_SESSIONS_KEY, "{nope").unwrap();

        let store = CartStore::load(Box::new(storage) as BoxedStore).unwrap();
        let mut session = CartSession::new(store);
        assert!(session.clear_for_session("cs_1").unwrap());
    }
}
