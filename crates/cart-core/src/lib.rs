//! # cart-core
//!
//! Core types for the storefront cart engine.
//!
//! This crate provides:
//! - `Product` and `ProductCatalog` with the single price-resolution rule
//! - `CartStore`, the owner of cart contents, persisted through `KeyValueStore`
//! - `CartSummary` for subtotal, tax, shipping, discount and total
//! - `CheckoutGateway`, `Navigator` and `CheckoutFlow` for the hosted checkout handoff
//! - `CartError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use cart_core::{CartStore, Currency, MemoryStore, Product};
//!
//! let mut cart = CartStore::load(MemoryStore::new())?;
//!
//! let vinyl = Product::simple("vinyl-lp", "Vinyl LP", 650.0, Currency::MXN);
//! cart.add_item(&vinyl, 2)?;
//!
//! let summary = cart.summary();
//! println!("Total: {}", summary.total.display());
//!
//! // Hand the cart to a hosted checkout
//! let request = CheckoutForm::new("fan@example.com").validate(cart.items())?;
//! initiate_checkout(&gateway, &navigator, &request).await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod error;
pub mod product;
pub mod storage;
pub mod summary;

// Re-exports for convenience
pub use cart::{CartEvent, CartItem, CartState, CartStore, CART_STORAGE_KEY};
pub use checkout::{
    initiate_checkout, BoxedCheckoutGateway, CheckoutFlow, CheckoutForm, CheckoutGateway,
    CheckoutSessionDetails, CheckoutSessionRequest, CheckoutSessionResponse, CheckoutState,
    Navigator,
};
pub use error::{CartError, CartResult};
pub use product::{
    Currency, Price, Product, ProductCatalog, ProductCategory, ProductImage, ProductStatus,
    ProductVariant, VariantInventory, VariantPricing,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use summary::CartSummary;
