//! # cart-api
//!
//! HTTP storefront for storefront-cart-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server around a single persisted cart
//! - REST endpoints for catalog, cart and summary
//! - Hosted checkout handoff with success/cancel return pages
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | GET | `/api/v1/products/{id}` | Get product |
//! | GET | `/api/v1/cart` | Cart with summary |
//! | POST | `/api/v1/cart/items` | Add item |
//! | PUT | `/api/v1/cart/items/{id}` | Set quantity |
//! | DELETE | `/api/v1/cart/items/{id}` | Remove item |
//! | POST | `/api/v1/checkout` | Redirect to hosted checkout |
//! | GET | `/checkout/success` | Payment confirmation |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState, CartSession};
