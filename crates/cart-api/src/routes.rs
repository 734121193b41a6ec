//! # Routes
//!
//! Axum router configuration for the storefront API.

use crate::handlers;
use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
///
/// Routes:
/// - Catalog:
///   - GET  /api/v1/products - List available products
///   - GET  /api/v1/products/{product_id} - Product with resolved price
///
/// - Cart:
///   - GET    /api/v1/cart - Items, drawer flag, summary
///   - DELETE /api/v1/cart - Empty the cart
///   - GET    /api/v1/cart/summary - Summary only
///   - POST   /api/v1/cart/items - Add item
///   - PUT    /api/v1/cart/items/{product_id} - Set quantity
///   - DELETE /api/v1/cart/items/{product_id} - Remove item
///   - POST   /api/v1/cart/drawer/{toggle,open,close} - Drawer flag
///
/// - Checkout:
///   - POST /api/v1/checkout - Create hosted session, 303 to its URL
///   - GET  /checkout/success - Confirm payment, clear cart
///   - GET  /checkout/cancel - Cancel page
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Hosted checkout return pages
    let checkout_routes = Router::new()
        .route("/success", get(handlers::checkout_success))
        .route("/cancel", get(handlers::checkout_cancel));

    let cart_routes = Router::new()
        .route("/cart", get(handlers::get_cart).delete(handlers::clear_cart))
        .route("/cart/summary", get(handlers::get_summary))
        .route("/cart/items", post(handlers::add_item))
        .route(
            "/cart/items/{product_id}",
            put(handlers::update_item).delete(handlers::remove_item),
        )
        .route("/cart/drawer/toggle", post(handlers::toggle_drawer))
        .route("/cart/drawer/open", post(handlers::open_drawer))
        .route("/cart/drawer/close", post(handlers::close_drawer));

    let api_routes = Router::new()
        .route("/products", get(handlers::list_products))
        .route("/products/{product_id}", get(handlers::get_product))
        .route("/checkout", post(handlers::create_checkout))
        .merge(cart_routes);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/checkout", checkout_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
