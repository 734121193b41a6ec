//! # Storefront Cart
//!
//! Cart, pricing summary and hosted Stripe checkout over HTTP.
//!
//! ## Usage
//!
//! ```bash
//! # Storefront backend that creates Stripe Checkout Sessions
//! export NEXT_PUBLIC_API_URL=http://localhost:5000
//! export CART_DATA_DIR=./data
//!
//! # Run the server
//! storefront-cart
//! ```

use cart_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Public URL: {}", state.config.base_url);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("Cart storage: {}", state.config.data_dir.display());
    info!("Checkout provider: {}", state.gateway.provider_name());
    {
        let cart = state.cart.lock().await;
        info!("Rehydrated cart: {} items", cart.store.item_count());
    }

    let app = routes::create_router(state);

    info!("Storefront cart v{} listening on http://{}", env!("CARGO_PKG_VERSION"), addr);

    if !is_prod {
        info!("Cart: GET http://{}/api/v1/cart", addr);
        info!("Checkout: POST http://{}/api/v1/checkout", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
