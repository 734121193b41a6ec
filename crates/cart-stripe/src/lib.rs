//! # cart-stripe
//!
//! Hosted Stripe checkout for storefront-cart-rs.
//!
//! The storefront backend owns the Stripe secret key. This crate posts a
//! cart snapshot to the backend, receives a Checkout Session URL and hands it
//! to a [`Navigator`](cart_core::Navigator). Card data never passes through here.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cart_stripe::StripeCheckoutClient;
//!
//! let client = StripeCheckoutClient::from_env()?;
//!
//! // Items come from the cart store, email from the checkout form
//! let url = client
//!     .checkout_with_stripe(&navigator, cart.items(), Some("fan@example.com"), None)
//!     .await?;
//!
//! // After the customer returns with ?session_id=...
//! let details = client.get_checkout_session(&session_id).await?;
//! if details.is_paid() {
//!     cart.clear_cart()?;
//! }
//! ```

pub mod checkout;
pub mod config;

// Re-exports
pub use checkout::{StripeCheckoutClient, CREATE_SESSION_PATH, SESSION_PATH};
pub use config::StripeConfig;
