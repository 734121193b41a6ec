//! # Cart Error Types
//!
//! Typed error handling for the storefront cart engine.
//! All fallible cart, persistence and checkout operations return
//! `Result<T, CartError>`.

use thiserror::Error;

/// Generic message surfaced when a checkout session cannot be started
pub const CHECKOUT_FAILED_MESSAGE: &str = "Failed to create checkout session";

/// Message used when the backend answers without a redirect URL
pub const MISSING_CHECKOUT_URL_MESSAGE: &str = "No checkout URL received from server";

/// Core error type for all cart operations
#[derive(Debug, Error)]
pub enum CartError {
    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid request data (caught at the UI boundary)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Product not found in catalog
    #[error("Product not found: {product_id}")]
    ProductNotFound { product_id: String },

    /// Requested quantity exceeds what the catalog allows
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    /// Durable storage failed (unavailable, quota, IO)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Checkout session could not be created or lacked a redirect URL
    #[error("Checkout failed: {0}")]
    CheckoutFailed(String),

    /// A checkout submission is already in flight
    #[error("Checkout already in progress")]
    CheckoutInProgress,

    /// Session expired or not found
    #[error("Session not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    /// Network/HTTP error communicating with the backend
    #[error("Network error: {0}")]
    NetworkError(String),
}

impl CartError {
    /// Build the generic checkout failure
    pub fn checkout_failed() -> Self {
        CartError::CheckoutFailed(CHECKOUT_FAILED_MESSAGE.to_string())
    }

    /// Build the missing-redirect failure
    pub fn missing_checkout_url() -> Self {
        CartError::CheckoutFailed(MISSING_CHECKOUT_URL_MESSAGE.to_string())
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CartError::Configuration(_) => 500,
            CartError::InvalidRequest(_) => 400,
            CartError::ProductNotFound { .. } => 404,
            CartError::InsufficientStock { .. } => 409,
            CartError::Storage(_) => 500,
            CartError::Serialization(_) => 500,
            CartError::CheckoutFailed(_) => 502,
            CartError::CheckoutInProgress => 409,
            CartError::SessionNotFound { .. } => 404,
            CartError::NetworkError(_) => 503,
        }
    }
}

impl From<serde_json::Error> for CartError {
    fn from(err: serde_json::Error) -> Self {
        CartError::Serialization(err.to_string())
    }
}

/// Result type alias for cart operations
pub type CartResult<T> = Result<T, CartError>;
