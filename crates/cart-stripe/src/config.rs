//! # Checkout Client Configuration
//!
//! Where the storefront backend lives and how long to wait for it.
//! Values are loaded from environment variables (and `.env` if present).

use cart_core::CartError;
use std::env;
use std::time::Duration;

/// Backend used when no URL is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Request timeout for backend calls
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for the hosted-checkout client
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// Base URL of the storefront backend that talks to Stripe
    pub api_base_url: String,

    /// Publishable key (pk_test_... or pk_live_...), only needed by
    /// frontends that load Stripe.js themselves
    pub publishable_key: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl StripeConfig {
    /// Load configuration from environment variables.
    ///
    /// - `STOREFRONT_API_URL` or `NEXT_PUBLIC_API_URL` (default `http://localhost:5000`)
    /// - `STRIPE_PUBLISHABLE_KEY` (optional)
    pub fn from_env() -> Result<Self, CartError> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("STOREFRONT_API_URL")
            .or_else(|_| env::var("NEXT_PUBLIC_API_URL"))
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let publishable_key = env::var("STRIPE_PUBLISHABLE_KEY")
            .ok()
            .filter(|k| !k.is_empty());

        let config = Self {
            api_base_url,
            publishable_key,
            timeout: DEFAULT_TIMEOUT,
        };
        config.validate()?;
        Ok(config)
    }

    /// Create config for an explicit backend URL
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            publishable_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Check URL and key formats
    pub fn validate(&self) -> Result<(), CartError> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(CartError::Configuration(format!(
                "API URL must start with http:// or https://, got {}",
                self.api_base_url
            )));
        }

        if let Some(key) = &self.publishable_key {
            if !key.starts_with("pk_test_") && !key.starts_with("pk_live_") {
                return Err(CartError::Configuration(
                    "STRIPE_PUBLISHABLE_KEY must start with pk_test_ or pk_live_".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Check if using test keys
    pub fn is_test_mode(&self) -> bool {
        self.publishable_key
            .as_deref()
            .map(|k| k.starts_with("pk_test_"))
            .unwrap_or(true)
    }

    /// Absolute URL for a backend path
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), path)
    }

    /// Builder: set publishable key
    pub fn with_publishable_key(mut self, key: impl Into<String>) -> Self {
        self.publishable_key = Some(key.into());
        self
    }

    /// Builder: set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}
