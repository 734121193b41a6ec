//! # Stripe Checkout Sessions
//!
//! Client for the storefront backend's Stripe endpoints. The backend holds
//! the secret key and creates the hosted session; this side only posts the
//! cart snapshot and follows the returned URL.

use crate::config::StripeConfig;
use async_trait::async_trait;
use cart_core::{
    initiate_checkout, CartError, CartItem, CartResult, CheckoutGateway, CheckoutSessionDetails,
    CheckoutSessionRequest, CheckoutSessionResponse, Navigator,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

/// Path of the session-creation endpoint
pub const CREATE_SESSION_PATH: &str = "/api/stripe/create-checkout-session";

/// Path prefix of the session-lookup endpoint
pub const SESSION_PATH: &str = "/api/stripe/checkout-session";

/// Hosted Stripe checkout through the storefront backend
#[derive(Debug, Clone)]
pub struct StripeCheckoutClient {
    config: StripeConfig,
    client: Client,
}

impl StripeCheckoutClient {
    /// Create a new client
    pub fn new(config: StripeConfig) -> CartResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CartError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> CartResult<Self> {
        let config = StripeConfig::from_env()?;
        Self::new(config)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    /// Ask the backend for a hosted checkout session.
    ///
    /// Every transport or backend failure collapses into the generic
    /// checkout error. A successful response without a URL is returned as-is;
    /// [`checkout_with_stripe`](Self::checkout_with_stripe) rejects it.
    #[instrument(skip(self, request), fields(items = request.items.len()))]
    pub async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> CartResult<CheckoutSessionResponse> {
        let url = self.config.endpoint(CREATE_SESSION_PATH);
        debug!("Creating checkout session: {} items", request.items.len());

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Network error creating checkout session: {}", e);
                CartError::checkout_failed()
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!("Failed to read checkout session response: {}", e);
            CartError::checkout_failed()
        })?;

        if !status.is_success() {
            error!("Backend error: status={}, body={}", status, body);
            return Err(CartError::checkout_failed());
        }

        let session: CheckoutSessionResponse = unwrap_envelope(&body).map_err(|e| {
            error!("Unusable checkout session response: {}", e);
            CartError::checkout_failed()
        })?;

        info!(
            "Created checkout session: id={:?}, has_url={}",
            session.session_id,
            session.url.is_some()
        );
        Ok(session)
    }

    /// Retrieve checkout session details after the customer returns
    #[instrument(skip(self))]
    pub async fn get_checkout_session(&self, session_id: &str) -> CartResult<CheckoutSessionDetails> {
        // Stripe ids are `cs_test_...`/`cs_live_...`; anything else would
        // become extra path segments on the backend URL
        if !is_session_id(session_id) {
            return Err(CartError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }

        let url = self
            .config
            .endpoint(&format!("{}/{}", SESSION_PATH, session_id));

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CartError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CartError::NetworkError(e.to_string()))?;

        if status == StatusCode::NOT_FOUND {
            return Err(CartError::SessionNotFound {
                session_id: session_id.to_string(),
            });
        }

        if !status.is_success() {
            error!("Error retrieving checkout session: status={}, body={}", status, body);
            return Err(CartError::NetworkError(format!("HTTP {}: {}", status, body)));
        }

        unwrap_envelope(&body)
    }

    /// Create a session for the cart snapshot and navigate to it.
    ///
    /// The caller validates `items` and `customer_email` beforehand and
    /// keeps the submit control disabled until this returns.
    pub async fn checkout_with_stripe<N>(
        &self,
        navigator: &N,
        items: &[CartItem],
        customer_email: Option<&str>,
        metadata: Option<HashMap<String, String>>,
    ) -> CartResult<String>
    where
        N: Navigator + ?Sized,
    {
        let request = CheckoutSessionRequest {
            items: items.to_vec(),
            customer_email: customer_email.map(str::to_string),
            metadata,
        };
        initiate_checkout(self, navigator, &request).await
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckoutClient {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> CartResult<CheckoutSessionResponse> {
        self.create_checkout_session(request).await
    }

    async fn get_session(&self, session_id: &str) -> CartResult<CheckoutSessionDetails> {
        self.get_checkout_session(session_id).await
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

// =============================================================================
// Backend envelope
// =============================================================================

/// The backend wraps every payload as `{ success, data, error? }`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    correlation_id: Option<String>,
}

fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> CartResult<T> {
    let envelope: ApiResponse<T> = serde_json::from_str(body)?;

    if let Some(id) = &envelope.correlation_id {
        debug!("Backend correlation id: {}", id);
    }

    match envelope {
        ApiResponse {
            success: true,
            data: Some(data),
            ..
        } => Ok(data),
        ApiResponse { error, .. } => Err(CartError::CheckoutFailed(
            error.unwrap_or_else(|| "Backend reported failure".to_string()),
        )),
    }
}

fn is_session_id(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}
