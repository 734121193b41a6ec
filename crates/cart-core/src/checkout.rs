//! # Hosted Checkout Handoff
//!
//! Contract between the cart and a backend that creates hosted checkout
//! sessions. The cart never touches card data: it sends a snapshot of its
//! items, receives a redirect URL and navigates there.
//!
//! ```text
//! ┌──────┐ begin ┌────────────┐ url  ┌─────────────┐
//! │ Idle │──────▶│ Submitting │─────▶│ Redirecting │
//! └──────┘       └────────────┘      └─────────────┘
//!    ▲                 │ error
//!    │ acknowledge ┌───▼────┐
//!    └─────────────│ Failed │
//!                  └────────┘
//! ```

use crate::cart::CartItem;
use crate::error::{CartError, CartResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Shown when the cart is empty at submission
pub const EMPTY_CART_MESSAGE: &str = "Tu carrito está vacío";

/// Shown when the email is missing or malformed
pub const INVALID_EMAIL_MESSAGE: &str = "Por favor ingresa un email válido";

/// Shown for any failure after submission
pub const PAYMENT_FAILED_MESSAGE: &str = "Error al procesar el pago. Por favor intenta de nuevo.";

/// Body sent to the session-creation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSessionRequest {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self {
            items,
            customer_email: None,
            metadata: None,
        }
    }

    /// Builder: set customer email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    /// Builder: add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Session-creation result. Both fields are optional on the wire so a
/// response lacking the URL can be told apart from a malformed one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl CheckoutSessionResponse {
    /// The redirect URL, or an error when it is missing or blank
    pub fn redirect_url(&self) -> CartResult<&str> {
        match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(CartError::missing_checkout_url()),
        }
    }
}

/// Session details returned by the lookup endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionDetails {
    pub id: String,
    pub payment_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Amount in smallest currency unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_total: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

impl CheckoutSessionDetails {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

/// Backend that creates and looks up hosted checkout sessions
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a hosted checkout session for the given cart snapshot
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> CartResult<CheckoutSessionResponse>;

    /// Look up a session after the customer returns from the hosted page
    async fn get_session(&self, session_id: &str) -> CartResult<CheckoutSessionDetails>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// Type alias for a shared gateway (dynamic dispatch)
pub type BoxedCheckoutGateway = Arc<dyn CheckoutGateway>;

/// Full-page navigation to the hosted checkout
pub trait Navigator {
    fn navigate(&self, url: &str) -> CartResult<()>;
}

/// Create a session and navigate to its URL.
///
/// Performs no input validation and no retries. Any gateway failure is
/// collapsed into the generic checkout error; a response without a URL is an
/// error rather than a silent no-op. Returns the URL navigated to.
#[instrument(skip_all, fields(provider = gateway.provider_name(), items = request.items.len()))]
pub async fn initiate_checkout<G, N>(
    gateway: &G,
    navigator: &N,
    request: &CheckoutSessionRequest,
) -> CartResult<String>
where
    G: CheckoutGateway + ?Sized,
    N: Navigator + ?Sized,
{
    let response = gateway.create_session(request).await.map_err(|e| {
        error!("Error creating checkout session: {}", e);
        match e {
            CartError::CheckoutFailed(_) => e,
            _ => CartError::checkout_failed(),
        }
    })?;

    let url = response.redirect_url().map_err(|e| {
        error!("Checkout error: {}", e);
        e
    })?;

    info!(
        "Redirecting to hosted checkout: session={:?}",
        response.session_id
    );
    navigator.navigate(url)?;
    Ok(url.to_string())
}

/// Customer fields collected before submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl CheckoutForm {
    pub fn new(customer_email: impl Into<String>) -> Self {
        Self {
            customer_email: customer_email.into(),
            metadata: HashMap::new(),
        }
    }

    /// UI-boundary checks, then build the request for `items`
    pub fn validate(&self, items: &[CartItem]) -> CartResult<CheckoutSessionRequest> {
        let email = self.customer_email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CartError::InvalidRequest(INVALID_EMAIL_MESSAGE.to_string()));
        }
        if items.is_empty() {
            return Err(CartError::InvalidRequest(EMPTY_CART_MESSAGE.to_string()));
        }

        Ok(CheckoutSessionRequest {
            items: items.to_vec(),
            customer_email: Some(email.to_string()),
            metadata: if self.metadata.is_empty() {
                None
            } else {
                Some(self.metadata.clone())
            },
        })
    }
}

/// Client-observed checkout state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    Submitting,
    Redirecting { url: String },
    Failed { message: String },
}

impl Default for CheckoutState {
    fn default() -> Self {
        CheckoutState::Idle
    }
}

/// Submission guard around a single checkout attempt
#[derive(Debug, Clone, Default)]
pub struct CheckoutFlow {
    state: CheckoutState,
}

impl CheckoutFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, CheckoutState::Submitting)
    }

    /// Enter `Submitting`. Rejected only while a submission is in flight.
    ///
    /// `Redirecting` ends one page view; a customer who abandons the hosted
    /// page and submits again starts a fresh session.
    pub fn begin(&mut self) -> CartResult<()> {
        match self.state {
            CheckoutState::Submitting => Err(CartError::CheckoutInProgress),
            CheckoutState::Idle
            | CheckoutState::Failed { .. }
            | CheckoutState::Redirecting { .. } => {
                self.state = CheckoutState::Submitting;
                Ok(())
            }
        }
    }

    /// Record the outcome of the submission started by `begin`
    pub fn finish(&mut self, outcome: &CartResult<String>) {
        if !self.is_submitting() {
            return;
        }
        self.state = match outcome {
            Ok(url) => CheckoutState::Redirecting { url: url.clone() },
            Err(e) => {
                info!("Checkout failed: {}", e);
                CheckoutState::Failed {
                    message: PAYMENT_FAILED_MESSAGE.to_string(),
                }
            }
        };
    }

    /// Dismiss a failure and return to `Idle`
    pub fn acknowledge(&mut self) {
        if matches!(self.state, CheckoutState::Failed { .. }) {
            self.state = CheckoutState::Idle;
        }
    }

    /// Back to `Idle` when the customer returns from the hosted page
    pub fn reset(&mut self) {
        self.state = CheckoutState::Idle;
    }
}
