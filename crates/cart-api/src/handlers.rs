//! # Request Handlers
//!
//! Axum request handlers for the storefront API.
//! Cart mutations run under the cart lock; the checkout handler releases it
//! while the backend call is in flight.

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
    Json,
};
use cart_core::checkout::PAYMENT_FAILED_MESSAGE;
use cart_core::{
    initiate_checkout, CartError, CartItem, CartResult, CartSummary, CheckoutForm, CheckoutState,
    Navigator, Price, Product,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Add-to-cart request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// Quantity update request. Zero or negative removes the line.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: i64,
}

/// Checkout form submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Cart snapshot returned by every cart endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub is_open: bool,
    pub summary: CartSummary,
    pub checkout: CheckoutState,
}

/// Product with its resolved price and selector limit
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView<'a> {
    #[serde(flatten)]
    pub product: &'a Product,
    pub unit_price: Price,
    pub formatted_price: String,
    pub max_quantity: u32,
    pub in_stock: bool,
}

impl<'a> From<&'a Product> for ProductView<'a> {
    fn from(product: &'a Product) -> Self {
        let unit_price = product.unit_price();
        Self {
            product,
            unit_price,
            formatted_price: unit_price.display(),
            max_quantity: product.max_quantity(),
            in_stock: product.has_stock(),
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn cart_error_to_response(err: CartError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Server-side navigation: the redirect itself is the handler's response
struct SeeOther;

impl Navigator for SeeOther {
    fn navigate(&self, url: &str) -> CartResult<()> {
        debug!("Redirecting client to {}", url);
        Ok(())
    }
}

async fn cart_view(state: &AppState) -> CartView {
    let session = state.cart.lock().await;
    CartView {
        items: session.store.items().to_vec(),
        is_open: session.store.is_open(),
        summary: session.store.summary(),
        checkout: session.checkout.state().clone(),
    }
}

fn lookup_product<'a>(state: &'a AppState, product_id: &str) -> Result<&'a Product, ApiError> {
    state.catalog.get(product_id).ok_or_else(|| {
        cart_error_to_response(CartError::ProductNotFound {
            product_id: product_id.to_string(),
        })
    })
}

fn ensure_within_stock(product: &Product, requested: u32) -> Result<(), ApiError> {
    let available = product.max_quantity();
    if requested > available {
        return Err(cart_error_to_response(CartError::InsufficientStock {
            product_id: product.id.clone(),
            requested,
            available,
        }));
    }
    Ok(())
}

// =============================================================================
// Health & catalog
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront-cart",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// List published, in-stock products
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<ProductView<'_>> = state
        .catalog
        .available_products()
        .map(ProductView::from)
        .collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let product = lookup_product(&state, &product_id)?;
    let body = serde_json::to_value(ProductView::from(product))
        .map_err(|e| cart_error_to_response(e.into()))?;
    Ok(Json(body))
}

// =============================================================================
// Cart
// =============================================================================

/// Current cart contents, drawer flag and summary
pub async fn get_cart(State(state): State<AppState>) -> Json<CartView> {
    Json(cart_view(&state).await)
}

/// Summary only
pub async fn get_summary(State(state): State<AppState>) -> Json<CartSummary> {
    Json(state.cart.lock().await.store.summary())
}

/// Add a catalog product to the cart
#[instrument(skip(state, request), fields(product_id = %request.product_id, quantity = request.quantity))]
pub async fn add_item(
    State(state): State<AppState>,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    let product = lookup_product(&state, &request.product_id)?;

    if !product.is_available() {
        return Err(cart_error_to_response(CartError::InvalidRequest(format!(
            "Product is not available: {}",
            product.id
        ))));
    }

    {
        let mut session = state.cart.lock().await;
        let in_cart = session
            .store
            .get_item(&product.id)
            .map(|item| item.quantity)
            .unwrap_or(0);
        ensure_within_stock(product, in_cart.saturating_add(request.quantity))?;

        session
            .store
            .add_item(product, request.quantity)
            .map_err(cart_error_to_response)?;
    }

    Ok(Json(cart_view(&state).await))
}

/// Replace the quantity of a cart line
#[instrument(skip(state, request), fields(quantity = request.quantity))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    {
        let mut session = state.cart.lock().await;

        if request.quantity > 0 {
            // Prefer the live catalog entry; fall back to the snapshot in the cart
            let limit_source = state
                .catalog
                .get(&product_id)
                .or_else(|| session.store.get_item(&product_id).map(|item| &item.product));
            if let Some(product) = limit_source {
                let requested = u32::try_from(request.quantity).unwrap_or(u32::MAX);
                ensure_within_stock(product, requested)?;
            }
        }

        session
            .store
            .update_quantity(&product_id, request.quantity)
            .map_err(cart_error_to_response)?;
    }

    Ok(Json(cart_view(&state).await))
}

/// Remove a cart line (absent ids are ignored)
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    state
        .cart
        .lock()
        .await
        .store
        .remove_item(&product_id)
        .map_err(cart_error_to_response)?;

    Ok(Json(cart_view(&state).await))
}

/// Empty the cart
pub async fn clear_cart(State(state): State<AppState>) -> Result<Json<CartView>, ApiError> {
    state
        .cart
        .lock()
        .await
        .store
        .clear_cart()
        .map_err(cart_error_to_response)?;

    Ok(Json(cart_view(&state).await))
}

pub async fn toggle_drawer(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.cart.lock().await;
    session.store.toggle_cart();
    Json(serde_json::json!({ "isOpen": session.store.is_open() }))
}

pub async fn open_drawer(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.cart.lock().await;
    session.store.open_cart();
    Json(serde_json::json!({ "isOpen": session.store.is_open() }))
}

pub async fn close_drawer(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.cart.lock().await;
    session.store.close_cart();
    Json(serde_json::json!({ "isOpen": session.store.is_open() }))
}

// =============================================================================
// Checkout
// =============================================================================

/// Validate the form, create a hosted session and redirect there (303)
#[instrument(skip(state, request))]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Redirect, ApiError> {
    let correlation_id = uuid::Uuid::new_v4().to_string();

    let session_request = {
        let mut session = state.cart.lock().await;

        let mut form = CheckoutForm::new(request.customer_email);
        form.metadata = request.metadata;
        form.metadata
            .insert("correlation_id".to_string(), correlation_id.clone());

        let session_request = form
            .validate(session.store.items())
            .map_err(cart_error_to_response)?;
        session.checkout.begin().map_err(cart_error_to_response)?;
        session_request
    };

    info!(
        "Creating checkout: correlation_id={}, {} items, provider={}",
        correlation_id,
        session_request.items.len(),
        state.gateway.provider_name()
    );

    let outcome = initiate_checkout(state.gateway.as_ref(), &SeeOther, &session_request).await;
    state.cart.lock().await.checkout.finish(&outcome);

    match outcome {
        Ok(url) => Ok(Redirect::to(&url)),
        Err(e) => {
            error!("Checkout failed: correlation_id={}, error={}", correlation_id, e);
            let code = e.status_code();
            let response =
                ErrorResponse::new(PAYMENT_FAILED_MESSAGE, code).with_details(e.to_string());
            Err((
                StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
                Json(response),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SuccessParams {
    pub session_id: Option<String>,
}

/// Checkout success page. Confirms the session with the backend and empties
/// the cart the first time a paid session comes back.
#[instrument(skip(state, params))]
pub async fn checkout_success(
    State(state): State<AppState>,
    Query(params): Query<SuccessParams>,
) -> Result<Html<String>, ApiError> {
    let session_id = params
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            cart_error_to_response(CartError::InvalidRequest(
                "Missing session_id".to_string(),
            ))
        })?;

    let details = state.gateway.get_session(&session_id).await;

    let mut session = state.cart.lock().await;
    session.checkout.reset();

    let (heading, message) = match &details {
        Ok(d) if d.is_paid() => {
            if session
                .clear_for_session(&session_id)
                .map_err(cart_error_to_response)?
            {
                info!("Payment confirmed, cart cleared: session={}", session_id);
            }
            ("¡Pago exitoso!", "Gracias por tu compra.")
        }
        Ok(d) => {
            warn!(
                "Session {} returned with payment status {}",
                session_id, d.payment_status
            );
            ("Pago pendiente", "Tu pago aún se está procesando.")
        }
        Err(e) => {
            error!("Error fetching checkout session {}: {}", session_id, e);
            ("No pudimos verificar tu pago", "Si el cargo aparece en tu cuenta, te enviaremos un correo de confirmación.")
        }
    };

    Ok(Html(render_page(heading, message, Some(&session_id))))
}

/// Checkout cancel page
pub async fn checkout_cancel(State(state): State<AppState>) -> Html<String> {
    state.cart.lock().await.checkout.reset();
    Html(render_page(
        "Pago cancelado",
        "No se realizó ningún cargo. Tu carrito sigue guardado.",
        None,
    ))
}

fn render_page(heading: &str, message: &str, session_id: Option<&str>) -> String {
    let session_line = session_id
        .map(|id| format!("<p>Sesión: <code>{}</code></p>", html_escape(id)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head><meta charset="utf-8"><title>{heading}</title></head>
<body style="font-family: system-ui; display: flex; justify-content: center; align-items: center; height: 100vh; margin: 0;">
    <div style="padding: 60px; border-radius: 16px; text-align: center;">
        <h1>{heading}</h1>
        {session_line}
        <p style="color: #666;">{message}</p>
        <p><a href="/">Volver a la tienda</a></p>
    </div>
</body>
</html>
"#
    )
}

fn html_escape(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '<' => "&lt;".to_string(),
            '>' => "&gt;".to_string(),
            '&' => "&amp;".to_string(),
            '"' => "&quot;".to_string(),
            '\'' => "&#39;".to_string(),
            c => c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new("Test error", 400).with_details("more");
        assert_eq!(err.error, "Test error");
        assert_eq!(err.code, 400);
        assert_eq!(err.details.as_deref(), Some("more"));
    }

    #[test]
    fn test_cart_error_conversion() {
        let (status, _json) = cart_error_to_response(CartError::InvalidRequest("Bad data".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _json) = cart_error_to_response(CartError::checkout_failed());
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        let (status, _json) = cart_error_to_response(CartError::InsufficientStock {
            product_id: "hat".into(),
            requested: 4,
            available: 3,
        });
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_session_id_is_escaped() {
        let page = render_page("Ok", "Done", Some("<script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>"));
    }
}
