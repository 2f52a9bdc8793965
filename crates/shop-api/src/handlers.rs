//! # Request Handlers
//!
//! Axum request handlers for the shopper-facing API: catalog, cart, quote,
//! checkout, theme, pairing and the payment webhook.

use crate::state::AppState;
use crate::webhook::{verify_notification, SIGNATURE_HEADER};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::pricing::subtotal;
use shop_core::{
    format_currency, theme_for, Amount, CheckoutForm, CheckoutState, FieldError, LineItem,
    PairingEvent, PairingState, PaymentStatus, Product, ProductId, Quote, ShippingTier, ShopError,
    StorefrontSession, ThemeTokens,
};
use tracing::{error, info, instrument, warn};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Message suitable for the shopper
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Per-field validation messages
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
            fields: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn shop_error_to_response(err: ShopError) -> ApiError {
    let code = err.status_code();
    let mut response = ErrorResponse::new(err.user_message(), code).with_details(err.to_string());
    response.fields = err.field_errors().to_vec();
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

/// Cart as shown to the shopper
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub item_count: u32,
    pub subtotal: Amount,
    pub subtotal_display: String,
    /// True while a payment is in flight
    pub locked: bool,
}

impl CartView {
    fn of(session: &StorefrontSession) -> Self {
        let cart = session.cart();
        let subtotal = subtotal(&cart);
        Self {
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            subtotal,
            subtotal_display: format_currency(subtotal, session.rates().currency),
            locked: matches!(
                session.checkout(),
                CheckoutState::Submitting { .. } | CheckoutState::AwaitingPaymentResult { .. }
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub variant: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    #[serde(default)]
    pub shipping: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThemeQuery {
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub scroll: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitCheckoutResponse {
    pub order_id: String,
    /// Redirect the shopper here
    pub payment_url: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// List products, optionally filtered by text and category
#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let catalog = state
        .api
        .list_products()
        .await
        .map_err(shop_error_to_response)?;

    let mut products: Vec<&Product> = match query.q.as_deref() {
        Some(q) => catalog.search(q),
        None => catalog.products.iter().collect(),
    };
    if let Some(category) = query.category.as_deref() {
        let in_category: Vec<&ProductId> = catalog.in_category(category).map(|p| &p.id).collect();
        products.retain(|p| in_category.contains(&&p.id));
    }

    let count = products.len();
    Ok(Json(serde_json::json!({
        "products": products,
        "count": count,
        "categories": catalog.categories(),
    })))
}

/// Get single product
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    state
        .api
        .get_product(&ProductId::from(product_id))
        .await
        .map(Json)
        .map_err(shop_error_to_response)
}

pub async fn get_cart(State(state): State<AppState>) -> Json<CartView> {
    let session = state.flow.session().lock().await;
    Json(CartView::of(&session))
}

/// Add a catalog product to the cart; a product already in the cart is refused
#[instrument(skip(state, request), fields(product_id = %request.product_id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    let product = state
        .api
        .get_product(&request.product_id)
        .await
        .map_err(shop_error_to_response)?;

    if let Some(label) = request.variant.as_deref() {
        if product.variant(label).is_none() {
            return Err(shop_error_to_response(ShopError::NotFound(format!(
                "variant {} of {}",
                label, product.title
            ))));
        }
    }

    let item = LineItem::from_product(&product, request.variant.as_deref())
        .with_quantity(request.quantity.unwrap_or(1));

    let mut session = state.flow.session().lock().await;
    session.add_item(item).map_err(shop_error_to_response)?;
    info!("Added {} to cart", product.title);

    Ok((StatusCode::CREATED, Json(CartView::of(&session))))
}

pub async fn update_quantity(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Json(request): Json<QuantityRequest>,
) -> Result<Json<CartView>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session
        .update_quantity(&ProductId::from(product_id), request.quantity)
        .map_err(shop_error_to_response)?;
    Ok(Json(CartView::of(&session)))
}

pub async fn increment_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session
        .increment(&ProductId::from(product_id))
        .map_err(shop_error_to_response)?;
    Ok(Json(CartView::of(&session)))
}

pub async fn decrement_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session
        .decrement(&ProductId::from(product_id))
        .map_err(shop_error_to_response)?;
    Ok(Json(CartView::of(&session)))
}

pub async fn remove_item(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<CartView>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session
        .remove_item(&ProductId::from(product_id))
        .map_err(shop_error_to_response)?;
    Ok(Json(CartView::of(&session)))
}

pub async fn clear_cart(State(state): State<AppState>) -> Result<Json<CartView>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session.clear_cart().map_err(shop_error_to_response)?;
    Ok(Json(CartView::of(&session)))
}

/// Price the cart for a delivery tier; without a tier only the subtotal is known
pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, ApiError> {
    let tier = match query.shipping.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<ShippingTier>().map_err(|_| {
            shop_error_to_response(ShopError::Validation(vec![FieldError {
                field: "shipping",
                message: format!("unknown delivery option: {}", raw),
            }]))
        })?),
        None => None,
    };

    let session = state.flow.session().lock().await;
    Ok(Json(session.quote(tier)))
}

pub async fn checkout_state(State(state): State<AppState>) -> Json<CheckoutState> {
    let session = state.flow.session().lock().await;
    Json(session.checkout().clone())
}

pub async fn open_checkout(State(state): State<AppState>) -> Result<Json<CheckoutState>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session.open_checkout().map_err(shop_error_to_response)?;
    Ok(Json(session.checkout().clone()))
}

/// Submit the checkout form and request a payment session
#[instrument(skip(state, form))]
pub async fn submit_checkout(
    State(state): State<AppState>,
    Json(form): Json<CheckoutForm>,
) -> Result<Json<SubmitCheckoutResponse>, ApiError> {
    let payment = state.flow.submit(form).await.map_err(|e| {
        warn!("Checkout submit failed: {}", e);
        shop_error_to_response(e)
    })?;

    if let Some(settings) = state.config.poll {
        let flow = state.flow.clone();
        let source = state.status.clone();
        let order_id = payment.order_id.clone();
        tokio::spawn(async move {
            match flow.await_confirmation(source.as_ref(), &order_id, settings).await {
                Ok(outcome) => info!("Order {} settled: {:?}", order_id, outcome),
                Err(e) => error!("Polling for order {} stopped: {}", order_id, e),
            }
        });
    }

    Ok(Json(SubmitCheckoutResponse {
        order_id: payment.order_id,
        payment_url: payment.payment_url,
    }))
}

pub async fn cancel_checkout(State(state): State<AppState>) -> Result<Json<CheckoutState>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session
        .cancel_checkout("cancelled by shopper")
        .map_err(shop_error_to_response)?;
    Ok(Json(session.checkout().clone()))
}

pub async fn dismiss_checkout(State(state): State<AppState>) -> Result<Json<CheckoutState>, ApiError> {
    let mut session = state.flow.session().lock().await;
    session.dismiss_checkout().map_err(shop_error_to_response)?;
    Ok(Json(session.checkout().clone()))
}

pub async fn theme(Query(query): Query<ThemeQuery>) -> Json<ThemeTokens> {
    Json(theme_for(
        query.route.as_deref().unwrap_or("/"),
        query.scroll.unwrap_or(0),
    ))
}

pub async fn pairing_state(State(state): State<AppState>) -> Json<PairingState> {
    Json(state.pairing.lock().await.clone())
}

/// Apply one `{ "event": ..., "data": ... }` frame from the messaging service
pub async fn pairing_event(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<PairingState>, ApiError> {
    let event = PairingEvent::from_frame(&body).map_err(shop_error_to_response)?;
    let mut pairing = state.pairing.lock().await;
    pairing.apply(event);
    Ok(Json(pairing.clone()))
}

/// Handle a signed payment notification
#[instrument(skip(state, headers, body))]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let secret = state.config.webhook_secret.as_deref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new("Payment webhooks are not configured", 503)),
        )
    })?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("Missing X-Signature header", 400)),
            )
        })?;

    let notification = verify_notification(secret, &body, signature, chrono::Utc::now().timestamp())
        .map_err(|e| {
            error!("Webhook verification failed: {}", e);
            shop_error_to_response(e)
        })?;

    info!(
        "Payment notification: order={}, status={:?}",
        notification.order_id, notification.status
    );

    match state
        .flow
        .settle(&notification.order_id, notification.status)
        .await
    {
        Ok(outcome) => Ok(Json(serde_json::json!({
            "received": true,
            "outcome": outcome,
        }))),
        // Redeliveries and notifications for closed checkouts
        Err(e @ (ShopError::InvalidTransition { .. } | ShopError::NotFound(_))) => {
            if notification.status == PaymentStatus::Approved {
                warn!(
                    order_id = %notification.order_id,
                    "Approved payment matches no open or abandoned checkout: {}", e
                );
            } else {
                info!("Ignoring notification for {}: {}", notification.order_id, e);
            }
            Ok(Json(serde_json::json!({
                "received": true,
                "ignored": true,
            })))
        }
        Err(e) => {
            error!("Failed to apply payment notification: {}", e);
            Err(shop_error_to_response(e))
        }
    }
}
