//! # Payment Gateway
//!
//! Payment sessions are created through the storefront API, which talks to
//! the payment provider on our behalf. The whole order travels as a single
//! product: the title lists every line and the unit price is the order total.

use crate::client::{ApiClient, PROVIDER};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use shop_core::{
    Amount, OrderDraft, PaymentGateway, PaymentSession, PaymentStatus, PaymentStatusSource,
    ShopError, ShopResult,
};
use tracing::{debug, info, instrument};

/// `PaymentGateway` and `PaymentStatusSource` backed by the storefront API
#[derive(Debug, Clone)]
pub struct ApiPaymentGateway {
    client: ApiClient,
}

impl ApiPaymentGateway {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Serialize)]
struct CreatePaymentRequest<'a> {
    product: PaymentProduct<'a>,
    order_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PaymentProduct<'a> {
    title: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    unit_price: Amount,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct CreatePaymentResponse {
    #[serde(alias = "init_point", alias = "url")]
    payment_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentStatusResponse {
    status: String,
}

fn parse_status(raw: &str) -> ShopResult<PaymentStatus> {
    match raw.to_ascii_lowercase().as_str() {
        "pending" | "in_process" => Ok(PaymentStatus::Pending),
        "approved" => Ok(PaymentStatus::Approved),
        "rejected" => Ok(PaymentStatus::Rejected),
        "cancelled" | "canceled" => Ok(PaymentStatus::Cancelled),
        other => Err(ShopError::Provider {
            provider: PROVIDER.to_string(),
            message: format!("unknown payment status: {}", other),
        }),
    }
}

#[async_trait]
impl PaymentGateway for ApiPaymentGateway {
    #[instrument(skip(self, draft), fields(order_id = %draft.id(), total = %draft.total()))]
    async fn create_payment(&self, draft: &OrderDraft) -> ShopResult<PaymentSession> {
        let title = draft.payment_title();
        let body = CreatePaymentRequest {
            product: PaymentProduct {
                title: &title,
                unit_price: draft.total(),
                quantity: 1,
            },
            order_id: draft.id(),
        };

        debug!("Creating payment session for {:?}", title);

        let request = self
            .client
            .request(Method::POST, &["payment", "create_payment"])?
            .json(&body);
        let response: CreatePaymentResponse = self.client.send(request).await?;

        let payment_url = response.payment_url.ok_or_else(|| ShopError::Provider {
            provider: PROVIDER.to_string(),
            message: "No payment URL returned".to_string(),
        })?;

        info!("Created payment session for order {}", draft.id());
        Ok(PaymentSession::new(draft.id(), payment_url))
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

#[async_trait]
impl PaymentStatusSource for ApiPaymentGateway {
    #[instrument(skip(self))]
    async fn payment_status(&self, order_id: &str) -> ShopResult<PaymentStatus> {
        let request = self
            .client
            .request(Method::GET, &["payment", "status", order_id])?;
        let response: PaymentStatusResponse = self.client.send(request).await?;

        parse_status(&response.status)
    }
}
