//! # Collaborator Traits
//!
//! Seams to the external services the checkout depends on. The HTTP
//! implementations live in `shop-client`; tests plug in in-memory fakes.
//!
//! ```text
//!             ┌──────────────────────┐
//!  submit ──▶ │   PaymentGateway     │ ── create_payment() ──▶ payment_url
//!             ├──────────────────────┤
//!  poll   ──▶ │ PaymentStatusSource  │ ── payment_status() ──▶ pending/approved/...
//!             ├──────────────────────┤
//!  success ─▶ │   OrderNotifier      │ ── notify() ──▶ store messaging channel
//!             ├──────────────────────┤
//!  success ─▶ │   SalesLedger        │ ── record_sale() ──▶ admin sales ledger
//!             └──────────────────────┘
//! ```

use crate::error::ShopResult;
use crate::ledger::Sale;
use crate::order::{OrderDraft, PaymentSession, PaymentStatus};
use async_trait::async_trait;
use std::sync::Arc;

/// Creates payment sessions for order drafts.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Request a payment session and return the redirect URL.
    async fn create_payment(&self, draft: &OrderDraft) -> ShopResult<PaymentSession>;

    /// Provider name (for logging).
    fn provider_name(&self) -> &'static str;
}

/// Reports whether an order has been paid.
#[async_trait]
pub trait PaymentStatusSource: Send + Sync {
    async fn payment_status(&self, order_id: &str) -> ShopResult<PaymentStatus>;
}

/// Delivers order confirmations to the store's messaging channel.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    async fn notify(&self, message: &str) -> ShopResult<()>;
}

/// Records completed sales for the admin ledger.
#[async_trait]
pub trait SalesLedger: Send + Sync {
    async fn record_sale(&self, sale: &Sale) -> ShopResult<()>;
}

pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;
pub type BoxedPaymentStatusSource = Arc<dyn PaymentStatusSource>;
pub type BoxedOrderNotifier = Arc<dyn OrderNotifier>;
pub type BoxedSalesLedger = Arc<dyn SalesLedger>;
