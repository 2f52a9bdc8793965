//! # Storefront Session & Checkout Flow
//!
//! [`StorefrontSession`] pairs the cart store with the checkout sequencer and
//! enforces the rules that span both: the cart is locked while a payment is in
//! flight and is cleared only after the payment is confirmed.
//!
//! [`CheckoutFlow`] drives the asynchronous part of a checkout against the
//! collaborators. The session lock is never held across a collaborator call;
//! tickets make sure a late payment response cannot revive a cancelled
//! checkout.

use crate::cart::{Cart, CartStore, LineItem};
use crate::catalog::ProductId;
use crate::checkout::{CheckoutSequencer, CheckoutState, Ticket};
use crate::error::{ShopError, ShopResult};
use crate::gateway::{BoxedOrderNotifier, BoxedPaymentGateway, BoxedSalesLedger, PaymentStatusSource};
use crate::ledger::Sale;
use crate::order::{CheckoutForm, OrderDraft, PaymentSession, PaymentStatus};
use crate::persist::CartPersistence;
use crate::pricing::{Quote, ShippingRates, ShippingTier};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

pub struct StorefrontSession {
    cart: CartStore,
    checkout: CheckoutSequencer,
    rates: ShippingRates,
    persistence: Option<Arc<dyn CartPersistence>>,
}

impl std::fmt::Debug for StorefrontSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontSession")
            .field("cart", &self.cart)
            .field("checkout", &self.checkout.state().name())
            .field("rates", &self.rates)
            .finish()
    }
}

impl StorefrontSession {
    pub fn new(rates: ShippingRates) -> Self {
        Self {
            cart: CartStore::new(),
            checkout: CheckoutSequencer::new(),
            rates,
            persistence: None,
        }
    }

    /// Start a session from the persisted cart, saving every change back
    pub fn with_persistence(
        rates: ShippingRates,
        persistence: Arc<dyn CartPersistence>,
    ) -> ShopResult<Self> {
        let cart = match persistence.load()? {
            Some(cart) => {
                info!("Restored cart with {} lines", cart.len());
                CartStore::rehydrate(cart)
            }
            None => CartStore::new(),
        };
        Ok(Self {
            cart,
            checkout: CheckoutSequencer::new(),
            rates,
            persistence: Some(persistence),
        })
    }

    pub fn cart(&self) -> Arc<Cart> {
        self.cart.snapshot()
    }

    pub fn checkout(&self) -> &CheckoutState {
        self.checkout.state()
    }

    pub fn rates(&self) -> &ShippingRates {
        &self.rates
    }

    /// Order id awaiting payment, if any
    pub fn checkout_pending_order(&self) -> Option<&str> {
        self.checkout.pending_order_id()
    }

    pub fn quote(&self, tier: Option<ShippingTier>) -> Quote {
        Quote::for_cart(&self.cart.snapshot(), tier, &self.rates)
    }

    fn ensure_unlocked(&self) -> ShopResult<()> {
        if self.checkout.locks_cart() {
            return Err(ShopError::CheckoutInProgress);
        }
        Ok(())
    }

    /// Save `cart` before the session lock is released, so snapshots reach
    /// disk in mutation order. A snapshot is one small JSON document (a few
    /// hundred bytes per line item), written synchronously on the caller's
    /// worker thread.
    fn persist(&self, cart: Arc<Cart>) -> Arc<Cart> {
        if let Some(storage) = &self.persistence {
            // The in-memory cart stays authoritative when the disk write fails.
            if let Err(e) = storage.save(&cart) {
                warn!("Failed to persist cart: {}", e);
            }
        }
        cart
    }

    pub fn add_item(&mut self, item: LineItem) -> ShopResult<Arc<Cart>> {
        self.ensure_unlocked()?;
        let cart = self.cart.add(item)?;
        Ok(self.persist(cart))
    }

    pub fn update_quantity(&mut self, product_id: &ProductId, quantity: u32) -> ShopResult<Arc<Cart>> {
        self.ensure_unlocked()?;
        let cart = self.cart.update_quantity(product_id, quantity);
        Ok(self.persist(cart))
    }

    pub fn increment(&mut self, product_id: &ProductId) -> ShopResult<Arc<Cart>> {
        self.ensure_unlocked()?;
        let cart = self.cart.increment(product_id);
        Ok(self.persist(cart))
    }

    pub fn decrement(&mut self, product_id: &ProductId) -> ShopResult<Arc<Cart>> {
        self.ensure_unlocked()?;
        let cart = self.cart.decrement(product_id);
        Ok(self.persist(cart))
    }

    pub fn remove_item(&mut self, product_id: &ProductId) -> ShopResult<Arc<Cart>> {
        self.ensure_unlocked()?;
        let cart = self.cart.remove(product_id);
        Ok(self.persist(cart))
    }

    /// "Empty cart" button
    pub fn clear_cart(&mut self) -> ShopResult<Arc<Cart>> {
        self.ensure_unlocked()?;
        let cart = self.cart.clear();
        Ok(self.persist(cart))
    }

    pub fn open_checkout(&mut self) -> ShopResult<()> {
        let cart = self.cart.snapshot();
        self.checkout.open(&cart)
    }

    pub fn submit_checkout(&mut self, form: CheckoutForm) -> ShopResult<(Ticket, OrderDraft)> {
        let cart = self.cart.snapshot();
        self.checkout.submit(form, &cart, &self.rates)
    }

    pub fn payment_created(&mut self, ticket: Ticket, session: PaymentSession) -> ShopResult<()> {
        if self.checkout.payment_created(ticket, session) {
            Ok(())
        } else {
            Err(ShopError::InvalidTransition {
                state: self.checkout.state().name().to_string(),
                event: "payment session created".to_string(),
            })
        }
    }

    pub fn payment_failed(&mut self, ticket: Ticket, error: &ShopError) -> bool {
        self.checkout.payment_failed(ticket, error)
    }

    /// Confirm the payment and clear the cart, in that order.
    pub fn complete_payment(&mut self, order_id: &str) -> ShopResult<OrderDraft> {
        let draft = self.checkout.confirm(order_id)?;
        let cart = self.cart.clear();
        self.persist(cart);
        Ok(draft)
    }

    pub fn reject_payment(&mut self, order_id: &str, message: impl Into<String>) -> ShopResult<()> {
        self.checkout.reject(order_id, message)
    }

    pub fn cancel_checkout(&mut self, reason: impl Into<String>) -> ShopResult<()> {
        self.checkout.cancel(reason)
    }

    pub fn dismiss_checkout(&mut self) -> ShopResult<()> {
        self.checkout.dismiss()
    }

    /// Draft of `order_id` if it was cancelled while awaiting payment
    pub fn take_abandoned_order(&mut self, order_id: &str) -> Option<OrderDraft> {
        self.checkout.take_abandoned(order_id)
    }
}

pub type SharedSession = Arc<Mutex<StorefrontSession>>;

/// How a pending payment ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Succeeded { draft: OrderDraft },
    Failed { message: String },
    Cancelled { reason: String },
}

/// Polling cadence while waiting for a payment confirmation
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(15 * 60),
        }
    }
}

pub const CONFIRMATION_TIMEOUT_REASON: &str = "payment confirmation timed out";

#[derive(Clone)]
pub struct CheckoutFlow {
    session: SharedSession,
    gateway: BoxedPaymentGateway,
    notifier: BoxedOrderNotifier,
    ledger: Option<BoxedSalesLedger>,
}

impl CheckoutFlow {
    pub fn new(session: SharedSession, gateway: BoxedPaymentGateway, notifier: BoxedOrderNotifier) -> Self {
        Self {
            session,
            gateway,
            notifier,
            ledger: None,
        }
    }

    /// Builder: record sales after each successful payment
    pub fn with_ledger(mut self, ledger: BoxedSalesLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Validate the form, request a payment session and return where to send
    /// the shopper. On failure the form is back open with the error shown.
    #[instrument(skip(self, form), fields(provider = self.gateway.provider_name()))]
    pub async fn submit(&self, form: CheckoutForm) -> ShopResult<PaymentSession> {
        let (ticket, draft) = self.session.lock().await.submit_checkout(form)?;

        let result = self.gateway.create_payment(&draft).await;

        let mut session = self.session.lock().await;
        match result {
            Ok(payment) => {
                session.payment_created(ticket, payment.clone())?;
                info!(order_id = %draft.id(), "redirecting to payment");
                Ok(payment)
            }
            Err(err) => {
                warn!(order_id = %draft.id(), "payment request failed: {}", err);
                session.payment_failed(ticket, &err);
                Err(err)
            }
        }
    }

    /// Payment confirmed: clear the cart, then send exactly one confirmation
    /// built from the order snapshot, then record the sales.
    #[instrument(skip(self))]
    pub async fn confirm_payment(&self, order_id: &str) -> ShopResult<OrderDraft> {
        let draft = self.session.lock().await.complete_payment(order_id)?;
        self.fulfil(&draft).await;
        Ok(draft)
    }

    async fn fulfil(&self, draft: &OrderDraft) {
        let order_id = draft.id();
        if let Err(e) = self.notifier.notify(&draft.confirmation_message()).await {
            warn!("Order {} paid but confirmation was not delivered: {}", order_id, e);
        }

        if let Some(ledger) = &self.ledger {
            for sale in Sale::from_order(draft, Utc::now()) {
                if let Err(e) = ledger.record_sale(&sale).await {
                    warn!("Failed to record sale '{}' for order {}: {}", sale.title, order_id, e);
                }
            }
        }
    }

    /// Approval for an order the shopper already gave up on. The money was
    /// taken, so the confirmation and sales still go out; the cart and the
    /// checkout state are left alone.
    async fn confirm_late_payment(&self, order_id: &str, err: ShopError) -> ShopResult<OrderDraft> {
        let abandoned = self.session.lock().await.take_abandoned_order(order_id);
        let Some(draft) = abandoned else {
            return Err(err);
        };
        warn!(order_id, "payment approved after the checkout was cancelled");
        self.fulfil(&draft).await;
        Ok(draft)
    }

    /// Apply a payment status reported by the provider. `Ok(None)` while the
    /// payment is still pending.
    pub async fn settle(&self, order_id: &str, status: PaymentStatus) -> ShopResult<Option<PaymentOutcome>> {
        match status {
            PaymentStatus::Pending => Ok(None),
            PaymentStatus::Approved => {
                let draft = match self.confirm_payment(order_id).await {
                    Ok(draft) => draft,
                    Err(e @ (ShopError::InvalidTransition { .. } | ShopError::NotFound(_))) => {
                        self.confirm_late_payment(order_id, e).await?
                    }
                    Err(e) => return Err(e),
                };
                Ok(Some(PaymentOutcome::Succeeded { draft }))
            }
            PaymentStatus::Rejected => {
                let message = "The payment was rejected".to_string();
                self.session.lock().await.reject_payment(order_id, message.clone())?;
                Ok(Some(PaymentOutcome::Failed { message }))
            }
            PaymentStatus::Cancelled => {
                let reason = "The payment was cancelled".to_string();
                let mut session = self.session.lock().await;
                if session.checkout_pending_order() != Some(order_id) {
                    return Err(ShopError::NotFound(format!("order {}", order_id)));
                }
                session.cancel_checkout(reason.clone())?;
                Ok(Some(PaymentOutcome::Cancelled { reason }))
            }
        }
    }

    /// Poll the provider until the payment settles, the checkout is closed
    /// elsewhere (webhook, shopper cancel) or `settings.timeout` elapses,
    /// in which case the checkout is cancelled.
    #[instrument(skip(self, source, settings))]
    pub async fn await_confirmation(
        &self,
        source: &dyn PaymentStatusSource,
        order_id: &str,
        settings: PollSettings,
    ) -> ShopResult<PaymentOutcome> {
        let deadline = tokio::time::Instant::now() + settings.timeout;

        loop {
            if let Some(outcome) = self.resolved_outcome(order_id).await {
                return Ok(outcome);
            }

            match source.payment_status(order_id).await {
                Ok(status) => match self.settle(order_id, status).await {
                    Ok(Some(outcome)) => return Ok(outcome),
                    Ok(None) => {}
                    // Settled by a webhook or the shopper since the check above
                    Err(ShopError::InvalidTransition { .. } | ShopError::NotFound(_)) => {
                        if let Some(outcome) = self.resolved_outcome(order_id).await {
                            return Ok(outcome);
                        }
                    }
                    Err(e) => return Err(e),
                },
                Err(e) => warn!("Payment status poll failed for {}: {}", order_id, e),
            }

            if tokio::time::Instant::now() + settings.interval > deadline {
                let mut session = self.session.lock().await;
                if session.checkout_pending_order() == Some(order_id) {
                    session.cancel_checkout(CONFIRMATION_TIMEOUT_REASON)?;
                    return Ok(PaymentOutcome::Cancelled {
                        reason: CONFIRMATION_TIMEOUT_REASON.to_string(),
                    });
                }
                drop(session);
                continue;
            }
            tokio::time::sleep(settings.interval).await;
        }
    }

    /// Outcome of the checkout if it is no longer waiting on `order_id`
    async fn resolved_outcome(&self, order_id: &str) -> Option<PaymentOutcome> {
        let session = self.session.lock().await;
        match session.checkout() {
            CheckoutState::AwaitingPaymentResult { draft, .. } if draft.id() == order_id => None,
            CheckoutState::Succeeded { draft } => Some(PaymentOutcome::Succeeded { draft: draft.clone() }),
            CheckoutState::Failed { message } => Some(PaymentOutcome::Failed {
                message: message.clone(),
            }),
            CheckoutState::Cancelled { reason } => Some(PaymentOutcome::Cancelled {
                reason: reason.clone(),
            }),
            _ => Some(PaymentOutcome::Cancelled {
                reason: "checkout closed".to_string(),
            }),
        }
    }
}
