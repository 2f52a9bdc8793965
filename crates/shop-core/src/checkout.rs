//! # Checkout Sequencer
//!
//! State machine for one checkout attempt.
//!
//! ```text
//!  Idle ──open──▶ FormOpen ──submit──▶ Submitting ──created──▶ AwaitingPaymentResult
//!                   ▲  │                   │                      │        │       │
//!                   │  └─invalid form──┘   │                   confirm  reject  timeout/cancel
//!                   └────payment failed────┘                      ▼        ▼       ▼
//!                                                             Succeeded  Failed  Cancelled
//!                                                                  └──dismiss──▶ Idle
//! ```
//!
//! Each submission gets a [`Ticket`]. Payment responses are applied only when
//! their ticket matches the submission still in flight, so a response that
//! arrives after the shopper cancelled is dropped.

use crate::cart::Cart;
use crate::error::{FieldError, ShopError, ShopResult};
use crate::order::{CheckoutForm, OrderDraft, PaymentSession};
use crate::pricing::ShippingRates;
use serde::Serialize;
use tracing::{debug, info};

/// Identifies one submission of the checkout form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutState {
    Idle,
    FormOpen {
        form: CheckoutForm,
        /// Last payment-request error, kept so the shopper can retry
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        field_errors: Vec<FieldError>,
    },
    Submitting {
        ticket: Ticket,
        form: CheckoutForm,
        draft: OrderDraft,
    },
    AwaitingPaymentResult {
        draft: OrderDraft,
        session: PaymentSession,
    },
    Succeeded {
        draft: OrderDraft,
    },
    Cancelled {
        reason: String,
    },
    Failed {
        message: String,
    },
}

impl CheckoutState {
    pub fn name(&self) -> &'static str {
        match self {
            CheckoutState::Idle => "idle",
            CheckoutState::FormOpen { .. } => "form_open",
            CheckoutState::Submitting { .. } => "submitting",
            CheckoutState::AwaitingPaymentResult { .. } => "awaiting_payment_result",
            CheckoutState::Succeeded { .. } => "succeeded",
            CheckoutState::Cancelled { .. } => "cancelled",
            CheckoutState::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug)]
pub struct CheckoutSequencer {
    state: CheckoutState,
    next_ticket: u64,
    /// Last order cancelled while its payment was pending
    abandoned: Option<OrderDraft>,
}

impl Default for CheckoutSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSequencer {
    pub fn new() -> Self {
        Self {
            state: CheckoutState::Idle,
            next_ticket: 1,
            abandoned: None,
        }
    }

    pub fn state(&self) -> &CheckoutState {
        &self.state
    }

    fn invalid(&self, event: &str) -> ShopError {
        ShopError::InvalidTransition {
            state: self.state.name().to_string(),
            event: event.to_string(),
        }
    }

    /// True while the cart must not change
    pub fn locks_cart(&self) -> bool {
        matches!(
            self.state,
            CheckoutState::Submitting { .. } | CheckoutState::AwaitingPaymentResult { .. }
        )
    }

    /// Order waiting for payment confirmation, if any
    pub fn pending_order_id(&self) -> Option<&str> {
        match &self.state {
            CheckoutState::AwaitingPaymentResult { draft, .. } => Some(draft.id()),
            _ => None,
        }
    }

    /// Open the checkout form. Reopening an open form is a no-op.
    pub fn open(&mut self, cart: &Cart) -> ShopResult<()> {
        match self.state {
            CheckoutState::FormOpen { .. } => Ok(()),
            CheckoutState::Idle if cart.is_empty() => Err(self.invalid("open with empty cart")),
            CheckoutState::Idle => {
                self.state = CheckoutState::FormOpen {
                    form: CheckoutForm::default(),
                    error: None,
                    field_errors: Vec::new(),
                };
                Ok(())
            }
            _ => Err(self.invalid("open")),
        }
    }

    /// Validate the form and freeze the order.
    ///
    /// Invalid forms leave the sequencer in `FormOpen` with the field errors
    /// recorded; nothing is sent anywhere.
    pub fn submit(
        &mut self,
        form: CheckoutForm,
        cart: &Cart,
        rates: &ShippingRates,
    ) -> ShopResult<(Ticket, OrderDraft)> {
        if !matches!(self.state, CheckoutState::FormOpen { .. }) {
            return Err(self.invalid("submit"));
        }

        let details = match form.validate() {
            Ok(details) => details,
            Err(err) => {
                self.state = CheckoutState::FormOpen {
                    form,
                    error: None,
                    field_errors: err.field_errors().to_vec(),
                };
                return Err(err);
            }
        };

        let draft = OrderDraft::new(cart, details, rates)?;
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        info!(order_id = %draft.id(), total = %draft.total(), "checkout submitted");
        self.state = CheckoutState::Submitting {
            ticket,
            form,
            draft: draft.clone(),
        };
        Ok((ticket, draft))
    }

    /// The payment collaborator returned a session. Returns false when the
    /// response belongs to a submission that is no longer in flight.
    pub fn payment_created(&mut self, ticket: Ticket, session: PaymentSession) -> bool {
        match std::mem::replace(&mut self.state, CheckoutState::Idle) {
            CheckoutState::Submitting {
                ticket: current,
                draft,
                ..
            } if current == ticket => {
                debug!(order_id = %draft.id(), url = %session.payment_url, "awaiting payment");
                self.state = CheckoutState::AwaitingPaymentResult { draft, session };
                true
            }
            other => {
                debug!(?ticket, state = other.name(), "dropping stale payment session");
                self.state = other;
                false
            }
        }
    }

    /// The payment request failed. The form comes back with its values and
    /// the error message so the shopper can retry.
    pub fn payment_failed(&mut self, ticket: Ticket, error: &ShopError) -> bool {
        match std::mem::replace(&mut self.state, CheckoutState::Idle) {
            CheckoutState::Submitting {
                ticket: current,
                form,
                ..
            } if current == ticket => {
                self.state = CheckoutState::FormOpen {
                    form,
                    error: Some(error.user_message()),
                    field_errors: Vec::new(),
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    /// Payment confirmed. Hands back the draft so the caller can clear the
    /// cart and send the confirmation.
    pub fn confirm(&mut self, order_id: &str) -> ShopResult<OrderDraft> {
        match &self.state {
            CheckoutState::AwaitingPaymentResult { draft, .. } if draft.id() == order_id => {
                let draft = draft.clone();
                info!(order_id, "payment confirmed");
                self.state = CheckoutState::Succeeded {
                    draft: draft.clone(),
                };
                Ok(draft)
            }
            CheckoutState::AwaitingPaymentResult { .. } => {
                Err(ShopError::NotFound(format!("order {}", order_id)))
            }
            _ => Err(self.invalid("confirm payment")),
        }
    }

    /// The provider rejected the payment
    pub fn reject(&mut self, order_id: &str, message: impl Into<String>) -> ShopResult<()> {
        match &self.state {
            CheckoutState::AwaitingPaymentResult { draft, .. } if draft.id() == order_id => {
                self.state = CheckoutState::Failed {
                    message: message.into(),
                };
                Ok(())
            }
            CheckoutState::AwaitingPaymentResult { .. } => {
                Err(ShopError::NotFound(format!("order {}", order_id)))
            }
            _ => Err(self.invalid("reject payment")),
        }
    }

    /// Abandon the checkout (modal closed, payment abandoned, timeout)
    pub fn cancel(&mut self, reason: impl Into<String>) -> ShopResult<()> {
        match self.state {
            CheckoutState::FormOpen { .. }
            | CheckoutState::Submitting { .. }
            | CheckoutState::AwaitingPaymentResult { .. } => {
                if let CheckoutState::AwaitingPaymentResult { draft, .. } = &self.state {
                    self.abandoned = Some(draft.clone());
                }
                let reason = reason.into();
                info!(from = self.state.name(), %reason, "checkout cancelled");
                self.state = CheckoutState::Cancelled { reason };
                Ok(())
            }
            _ => Err(self.invalid("cancel")),
        }
    }

    /// Hand back the draft of an order that was cancelled while its payment
    /// was pending, at most once. Used when the provider approves the payment
    /// after the shopper gave up on it.
    pub fn take_abandoned(&mut self, order_id: &str) -> Option<OrderDraft> {
        let matches = self
            .abandoned
            .as_ref()
            .map(|draft| draft.id() == order_id)
            .unwrap_or(false);
        if matches {
            self.abandoned.take()
        } else {
            None
        }
    }

    /// Close the result dialog
    pub fn dismiss(&mut self) -> ShopResult<()> {
        match self.state {
            CheckoutState::Succeeded { .. }
            | CheckoutState::Failed { .. }
            | CheckoutState::Cancelled { .. } => {
                self.state = CheckoutState::Idle;
                Ok(())
            }
            CheckoutState::Idle => Ok(()),
            _ => Err(self.invalid("dismiss")),
        }
    }
}
