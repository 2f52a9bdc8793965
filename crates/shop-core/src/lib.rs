//! # shop-core
//!
//! Core types and state machines for the storefront.
//!
//! This crate provides:
//! - `CartStore` and `LineItem`: the session cart with snapshot semantics
//! - Price and shipping computation (`subtotal`, `total`, `Quote`, `format_currency`)
//! - `CheckoutSequencer`: the checkout state machine
//! - `StorefrontSession` and `CheckoutFlow`: cart + checkout driven against collaborators
//! - Collaborator traits (`PaymentGateway`, `PaymentStatusSource`, `OrderNotifier`, `SalesLedger`)
//! - Catalog, sales ledger, auth session, pairing and theme types
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{CheckoutForm, CheckoutFlow, LineItem, ShippingRates, ShippingTier, StorefrontSession};
//!
//! let mut session = StorefrontSession::new(ShippingRates::default());
//! session.add_item(LineItem::new(1u64, "Remera", dec!(1000)).with_quantity(2))?;
//! session.open_checkout()?;
//!
//! let flow = CheckoutFlow::new(Arc::new(Mutex::new(session)), gateway, notifier);
//! let payment = flow.submit(form).await?;
//! // Redirect the shopper to payment.payment_url, then confirm via webhook or polling
//! flow.confirm_payment(&payment.order_id).await?;
//! ```

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod ledger;
pub mod money;
pub mod order;
pub mod pairing;
pub mod persist;
pub mod pricing;
pub mod session;
pub mod theme;

// Re-exports for convenience
pub use cart::{Cart, CartStore, LineItem};
pub use catalog::{Product, ProductCatalog, ProductDraft, ProductId, Variant};
pub use checkout::{CheckoutSequencer, CheckoutState, Ticket};
pub use error::{FieldError, ShopError, ShopResult};
pub use flow::{CheckoutFlow, PaymentOutcome, PollSettings, SharedSession, StorefrontSession};
pub use gateway::{
    BoxedOrderNotifier, BoxedPaymentGateway, BoxedPaymentStatusSource, BoxedSalesLedger,
    OrderNotifier, PaymentGateway, PaymentStatusSource, SalesLedger,
};
pub use ledger::{Month, Recaudation, Sale};
pub use money::{format_currency, Amount, Currency};
pub use order::{CheckoutForm, Destination, OrderDraft, PaymentSession, PaymentStatus, ShippingDetails};
pub use pairing::{PairingEvent, PairingState, PairingStatus};
pub use persist::{
    CartPersistence, FileTokenStore, JsonFileCart, MemoryTokenStore, StoredLogin, TokenStore,
};
pub use pricing::{Quote, ShippingRates, ShippingTier};
pub use session::{AuthSession, Role};
pub use theme::{theme_for, ThemeTokens};
