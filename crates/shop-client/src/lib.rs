//! # shop-client
//!
//! HTTP collaborators for the storefront.
//!
//! This crate provides:
//!
//! 1. **ApiClient** - typed access to the storefront REST API
//!    - Catalog reads and admin product management
//!    - Login, user creation and role lookup
//!    - Sales ledger and monthly closings
//!
//! 2. **Checkout collaborators** - implementations of the `shop-core` traits
//!    - `ApiPaymentGateway`: `PaymentGateway` + `PaymentStatusSource`
//!    - `WhatsAppNotifier`: `OrderNotifier`
//!    - `ApiSalesLedger`: `SalesLedger`
//!
//! 3. **ImageUploader** - Cloudinary uploads for product images
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shop_client::{ApiClient, ApiPaymentGateway, WhatsAppNotifier};
//! use shop_core::CheckoutFlow;
//!
//! let api = ApiClient::from_env()?;
//! let catalog = api.list_products().await?;
//!
//! let flow = CheckoutFlow::new(
//!     session,
//!     Arc::new(ApiPaymentGateway::new(api.clone())),
//!     Arc::new(WhatsAppNotifier::new(api.clone())),
//! );
//! ```

pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod ledger;
pub mod notify;
pub mod payment;
pub mod upload;

// Re-exports
pub use auth::Credentials;
pub use client::ApiClient;
pub use config::{ApiConfig, UploadConfig};
pub use ledger::ApiSalesLedger;
pub use notify::WhatsAppNotifier;
pub use payment::ApiPaymentGateway;
pub use upload::ImageUploader;
