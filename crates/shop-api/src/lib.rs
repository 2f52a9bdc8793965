//! # shop-api
//!
//! HTTP service layer for the storefront.
//!
//! This crate provides:
//! - Axum-based HTTP server holding the shopper's cart and checkout
//! - REST endpoints for catalog, cart, quote, checkout and admin
//! - Signed payment webhook that confirms orders
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List products |
//! | POST | `/api/v1/cart/items` | Add to cart |
//! | GET | `/api/v1/quote` | Price the cart |
//! | POST | `/api/v1/checkout/submit` | Start payment |
//! | POST | `/webhook/payment` | Payment notification |

pub mod admin;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod webhook;

pub use routes::create_router;
pub use state::{AppConfig, AppState, Collaborators};
