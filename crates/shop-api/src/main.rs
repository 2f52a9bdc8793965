//! # Storefront
//!
//! Session service for the storefront: cart, checkout and payment confirmation.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export SHOP_API_BASE_URL=https://api.example.com
//! export PAYMENT_WEBHOOK_SECRET=whsec_...
//!
//! # Run the server
//! storefront
//! ```

use shop_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Storefront API: {}", state.api.config().base_url);
    {
        let session = state.flow.session().lock().await;
        info!("Cart restored with {} lines", session.cart().len());
    }
    if state.config.webhook_secret.is_none() {
        info!("PAYMENT_WEBHOOK_SECRET not set, payment confirmation relies on polling");
    }

    let app = routes::create_router(state);

    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/v1/checkout/submit", addr);
        info!("Webhook: POST http://{}/webhook/payment", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
