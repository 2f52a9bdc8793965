//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the shopper's session, the checkout flow and its collaborators,
//! the admin auth session and configuration.

use shop_client::{ApiClient, ApiPaymentGateway, ApiSalesLedger, WhatsAppNotifier};
use shop_core::{
    AuthSession, BoxedOrderNotifier, BoxedPaymentGateway, BoxedPaymentStatusSource,
    BoxedSalesLedger, CartPersistence, CheckoutFlow, FileTokenStore, JsonFileCart,
    MemoryTokenStore, PairingState, PollSettings, ShippingRates, StorefrontSession, TokenStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Shared secret for payment webhook signatures; webhooks are refused without it
    pub webhook_secret: Option<String>,
    /// Where the cart snapshot is kept between restarts
    pub cart_snapshot_path: Option<PathBuf>,
    /// Where the admin auth token is kept between restarts
    pub auth_token_path: Option<PathBuf>,
    /// Payment status polling after checkout; `None` relies on webhooks only
    pub poll: Option<PollSettings>,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = match std::env::var("PORT") {
            Ok(p) => p
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT is not a valid port: {}", p))?,
            Err(_) => 8080,
        };

        let poll_interval = env_secs("PAYMENT_POLL_INTERVAL_SECS", 5)?;
        let poll_timeout = env_secs("PAYMENT_POLL_TIMEOUT_SECS", 15 * 60)?;
        let poll = (poll_interval > 0).then(|| PollSettings {
            interval: Duration::from_secs(poll_interval),
            timeout: Duration::from_secs(poll_timeout),
        });

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            webhook_secret: std::env::var("PAYMENT_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            cart_snapshot_path: std::env::var("CART_SNAPSHOT_PATH").ok().map(PathBuf::from),
            auth_token_path: std::env::var("AUTH_TOKEN_PATH").ok().map(PathBuf::from),
            poll,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            webhook_secret: None,
            cart_snapshot_path: None,
            auth_token_path: None,
            poll: None,
        }
    }
}

fn env_secs(key: &str, default: u64) -> anyhow::Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} is not a number of seconds: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

/// External services the checkout talks to
#[derive(Clone)]
pub struct Collaborators {
    pub gateway: BoxedPaymentGateway,
    pub status: BoxedPaymentStatusSource,
    pub notifier: BoxedOrderNotifier,
    pub ledger: Option<BoxedSalesLedger>,
}

impl Collaborators {
    /// Everything backed by the storefront API
    pub fn from_api(api: &ApiClient) -> Self {
        let payments = Arc::new(ApiPaymentGateway::new(api.clone()));
        Self {
            gateway: payments.clone(),
            status: payments,
            notifier: Arc::new(WhatsAppNotifier::new(api.clone())),
            ledger: Some(Arc::new(ApiSalesLedger::new(api.clone()))),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Checkout flow (owns the shopper's session)
    pub flow: CheckoutFlow,
    /// Where polling reads payment status from
    pub status: BoxedPaymentStatusSource,
    /// Storefront API client (catalog, admin)
    pub api: ApiClient,
    /// Logged-in admin, if any
    pub auth: Arc<Mutex<AuthSession>>,
    /// Messaging channel pairing progress
    pub pairing: Arc<Mutex<PairingState>>,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create the state from environment variables and `config/shipping.toml`
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let api = ApiClient::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize API client: {}", e))?;
        let rates = load_shipping_rates()?;
        let collaborators = Collaborators::from_api(&api);

        Self::build(config, api, rates, collaborators)
    }

    /// Wire the state from explicit parts
    pub fn build(
        config: AppConfig,
        api: ApiClient,
        rates: ShippingRates,
        collaborators: Collaborators,
    ) -> anyhow::Result<Self> {
        let session = match &config.cart_snapshot_path {
            Some(path) => {
                let persistence: Arc<dyn CartPersistence> = Arc::new(JsonFileCart::new(path));
                StorefrontSession::with_persistence(rates, persistence)?
            }
            None => StorefrontSession::new(rates),
        };

        let token_store: Arc<dyn TokenStore> = match &config.auth_token_path {
            Some(path) => Arc::new(FileTokenStore::new(path)),
            None => Arc::new(MemoryTokenStore::default()),
        };
        let auth = AuthSession::load(token_store)?;

        let mut flow = CheckoutFlow::new(
            Arc::new(Mutex::new(session)),
            collaborators.gateway,
            collaborators.notifier,
        );
        if let Some(ledger) = collaborators.ledger {
            flow = flow.with_ledger(ledger);
        }

        Ok(Self {
            flow,
            status: collaborators.status,
            api,
            auth: Arc::new(Mutex::new(auth)),
            pairing: Arc::new(Mutex::new(PairingState::default())),
            config,
        })
    }
}

/// Load shipping rates from config file
pub fn load_shipping_rates() -> anyhow::Result<ShippingRates> {
    let config_paths = [
        "config/shipping.toml",
        "../config/shipping.toml",
        "../../config/shipping.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let rates = ShippingRates::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded shipping rates from {}", path);
            return Ok(rates);
        }
    }

    tracing::warn!("No shipping config found, using default rates");
    Ok(ShippingRates::default())
}
