//! # Storefront Error Types
//!
//! Typed error handling for the storefront core.
//! All cart, checkout and collaborator operations return `Result<T, ShopError>`.

use crate::catalog::ProductId;
use serde::Serialize;
use thiserror::Error;

/// A single field-scoped validation failure on the checkout form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Form field name (e.g. "cellphone", "address")
    pub field: &'static str,
    /// Human readable message
    pub message: String,
}

impl FieldError {
    pub fn required(field: &'static str) -> Self {
        Self {
            field,
            message: format!("{} is required", field),
        }
    }

    /// A field that is present but holds an unacceptable value
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn is_missing(&self) -> bool {
        self.message.ends_with("is required")
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Checkout form validation failed (local, recoverable)
    #[error("Validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),

    /// Product is already in the cart (informational)
    #[error("Product already in cart: {product_id}")]
    DuplicateItem { product_id: ProductId },

    /// Network/HTTP error talking to a collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Collaborator answered with an error status
    #[error("Provider error [{provider}]: {message}")]
    Provider { provider: String, message: String },

    /// Missing or rejected credentials
    #[error("Authentication required: {0}")]
    Auth(String),

    /// Payment notification signature could not be verified
    #[error("Webhook verification failed: {0}")]
    WebhookVerificationFailed(String),

    /// Resource not found (product, sale, order)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cart mutation attempted while a checkout is pending
    #[error("Checkout in progress, the cart is locked")]
    CheckoutInProgress,

    /// Checkout event not valid in the current state
    #[error("Invalid checkout transition: {event} while {state}")]
    InvalidTransition { state: String, event: String },

    /// Configuration errors (missing keys, invalid config)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persisted state could not be read or written
    #[error("Storage error: {0}")]
    Storage(String),
}

fn join_fields(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ShopError {
    /// Returns true if the user can retry the same action unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, ShopError::Network(_) | ShopError::Provider { .. })
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation(_) => 422,
            ShopError::DuplicateItem { .. } => 409,
            ShopError::Network(_) => 503,
            ShopError::Provider { .. } => 502,
            ShopError::Auth(_) => 401,
            ShopError::WebhookVerificationFailed(_) => 401,
            ShopError::NotFound(_) => 404,
            ShopError::CheckoutInProgress => 409,
            ShopError::InvalidTransition { .. } => 409,
            ShopError::Configuration(_) => 500,
            ShopError::Serialization(_) => 500,
            ShopError::Storage(_) => 500,
        }
    }

    /// Text shown to the shopper for this error
    pub fn user_message(&self) -> String {
        match self {
            ShopError::Validation(fields) if fields.iter().all(FieldError::is_missing) => {
                format!("Please complete the required fields: {}", field_names(fields))
            }
            ShopError::Validation(fields) => format!("Please check: {}", join_fields(fields)),
            ShopError::DuplicateItem { .. } => "This product is already in your cart".to_string(),
            ShopError::Network(_) | ShopError::Provider { .. } => {
                "We could not reach the payment service, please try again".to_string()
            }
            ShopError::Auth(_) => "Please log in to continue".to_string(),
            ShopError::WebhookVerificationFailed(_) => "Invalid notification signature".to_string(),
            ShopError::CheckoutInProgress => {
                "Finish or cancel the current checkout before changing the cart".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Field errors carried by a validation failure
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ShopError::Validation(fields) => fields,
            _ => &[],
        }
    }
}

fn field_names(fields: &[FieldError]) -> String {
    fields.iter().map(|f| f.field).collect::<Vec<_>>().join(", ")
}

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Serialization(err.to_string())
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;
