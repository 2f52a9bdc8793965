//! # Order Types
//!
//! Checkout form, order drafts and payment session types.

use crate::cart::{Cart, LineItem};
use crate::error::{FieldError, ShopError, ShopResult};
use crate::money::{format_currency, Amount, Currency};
use crate::pricing::{ShippingRates, ShippingTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Raw checkout form as typed by the shopper; every field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub shipping: Option<ShippingTier>,
    #[serde(default)]
    pub cellphone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl CheckoutForm {
    /// Validate every field at once.
    ///
    /// Either all required fields are present and a [`ShippingDetails`] is
    /// returned, or every missing field is reported together.
    pub fn validate(&self) -> ShopResult<ShippingDetails> {
        let mut errors = Vec::new();

        if self.shipping.is_none() {
            errors.push(FieldError {
                field: "shipping",
                message: "select a delivery option".to_string(),
            });
        }
        let cellphone = filled(&self.cellphone);
        if cellphone.is_none() {
            errors.push(FieldError::required("cellphone"));
        }

        let needs_address = self.shipping.map(|t| t.requires_address()).unwrap_or(false);
        let address = filled(&self.address);
        let city = filled(&self.city);
        let province = filled(&self.province);
        if needs_address {
            for (field, value) in [("address", &address), ("city", &city), ("province", &province)] {
                if value.is_none() {
                    errors.push(FieldError::required(field));
                }
            }
        }

        match (self.shipping, cellphone) {
            (Some(tier), Some(cellphone)) if errors.is_empty() => Ok(ShippingDetails {
                tier,
                cellphone,
                destination: if tier.requires_address() {
                    Some(Destination {
                        address: address.unwrap_or_default(),
                        city: city.unwrap_or_default(),
                        province: province.unwrap_or_default(),
                        postal_code: filled(&self.postal_code),
                    })
                } else {
                    None
                },
            }),
            _ => Err(ShopError::Validation(errors)),
        }
    }
}

/// Where a delivery goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub address: String,
    pub city: String,
    pub province: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// Validated shipping selection and contact data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub tier: ShippingTier,
    pub cellphone: String,
    /// Present for every tier except pickup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
}

/// Immutable snapshot of an order submitted for payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    id: String,
    items: Vec<LineItem>,
    shipping: ShippingDetails,
    subtotal: Amount,
    shipping_cost: Amount,
    total: Amount,
    currency: Currency,
    created_at: DateTime<Utc>,
}

impl OrderDraft {
    /// Freeze the cart and validated shipping details into a draft
    pub fn new(cart: &Cart, shipping: ShippingDetails, rates: &ShippingRates) -> ShopResult<Self> {
        if cart.is_empty() {
            return Err(ShopError::InvalidTransition {
                state: "empty cart".to_string(),
                event: "create order".to_string(),
            });
        }
        let subtotal = crate::pricing::subtotal(cart);
        let shipping_cost = rates.cost(shipping.tier);
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            items: cart.items().to_vec(),
            shipping,
            subtotal,
            shipping_cost,
            total: subtotal + shipping_cost,
            currency: rates.currency,
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn shipping(&self) -> &ShippingDetails {
        &self.shipping
    }

    pub fn subtotal(&self) -> Amount {
        self.subtotal
    }

    pub fn shipping_cost(&self) -> Amount {
        self.shipping_cost
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Title sent to the payment provider for the whole order
    pub fn payment_title(&self) -> String {
        self.items
            .iter()
            .map(|item| match &item.variant_label {
                Some(variant) => format!("{} ({}) x{}", item.title, variant, item.quantity),
                None => format!("{} x{}", item.title, item.quantity),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Order confirmation text delivered to the store's messaging channel
    pub fn confirmation_message(&self) -> String {
        let money = |amount: Amount| format_currency(amount, self.currency);
        let mut lines = vec![format!("New order {}", self.id)];

        for item in &self.items {
            let variant = item
                .variant_label
                .as_deref()
                .map(|v| format!(" [{}]", v))
                .unwrap_or_default();
            lines.push(format!(
                "- {}{} x{}: {}",
                item.title,
                variant,
                item.quantity,
                money(item.total())
            ));
        }

        lines.push(format!("Subtotal: {}", money(self.subtotal)));
        let shipping_note = if self.shipping.tier.may_vary() {
            " (may vary)"
        } else {
            ""
        };
        lines.push(format!(
            "Shipping ({}): {}{}",
            self.shipping.tier,
            money(self.shipping_cost),
            shipping_note
        ));
        lines.push(format!("Total: {}", money(self.total)));
        lines.push(format!("Cellphone: {}", self.shipping.cellphone));

        if let Some(dest) = &self.shipping.destination {
            let postal = dest
                .postal_code
                .as_deref()
                .map(|p| format!(" ({})", p))
                .unwrap_or_default();
            lines.push(format!(
                "Deliver to: {}, {}, {}{}",
                dest.address, dest.city, dest.province, postal
            ));
        } else {
            lines.push("Pickup at store".to_string());
        }

        lines.join("\n")
    }
}

/// Payment session returned by the payment collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Our order ID
    pub order_id: String,
    /// Where to send the shopper to pay
    pub payment_url: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentSession {
    pub fn new(order_id: impl Into<String>, payment_url: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            payment_url: payment_url.into(),
            created_at: Utc::now(),
        }
    }
}

/// Payment outcome reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}
