//! # Price & Shipping
//!
//! Pure functions over cart snapshots. Shipping is a table lookup by tier;
//! rates come from `config/shipping.toml` or the built-in defaults.

use crate::cart::Cart;
use crate::error::{ShopError, ShopResult};
use crate::money::{format_currency, Amount, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Delivery option chosen at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingTier {
    /// Pick up at the store, no surcharge
    Pickup,
    /// Delivery inside the capital
    Capital,
    /// Delivery to the surrounding area
    Surroundings,
    /// Anywhere else; the base rate may vary with the destination
    Other,
}

impl ShippingTier {
    pub const ALL: [ShippingTier; 4] = [
        ShippingTier::Pickup,
        ShippingTier::Capital,
        ShippingTier::Surroundings,
        ShippingTier::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingTier::Pickup => "pickup",
            ShippingTier::Capital => "capital",
            ShippingTier::Surroundings => "surroundings",
            ShippingTier::Other => "other",
        }
    }

    /// Whether the tier ships to an address
    pub fn requires_address(&self) -> bool {
        !matches!(self, ShippingTier::Pickup)
    }

    /// Whether the shown rate is only a base price
    pub fn may_vary(&self) -> bool {
        matches!(self, ShippingTier::Other)
    }
}

impl std::fmt::Display for ShippingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingTier {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShippingTier::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ShopError::Configuration(format!("unknown shipping tier: {}", s)))
    }
}

/// Fixed surcharge per delivery tier (pickup is always free)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingRates {
    pub capital: Amount,
    pub surroundings: Amount,
    pub other: Amount,
    #[serde(default)]
    pub currency: Currency,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            capital: Decimal::from(4000),
            surroundings: Decimal::from(6000),
            other: Decimal::from(8000),
            currency: Currency::ARS,
        }
    }
}

impl ShippingRates {
    /// Load rates from a TOML document with a `[shipping]` table
    pub fn from_toml(toml_str: &str) -> ShopResult<Self> {
        #[derive(Deserialize)]
        struct ShippingFile {
            shipping: ShippingRates,
        }

        let file: ShippingFile = toml::from_str(toml_str)
            .map_err(|e| ShopError::Configuration(format!("invalid shipping config: {}", e)))?;
        file.shipping.validate()?;
        Ok(file.shipping)
    }

    fn validate(&self) -> ShopResult<()> {
        for (tier, rate) in [
            ("capital", self.capital),
            ("surroundings", self.surroundings),
            ("other", self.other),
        ] {
            if rate.is_sign_negative() {
                return Err(ShopError::Configuration(format!(
                    "shipping rate for {} must not be negative",
                    tier
                )));
            }
        }
        Ok(())
    }

    pub fn cost(&self, tier: ShippingTier) -> Amount {
        match tier {
            ShippingTier::Pickup => Decimal::ZERO,
            ShippingTier::Capital => self.capital,
            ShippingTier::Surroundings => self.surroundings,
            ShippingTier::Other => self.other,
        }
    }
}

/// Sum of unit price times quantity over all lines
pub fn subtotal(cart: &Cart) -> Amount {
    cart.items().iter().map(|item| item.total()).sum()
}

/// Surcharge for a tier; `None` while no tier is selected
pub fn shipping_cost(tier: Option<ShippingTier>, rates: &ShippingRates) -> Option<Amount> {
    tier.map(|t| rates.cost(t))
}

/// Subtotal plus shipping; `None` while no tier is selected
pub fn total(cart: &Cart, tier: Option<ShippingTier>, rates: &ShippingRates) -> Option<Amount> {
    shipping_cost(tier, rates).map(|shipping| subtotal(cart) + shipping)
}

/// Price breakdown shown next to the checkout form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub subtotal: Amount,
    pub shipping: Option<Amount>,
    pub total: Option<Amount>,
    pub currency: Currency,
    /// Formatted total, or a prompt to choose a delivery option
    pub total_display: String,
}

pub const SELECT_SHIPPING_PROMPT: &str = "Select a delivery option to see the total";

impl Quote {
    pub fn for_cart(cart: &Cart, tier: Option<ShippingTier>, rates: &ShippingRates) -> Self {
        let total = total(cart, tier, rates);
        Self {
            subtotal: subtotal(cart),
            shipping: shipping_cost(tier, rates),
            total,
            currency: rates.currency,
            total_display: total
                .map(|t| format_currency(t, rates.currency))
                .unwrap_or_else(|| SELECT_SHIPPING_PROMPT.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartStore, LineItem};

    fn cart_with(lines: &[(u64, i64, u32)]) -> Cart {
        let mut store = CartStore::new();
        for (id, price, qty) in lines {
            store
                .add(LineItem::new(*id, "item", Decimal::from(*price)).with_quantity(*qty))
                .unwrap();
        }
        (*store.snapshot()).clone()
    }

    #[test]
    fn test_capital_scenario_total() {
        let cart = cart_with(&[(1, 1000, 2)]);
        let rates = ShippingRates::default();

        assert_eq!(
            total(&cart, Some(ShippingTier::Capital), &rates),
            Some(Decimal::from(6000))
        );
    }

    #[test]
    fn test_total_is_subtotal_plus_shipping_for_every_tier() {
        let cart = cart_with(&[(1, 1250, 3), (2, 999, 1), (3, 10, 7)]);
        let rates = ShippingRates::default();

        for tier in ShippingTier::ALL {
            assert_eq!(
                total(&cart, Some(tier), &rates),
                Some(subtotal(&cart) + rates.cost(tier))
            );
        }
        assert_eq!(rates.cost(ShippingTier::Pickup), Decimal::ZERO);
    }

    #[test]
    fn test_unselected_tier_has_no_total() {
        let cart = cart_with(&[(1, 1000, 1)]);
        let quote = Quote::for_cart(&cart, None, &ShippingRates::default());

        assert_eq!(quote.total, None);
        assert_eq!(quote.subtotal, Decimal::from(1000));
        assert_eq!(quote.total_display, SELECT_SHIPPING_PROMPT);
    }

    #[test]
    fn test_fractional_prices_keep_precision() {
        let mut store = CartStore::new();
        store
            .add(LineItem::new(1u64, "a", Decimal::new(33333, 1)).with_quantity(3))
            .unwrap();

        let quote = Quote::for_cart(&store.snapshot(), Some(ShippingTier::Pickup), &ShippingRates::default());

        assert_eq!(quote.subtotal, Decimal::new(99999, 1));
        assert_eq!(quote.total_display, "$ 10.000");
    }

    #[test]
    fn test_rates_from_toml() {
        let rates = ShippingRates::from_toml(
            r#"
            [shipping]
            capital = 3500
            surroundings = 5200.5
            other = 9000
            currency = "ars"
            "#,
        )
        .unwrap();

        assert_eq!(rates.capital, Decimal::from(3500));
        assert_eq!(rates.surroundings, Decimal::new(52005, 1));

        let negative = ShippingRates::from_toml("[shipping]\ncapital = -1\nsurroundings = 1\nother = 1\n");
        assert!(matches!(negative, Err(ShopError::Configuration(_))));
    }

    #[test]
    fn test_tier_parsing() {
        assert_eq!("Capital".parse::<ShippingTier>().unwrap(), ShippingTier::Capital);
        assert!("teleport".parse::<ShippingTier>().is_err());
        assert!(ShippingTier::Other.may_vary());
        assert!(!ShippingTier::Pickup.requires_address());
    }
}
