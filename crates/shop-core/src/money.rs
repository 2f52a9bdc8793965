//! # Money
//!
//! Monetary amounts are `Decimal` values in whole currency units. Sums keep
//! full precision; rounding happens only when an amount is rendered.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Monetary amount in whole currency units
pub type Amount = Decimal;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    #[default]
    ARS,
    USD,
    EUR,
}

impl Currency {
    /// Returns the ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::ARS => "ars",
            Currency::USD => "usd",
            Currency::EUR => "eur",
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Currency::ARS | Currency::USD => "$",
            Currency::EUR => "€",
        }
    }

    /// Thousands separator of the locale this currency is shown in
    fn grouping_separator(&self) -> char {
        match self {
            Currency::ARS | Currency::EUR => '.',
            Currency::USD => ',',
        }
    }

    fn symbol_spacing(&self) -> &'static str {
        match self {
            Currency::ARS => " ",
            Currency::USD | Currency::EUR => "",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// Round half-up to whole units.
pub fn round_to_unit(amount: Amount) -> Amount {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount for display, e.g. `$ 6.000` for ARS.
///
/// Only numeric input is accepted, so formatting can never be applied twice.
pub fn format_currency(amount: Amount, currency: Currency) -> String {
    let rounded = round_to_unit(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let whole = rounded.abs().to_u128().unwrap_or_default();

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(currency.grouping_separator());
        }
        grouped.push(ch);
    }

    format!(
        "{}{}{}{}",
        if negative { "-" } else { "" },
        currency.symbol(),
        currency.symbol_spacing(),
        grouped
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_groups_thousands() {
        assert_eq!(format_currency(Decimal::from(6000), Currency::ARS), "$ 6.000");
        assert_eq!(format_currency(Decimal::from(1234567), Currency::ARS), "$ 1.234.567");
        assert_eq!(format_currency(Decimal::from(999), Currency::ARS), "$ 999");
        assert_eq!(format_currency(Decimal::ZERO, Currency::ARS), "$ 0");
        assert_eq!(format_currency(Decimal::from(25000), Currency::USD), "$25,000");
        assert_eq!(format_currency(Decimal::from(1500), Currency::EUR), "€1.500");
    }

    #[test]
    fn test_round_half_up_at_display() {
        assert_eq!(format_currency(Decimal::new(10005, 1), Currency::ARS), "$ 1.001");
        assert_eq!(format_currency(Decimal::new(10004, 1), Currency::ARS), "$ 1.000");
        assert_eq!(round_to_unit(Decimal::new(25, 1)), Decimal::from(3));
    }

    #[test]
    fn test_currency_code() {
        assert_eq!(Currency::ARS.to_string(), "ARS");
        assert_eq!(Currency::default(), Currency::ARS);
    }
}
