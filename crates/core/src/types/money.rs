//! Type-safe money representation using decimal arithmetic.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount with currency information.
///
/// The amount is held in the currency's standard unit (e.g., dollars, not
/// cents). Conversion to integer minor units happens only at the payment
/// processor boundary via [`Money::to_minor_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a USD amount.
    #[must_use]
    pub const fn usd(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::USD)
    }

    /// Create an amount from integer minor units (e.g., cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// Convert to integer minor units, rounding half-up at the cent.
    ///
    /// Payment processors expect unit amounts as integers in the smallest
    /// currency unit, so `24.99` becomes `2499`.
    #[must_use]
    pub fn to_minor_units(&self) -> i64 {
        (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(i64::MAX)
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Currency symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }

    /// ISO 4217 code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Lowercase code as the payment processor expects it.
    #[must_use]
    pub const fn code_lowercase(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Parse a case-insensitive ISO code, defaulting unknown values to USD.
    #[must_use]
    pub fn parse_or_usd(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "EUR" => Self::EUR,
            "GBP" => Self::GBP,
            "CAD" => Self::CAD,
            "AUD" => Self::AUD,
            _ => Self::USD,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_to_minor_units() {
        assert_eq!(Money::usd(dec("24.99")).to_minor_units(), 2499);
        assert_eq!(Money::usd(dec("17")).to_minor_units(), 1700);
        assert_eq!(Money::usd(dec("0.01")).to_minor_units(), 1);
        assert_eq!(Money::usd(dec("0")).to_minor_units(), 0);
    }

    #[test]
    fn test_to_minor_units_rounds_half_up() {
        // Three decimal places should never survive the processor boundary
        assert_eq!(Money::usd(dec("9.995")).to_minor_units(), 1000);
        assert_eq!(Money::usd(dec("9.994")).to_minor_units(), 999);
    }

    #[test]
    fn test_from_minor_units_roundtrip() {
        let m = Money::from_minor_units(2499, CurrencyCode::USD);
        assert_eq!(m.amount, dec("24.99"));
        assert_eq!(m.to_minor_units(), 2499);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::usd(dec("19.99")).display(), "$19.99");
        assert_eq!(
            Money::new(dec("5.5"), CurrencyCode::GBP).display(),
            "\u{a3}5.50"
        );
        assert_eq!(Money::usd(dec("19.9")).to_string(), "19.90");
    }

    #[test]
    fn test_currency_codes() {
        assert_eq!(CurrencyCode::USD.code(), "USD");
        assert_eq!(CurrencyCode::USD.code_lowercase(), "usd");
        assert_eq!(CurrencyCode::parse_or_usd("gbp"), CurrencyCode::GBP);
        assert_eq!(CurrencyCode::parse_or_usd("XYZ"), CurrencyCode::USD);
    }
}
