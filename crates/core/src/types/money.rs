//! Monetary amounts using decimal arithmetic.
//!
//! The bakery API reports money as JSON numbers on cart endpoints and as
//! decimal strings on order endpoints, so [`Money`] accepts both on input.
//! It is always written back as a JSON number.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount in the store currency.
///
/// Client code never derives totals from lines: every `Money` shown to a user
/// comes straight from a server response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(serialize_with = "rust_decimal::serde::float::serialize")] Decimal);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create an amount from whole currency units.
    #[must_use]
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0.round_dp(2).normalize())
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<i64> for Money {
    fn from(units: i64) -> Self {
        Self::from_units(units)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_number() {
        let money: Money = serde_json::from_str("3000.0").unwrap();
        assert_eq!(money, Money::from_units(3000));
    }

    #[test]
    fn test_deserialize_from_string() {
        let money: Money = serde_json::from_str("\"1500.50\"").unwrap();
        assert_eq!(money.amount(), Decimal::new(150_050, 2));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_value(Money::from_units(1000)).unwrap();
        assert!(json.is_number());
        assert!((json.as_f64().unwrap() - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_units(1000).to_string(), "$1000");
        assert_eq!(Money::new(Decimal::new(12_345, 2)).to_string(), "$123.45");
        assert_eq!(Money::ZERO.to_string(), "$0");
    }
}
