//! Type-safe price representation using decimal arithmetic.
//!
//! The marketplace API transports every monetary amount as a decimal string
//! with two fraction digits (`"10.00"`). [`Price`] wraps [`Decimal`] and keeps
//! that normalization in one place: construction rounds to two fraction
//! digits, serialization always emits the string form, and arithmetic stays
//! exact (no floating point).

use std::iter::Sum;
use std::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PriceError {
    /// The input string is not a valid decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// The amount is negative.
    #[error("price cannot be negative: {0}")]
    Negative(String),
}

/// A non-negative monetary amount, normalized to two fraction digits.
///
/// Serializes as a decimal string (`"10.00"`), matching the wire format of
/// the marketplace API.
///
/// ## Examples
///
/// ```
/// use loomline_core::Price;
///
/// let unit = Price::parse("10").unwrap();
/// assert_eq!(unit.to_string(), "10.00");
/// assert_eq!(unit.times(5).to_string(), "50.00");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Price(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Price {
    /// A price of zero (`"0.00"`).
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Parse a price from its decimal string form.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid decimal or is negative.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount: Decimal = s
            .trim()
            .parse()
            .map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::from_decimal(amount).map_err(|_| PriceError::Negative(s.to_owned()))
    }

    /// Build a price from a raw decimal, rounding to two fraction digits.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative.
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount.to_string()));
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(&self, quantity: u32) -> Self {
        Self((self.0 * Decimal::from(quantity)).round_dp(2))
    }

    /// True when the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut normalized = self.0.round_dp(2);
        normalized.rescale(2);
        write!(f, "{normalized}")
    }
}

impl std::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_to_two_digits() {
        assert_eq!(Price::parse("10").unwrap().to_string(), "10.00");
        assert_eq!(Price::parse("10.5").unwrap().to_string(), "10.50");
        assert_eq!(Price::parse("10.005").unwrap().to_string(), "10.00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Price::parse("abc"), Err(PriceError::Invalid(_))));
        assert!(matches!(Price::parse(""), Err(PriceError::Invalid(_))));
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(matches!(
            Price::parse("-1.00"),
            Err(PriceError::Negative(_))
        ));
    }

    #[test]
    fn test_times() {
        let unit = Price::parse("10.00").unwrap();
        assert_eq!(unit.times(2).to_string(), "20.00");
        assert_eq!(unit.times(5).to_string(), "50.00");
        assert_eq!(unit.times(0), Price::ZERO);
    }

    #[test]
    fn test_sum() {
        let total: Price = ["1.50", "2.25", "0.25"]
            .iter()
            .map(|s| Price::parse(s).unwrap())
            .sum();
        assert_eq!(total.to_string(), "4.00");
    }

    #[test]
    fn test_serde_string_form() {
        let price = Price::parse("19.99").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"19.99\"");

        let parsed: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, price);
    }

    #[test]
    fn test_equality_ignores_trailing_zeroes() {
        assert_eq!(Price::parse("10").unwrap(), Price::parse("10.00").unwrap());
    }
}
