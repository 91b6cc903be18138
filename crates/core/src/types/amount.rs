//! Requested credit amounts using decimal arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Amount`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    /// The input is not a decimal number.
    #[error("'{0}' is not a valid decimal amount")]
    Malformed(String),
    /// The input is a number below zero.
    #[error("amount cannot be negative")]
    Negative,
}

/// A non-negative monetary amount requested against a customer's credit.
///
/// Backed by [`Decimal`] so that comparisons at the threshold are exact;
/// `150.00` and `150` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Parse an amount from user input.
    ///
    /// Accepts plain decimals (`150.00`) and scientific notation (`1.5e2`).
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Malformed`] if the input is not a number and
    /// [`AmountError::Negative`] if it is below zero.
    pub fn parse(s: &str) -> Result<Self, AmountError> {
        let trimmed = s.trim();
        let value = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| AmountError::Malformed(trimmed.to_owned()))?;
        Self::try_from(value)
    }

    /// Get the underlying decimal value.
    #[must_use]
    pub const fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative);
        }
        Ok(Self(value))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_scientific() {
        assert_eq!(Amount::parse("150.00").unwrap().value(), Decimal::new(15000, 2));
        assert_eq!(Amount::parse("1.5e2").unwrap().value(), Decimal::new(150, 0));
        assert_eq!(Amount::parse(" 0 ").unwrap(), Amount::ZERO);
    }

    #[test]
    fn test_trailing_zeros_compare_equal() {
        assert_eq!(Amount::parse("150").unwrap(), Amount::parse("150.000").unwrap());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(Amount::parse("abc"), Err(AmountError::Malformed(_))));
        assert!(matches!(Amount::parse("12,50"), Err(AmountError::Malformed(_))));
        assert!(matches!(Amount::parse(""), Err(AmountError::Malformed(_))));
    }

    #[test]
    fn test_parse_negative() {
        assert_eq!(Amount::parse("-0.01"), Err(AmountError::Negative));
    }

    #[test]
    fn test_negative_zero_is_zero() {
        assert_eq!(Amount::parse("-0").unwrap().value(), Decimal::ZERO);
    }
}
