//! Single-currency amounts.
//!
//! [`Amount`] wraps the smallest currency unit as a `u128`, the same width the
//! NEAR and ink! balance types use. All arithmetic is checked: the registry must
//! never wrap an escrow total.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// A non-negative amount of the registry's single currency, in base units.
///
/// # Serialization
///
/// Serialized as a stringified integer to avoid loss of precision in JSON,
/// since `JavaScript`'s `Number` type cannot represent all 128-bit integers.
///
/// ```json
/// "1000000000000000000000000"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

/// Error returned by amount parsing and checked arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The string is not a non-negative base-10 integer.
    #[error("invalid amount {0:?}: expected a non-negative integer")]
    Invalid(String),
    /// The result does not fit in 128 bits.
    #[error("amount overflow")]
    Overflow,
    /// The subtraction would go below zero.
    #[error("amount underflow")]
    Underflow,
}

impl Amount {
    /// The zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from raw base units.
    #[must_use]
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Returns the raw base units.
    #[must_use]
    pub const fn units(self) -> u128 {
        self.0
    }

    /// Returns `true` for the zero amount.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Overflow`] if the sum exceeds `u128::MAX`.
    pub const fn checked_add(self, rhs: Self) -> Result<Self, AmountError> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Ok(Self(v)),
            None => Err(AmountError::Overflow),
        }
    }

    /// Subtracts `rhs` from `self`.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Underflow`] if `rhs > self`.
    pub const fn checked_sub(self, rhs: Self) -> Result<Self, AmountError> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Ok(Self(v)),
            None => Err(AmountError::Underflow),
        }
    }

    /// Subtracts `rhs` from `self`, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Adds `rhs` to `self`, clamping at the maximum.
    #[must_use]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl From<u128> for Amount {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self(u128::from(value))
    }
}

impl From<Amount> for u128 {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Invalid(s.to_owned()));
        }
        trimmed
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AmountError::Overflow)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// Accepts either a decimal string or a JSON/TOML integer.
impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AmountVisitor;

        impl de::Visitor<'_> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or integer string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount::from(v))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
                Ok(Amount(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u64::try_from(v)
                    .map(Amount::from)
                    .map_err(|_| E::custom("amount must be non-negative"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                Amount::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_serializes_as_string() {
        let amount = Amount::new(u128::MAX);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, format!("\"{}\"", u128::MAX));
    }

    #[test]
    fn test_amount_deserializes_from_number_or_string() {
        let a: Amount = serde_json::from_str("42").unwrap();
        let b: Amount = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.units(), 42);
    }

    #[test]
    fn test_amount_rejects_negative_and_garbage() {
        assert!(serde_json::from_str::<Amount>("-1").is_err());
        assert!(serde_json::from_str::<Amount>("\"1.5\"").is_err());
        assert!(matches!(
            Amount::from_str("abc"),
            Err(AmountError::Invalid(_))
        ));
        assert!(matches!(Amount::from_str(""), Err(AmountError::Invalid(_))));
    }

    #[test]
    fn test_checked_arithmetic() {
        let five = Amount::new(5);
        let eight = Amount::new(8);
        assert_eq!(five.checked_add(eight), Ok(Amount::new(13)));
        assert_eq!(eight.checked_sub(five), Ok(Amount::new(3)));
        assert_eq!(five.checked_sub(eight), Err(AmountError::Underflow));
        assert_eq!(
            Amount::new(u128::MAX).checked_add(Amount::new(1)),
            Err(AmountError::Overflow)
        );
        assert_eq!(five.saturating_sub(eight), Amount::ZERO);
        assert_eq!(
            Amount::new(u128::MAX).saturating_add(five),
            Amount::new(u128::MAX)
        );
    }
}
