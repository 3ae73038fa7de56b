//! Value objects: equality by value, not identity.

use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. Two
/// value objects with the same values are the same value.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// An amount of money in minor currency units (e.g. cents).
///
/// Prices and totals are never negative; `try_new` and deserialization reject
/// negative amounts.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn try_new(minor: i64) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::validation("amount cannot be negative"));
        }
        Ok(Self(minor))
    }

    /// Build from a trusted (already validated) minor-unit amount.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor.max(0))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    /// `self * quantity`, failing on overflow or a negative quantity.
    pub fn checked_mul(self, quantity: i64) -> DomainResult<Self> {
        if quantity < 0 {
            return Err(DomainError::validation("quantity cannot be negative"));
        }
        self.0
            .checked_mul(quantity)
            .map(Self)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::validation("amount overflow"))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let minor = i64::deserialize(deserializer)?;
        Money::try_new(minor).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn negative_amounts_are_rejected() {
        match Money::try_new(-1) {
            Err(DomainError::Validation(_)) => {}
            other => panic!("Expected validation error, got {other:?}"),
        }
        assert!(serde_json::from_str::<Money>("-5").is_err());
    }

    #[test]
    fn display_uses_two_decimal_places() {
        assert_eq!(Money::from_minor(12_345).to_string(), "123.45");
        assert_eq!(Money::from_minor(7).to_string(), "0.07");
    }

    #[test]
    fn checked_mul_detects_overflow() {
        assert!(Money::from_minor(i64::MAX).checked_mul(2).is_err());
        assert_eq!(Money::from_minor(250).checked_mul(4).unwrap(), Money::from_minor(1_000));
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

        #[test]
        fn sum_matches_integer_sum(amounts in proptest::collection::vec(0i64..1_000_000, 0..50)) {
            let total: Money = amounts.iter().map(|a| Money::from_minor(*a)).sum();
            prop_assert_eq!(total.minor(), amounts.iter().sum::<i64>());
        }
    }
}
