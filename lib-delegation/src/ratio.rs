//! Fixed-point reward ratio arithmetic.
//!
//! Reward accrual is tracked as yield-per-unit-of-stake. The ratio is a
//! non-negative fixed-point fraction scaled by [`RATIO_SCALE`]; every
//! multiply and divide truncates toward zero so that results are
//! deterministic across platforms and never over-credit. Truncation dust
//! stays in the externally observed pool balance and is swept into a later
//! period's yield.

use crate::errors::{PoolError, PoolResult};
use crate::types::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scale factor for fixed-point ratios: 1e12 units per 1.0
pub const RATIO_SCALE: u128 = 1_000_000_000_000;

/// A non-negative fixed-point fraction, scaled by [`RATIO_SCALE`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FixedRatio(u128);

impl FixedRatio {
    pub const ZERO: Self = Self(0);

    /// Build a ratio from raw scaled units (`raw` = fraction * RATIO_SCALE).
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Build `numerator / denominator`, truncating toward zero.
    ///
    /// # Errors
    /// `Overflow` if the scaled numerator exceeds the u128 range or the
    /// denominator is zero.
    pub fn from_fraction(numerator: Amount, denominator: Amount) -> PoolResult<Self> {
        if denominator == 0 {
            return Err(PoolError::Overflow);
        }
        let scaled = numerator
            .checked_mul(RATIO_SCALE)
            .ok_or(PoolError::Overflow)?;
        Ok(Self(scaled / denominator))
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(&self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Apply this ratio to a balance: `balance * ratio`, truncating toward
    /// zero (integer-division semantics, never rounding up).
    ///
    /// # Errors
    /// `Overflow` if the intermediate product exceeds the u128 range.
    pub fn apply(&self, balance: Amount) -> PoolResult<Amount> {
        let product = balance.checked_mul(self.0).ok_or(PoolError::Overflow)?;
        Ok(product / RATIO_SCALE)
    }
}

impl fmt::Display for FixedRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:012}",
            self.0 / RATIO_SCALE,
            self.0 % RATIO_SCALE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fraction_truncates() {
        // 1/3 cannot be represented exactly; must truncate, not round
        let third = FixedRatio::from_fraction(1, 3).unwrap();
        assert_eq!(third.raw(), RATIO_SCALE / 3);

        let tenth = FixedRatio::from_fraction(10, 100).unwrap();
        assert_eq!(tenth.raw(), RATIO_SCALE / 10);
    }

    #[test]
    fn test_from_fraction_zero_denominator_fails() {
        assert_eq!(
            FixedRatio::from_fraction(1, 0),
            Err(PoolError::Overflow)
        );
    }

    #[test]
    fn test_apply_truncates_toward_zero() {
        let tenth = FixedRatio::from_fraction(1, 10).unwrap();
        assert_eq!(tenth.apply(1_000).unwrap(), 100);
        // 0.1 * 15 = 1.5 -> truncates to 1
        assert_eq!(tenth.apply(15).unwrap(), 1);
        // 0.1 * 9 = 0.9 -> truncates to 0
        assert_eq!(tenth.apply(9).unwrap(), 0);
    }

    #[test]
    fn test_checked_sub_underflow_is_none() {
        let small = FixedRatio::from_raw(5);
        let large = FixedRatio::from_raw(10);
        assert_eq!(small.checked_sub(large), None);
        assert_eq!(large.checked_sub(small), Some(FixedRatio::from_raw(5)));
    }

    #[test]
    fn test_apply_overflow_detected() {
        let huge = FixedRatio::from_raw(u128::MAX);
        assert_eq!(huge.apply(2), Err(PoolError::Overflow));
    }

    #[test]
    fn test_display() {
        let r = FixedRatio::from_fraction(1, 10).unwrap();
        assert_eq!(r.to_string(), "0.100000000000");
    }
}
