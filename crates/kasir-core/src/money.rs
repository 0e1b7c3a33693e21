//! # Money Module
//!
//! Provides the `Money` type for monetary values in the smallest currency
//! unit. Unit prices, line subtotals and sale totals all flow through it.
//!
//! ## Why Checked Arithmetic?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A sale total is persisted next to its lines and must equal their sum. │
//! │                                                                         │
//! │    unit_price × quantity  ──►  subtotal   (checked_mul_quantity)       │
//! │    Σ subtotal             ──►  total      (checked_add / checked_sum)  │
//! │                                                                         │
//! │  An overflow would silently break that equality, so every step that   │
//! │  builds a persisted amount returns None instead of wrapping.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_cents(500);
//! let line = price.checked_mul_quantity(3).unwrap();
//! let total = Money::checked_sum([line, Money::from_cents(250)]).unwrap();
//! assert_eq!(total.cents(), 1750);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: matches SQLite INTEGER columns one to one
/// - **Single field tuple struct**: Zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from the smallest currency unit.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in the smallest currency unit.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies a unit price by a quantity, `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use kasir_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(500);
    /// assert_eq!(unit_price.checked_mul_quantity(3), Some(Money::from_cents(1500)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Adds two amounts, `None` on overflow.
    #[inline]
    pub const fn checked_add(&self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Sums amounts, `None` on overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Self> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the raw smallest-unit amount; currency formatting belongs to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.to_string(), "1099");
    }

    #[test]
    fn test_checked_mul_quantity() {
        let price = Money::from_cents(500);
        assert_eq!(price.checked_mul_quantity(5).unwrap().cents(), 2500);
        assert_eq!(price.checked_mul_quantity(0).unwrap(), Money::zero());
        assert!(Money::from_cents(i64::MAX / 2).checked_mul_quantity(3).is_none());
    }

    #[test]
    fn test_checked_sum() {
        let total = Money::checked_sum(vec![
            Money::from_cents(1500),
            Money::from_cents(2500),
        ]);
        assert_eq!(total, Some(Money::from_cents(4000)));

        assert_eq!(Money::checked_sum(Vec::new()), Some(Money::zero()));
        assert!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]).is_none());
    }

    #[test]
    fn test_zero_and_checks() {
        assert!(Money::zero().is_zero());
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::from_cents(1).is_negative());
        assert_eq!(Money::default(), Money::zero());
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        let json = serde_json::to_string(&Money::from_cents(1500)).unwrap();
        assert_eq!(json, "1500");
    }
}
