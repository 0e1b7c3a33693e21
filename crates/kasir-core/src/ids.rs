//! # Sequencer Identifiers
//!
//! Human-readable identifiers handed out by the ID sequencer in kasir-db.
//! This module owns the lexical pattern of each kind; the database side only
//! finds the current high-water identifier and asks for the next one.
//!
//! ```text
//! Kind      Pattern     Seed     After
//! ───────   ─────────   ──────   ──────────────
//! Product   NNN         001      041   → 042
//! Sale      PJNNN       PJ001    PJ999 → PJ1000
//! ```
//!
//! Numbers are zero padded to three digits and grow past that width rather
//! than wrapping, so ordering by (length, text) equals numeric ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

const MIN_WIDTH: usize = 3;

/// Largest number a caller may assign by hand.
pub const MAX_ASSIGNABLE: u64 = u32::MAX as u64;

/// The identifier series a sequencer works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    Product,
    Sale,
}

impl IdKind {
    /// Literal prefix in front of the number.
    pub const fn prefix(&self) -> &'static str {
        match self {
            IdKind::Product => "",
            IdKind::Sale => "PJ",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            IdKind::Product => "product",
            IdKind::Sale => "sale",
        }
    }

    /// First identifier of the series, used when the collection is empty.
    pub fn seed(&self) -> String {
        self.format(1)
    }

    /// Formats a sequence number as an identifier of this kind.
    pub fn format(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix(), number, width = MIN_WIDTH)
    }

    /// Extracts the sequence number from an identifier of this kind.
    ///
    /// ## Errors
    /// `CoreError::InvalidIdentifier` when the prefix is missing or the rest
    /// is not a plain run of ASCII digits.
    pub fn parse(&self, value: &str) -> CoreResult<u64> {
        let invalid = || CoreError::InvalidIdentifier {
            kind: self.name(),
            value: value.to_string(),
        };

        let digits = value.strip_prefix(self.prefix()).ok_or_else(invalid)?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        digits.parse::<u64>().map_err(|_| invalid())
    }

    /// Checks an identifier supplied by a caller instead of the sequencer.
    ///
    /// Only the canonical spelling of a number up to [`MAX_ASSIGNABLE`] is
    /// accepted: "PJ0005" or "PJ5" would sort apart from "PJ005" and
    /// mislead the high-water read.
    pub fn parse_assignable(&self, value: &str) -> CoreResult<u64> {
        let number = self.parse(value)?;
        if number == 0 || number > MAX_ASSIGNABLE || self.format(number) != value {
            return Err(CoreError::InvalidIdentifier {
                kind: self.name(),
                value: value.to_string(),
            });
        }
        Ok(number)
    }

    /// Number following `number` in this series.
    pub fn successor(&self, number: u64) -> CoreResult<u64> {
        number.checked_add(1).ok_or_else(|| CoreError::InvalidIdentifier {
            kind: self.name(),
            value: self.format(number),
        })
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds() {
        assert_eq!(IdKind::Product.seed(), "001");
        assert_eq!(IdKind::Sale.seed(), "PJ001");
    }

    #[test]
    fn test_successor() {
        assert_eq!(IdKind::Product.successor(41).unwrap(), 42);
        assert_eq!(IdKind::Sale.format(IdKind::Sale.successor(999).unwrap()), "PJ1000");

        let err = IdKind::Sale.successor(u64::MAX).unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier { kind: "sale", .. }));
    }

    #[test]
    fn test_assignable_ids_are_canonical() {
        assert_eq!(IdKind::Sale.parse_assignable("PJ005").unwrap(), 5);
        assert_eq!(IdKind::Sale.parse_assignable("PJ1234").unwrap(), 1234);
        assert_eq!(IdKind::Product.parse_assignable("050").unwrap(), 50);

        for bad in ["INV-2024", "PJ5", "PJ0005", "PJ000", "PJ18446744073709551615", "pj005"] {
            assert!(IdKind::Sale.parse_assignable(bad).is_err(), "{bad}");
        }
        for bad in ["SKU-A", "7", "0042", "000", " 001"] {
            assert!(IdKind::Product.parse_assignable(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_malformed_high_water_is_rejected() {
        let err = IdKind::Sale.parse("X17").unwrap_err();
        assert!(matches!(err, CoreError::InvalidIdentifier { kind: "sale", .. }));

        assert!(IdKind::Product.parse("P001").is_err());
        assert!(IdKind::Product.parse("").is_err());
        assert!(IdKind::Sale.parse("PJ").is_err());
        assert!(IdKind::Sale.parse("PJ-1").is_err());
    }
}
