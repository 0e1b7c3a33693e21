//! # Error Types
//!
//! Domain-specific error types for kasir-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kasir-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule failures                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kasir-db errors (separate crate)                                      │
//! │  ├── DbError          - Storage failures                               │
//! │  └── TxError          - What transactional operations return           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → TxError → delivery layer          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - Product ID doesn't exist
    /// - Product was soft-deleted
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// User account cannot be found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Insufficient stock to complete a sale line.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (qty: 15)
    ///      │
    ///      ▼
    /// Read stock: available=10
    ///      │
    ///      ▼
    /// InsufficientStock { product_id: "001", available: 10, requested: 15 }
    ///      │
    ///      ▼
    /// Whole batch is rolled back
    /// ```
    #[error("Insufficient stock for {product_id} ({name}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// A stored identifier does not match the sequencer pattern.
    #[error("Identifier '{value}' does not match the {kind} pattern")]
    InvalidIdentifier { kind: &'static str, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation happens. `field` carries a path such as
/// `sales[1].items[0].quantity` so the caller can point at the bad input.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value doesn't match the accepted format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or more.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// A collection must not be empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },

    /// Duplicate value (e.g., duplicate username or sale id).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Request carried nothing to change.
    #[error("no fields to update")]
    NothingToUpdate,
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_stock_message() {
        let err = CoreError::InsufficientStock {
            product_id: "001".to_string(),
            name: "Teh Botol".to_string(),
            available: 10,
            requested: 15,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for 001 (Teh Botol): available 10, requested 15"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("sales[0].seller_name");
        assert_eq!(err.to_string(), "sales[0].seller_name is required");

        let err = ValidationError::must_be_positive("sales[2].items[1].quantity");
        assert_eq!(err.to_string(), "sales[2].items[1].quantity must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::NothingToUpdate.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
