//! # Validation Module
//!
//! Boundary validation for everything the delivery layer hands in.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (before any unit is opened)                      │
//! │  ├── Required fields, positive quantities                              │
//! │  └── Whole batch checked, first error wins                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: kasir-db inside the unit                                     │
//! │  ├── Product exists and is active                                      │
//! │  └── Stock is sufficient                                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (stock >= 0), CHECK (quantity > 0)                          │
//! │  └── UNIQUE / PRIMARY KEY constraints                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Field names in errors are paths into the submitted payload, e.g.
//! `sales[1].items[0].quantity`, so a rejected batch points at the exact
//! entry that failed.
//!
//! ## Usage
//! ```rust
//! use kasir_core::{LineDraft, SaleDraft};
//! use kasir_core::validation::validate_sale_batch;
//!
//! let ok = SaleDraft::new("Ann", vec![LineDraft::new("001", 3)]);
//! assert!(validate_sale_batch(&[ok]).is_ok());
//!
//! let bad = SaleDraft::new("Ann", vec![LineDraft::new("001", 0)]);
//! let err = validate_sale_batch(&[bad]).unwrap_err();
//! assert_eq!(err.to_string(), "sales[0].items[0].quantity must be positive");
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::ids::IdKind;
use crate::types::{NewUser, ProductDraft, SaleDraft, UserUpdate};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted username.
pub const MAX_USERNAME_LEN: usize = 50;

/// Longest accepted product or seller name.
pub const MAX_NAME_LEN: usize = 200;

// =============================================================================
// Field Validators
// =============================================================================

fn require_text(value: &str, field: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be greater than zero
///
/// There is no upper bound here; stock sufficiency is checked by the ledger.
pub fn validate_quantity(qty: i64, field: &str) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive(field));
    }
    Ok(())
}

/// Validates an amount or count that may be zero but not negative.
pub fn validate_non_negative(value: i64, field: &str) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a caller-assigned identifier against its sequencer series.
pub fn validate_identifier(id: &str, kind: IdKind, field: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    kind.parse_assignable(id)
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: format!("expected a {kind} identifier like {}", kind.seed()),
        })
}

// =============================================================================
// Sale Drafts
// =============================================================================

/// Validates one sale draft, reporting fields under `path`.
///
/// ## Rules
/// - Seller name must not be empty
/// - At least one line item
/// - Every line has a product id and a positive quantity
pub fn validate_sale_draft(draft: &SaleDraft, path: &str) -> ValidationResult<()> {
    if let Some(id) = &draft.id {
        validate_identifier(id, IdKind::Sale, &format!("{path}.id"))?;
    }

    require_text(&draft.seller_name, &format!("{path}.seller_name"), MAX_NAME_LEN)?;

    if draft.items.is_empty() {
        return Err(ValidationError::Empty {
            field: format!("{path}.items"),
        });
    }

    for (i, line) in draft.items.iter().enumerate() {
        if line.product_id.trim().is_empty() {
            return Err(ValidationError::required(format!(
                "{path}.items[{i}].product_id"
            )));
        }
        validate_quantity(line.quantity, &format!("{path}.items[{i}].quantity"))?;
    }

    Ok(())
}

/// Validates a whole batch before anything is reserved.
///
/// Besides each draft's own rules, caller-assigned identifiers must be
/// unique within the batch.
pub fn validate_sale_batch(drafts: &[SaleDraft]) -> ValidationResult<()> {
    if drafts.is_empty() {
        return Err(ValidationError::Empty {
            field: "sales".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for (i, draft) in drafts.iter().enumerate() {
        validate_sale_draft(draft, &format!("sales[{i}]"))?;

        if let Some(id) = &draft.id {
            if !seen.insert(id.as_str()) {
                return Err(ValidationError::Duplicate {
                    field: format!("sales[{i}].id"),
                    value: id.clone(),
                });
            }
        }
    }

    Ok(())
}

// =============================================================================
// Product Drafts
// =============================================================================

/// Validates a catalog entry for create or update.
///
/// ## Rules
/// - Name must not be empty
/// - Price and stock must not be negative
pub fn validate_product_draft(draft: &ProductDraft) -> ValidationResult<()> {
    if let Some(id) = &draft.id {
        validate_identifier(id, IdKind::Product, "id")?;
    }
    require_text(&draft.name, "name", MAX_NAME_LEN)?;
    validate_non_negative(draft.price.cents(), "price")?;
    validate_non_negative(draft.stock, "stock")?;
    Ok(())
}

/// Whether an import row carries enough to be written.
///
/// Rows without a name or barcode are skipped rather than failing the import.
pub fn is_importable(draft: &ProductDraft) -> bool {
    !draft.name.trim().is_empty()
        && !draft.barcode.trim().is_empty()
        && draft.price.cents() >= 0
        && draft.stock >= 0
}

// =============================================================================
// Accounts
// =============================================================================

/// Validates a username.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - No whitespace
pub fn validate_username(username: &str) -> ValidationResult<()> {
    require_text(username, "username", MAX_USERNAME_LEN)?;

    if username.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }

    Ok(())
}

pub fn validate_new_user(user: &NewUser) -> ValidationResult<()> {
    validate_username(&user.username)?;
    if user.password_hash.is_empty() {
        return Err(ValidationError::required("password"));
    }
    Ok(())
}

/// Rejects updates that change nothing or blank the password.
pub fn validate_user_update(update: &UserUpdate) -> ValidationResult<()> {
    if update.is_empty() {
        return Err(ValidationError::NothingToUpdate);
    }
    if matches!(&update.password_hash, Some(hash) if hash.is_empty()) {
        return Err(ValidationError::required("password"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
