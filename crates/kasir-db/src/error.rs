//! # Database Error Types
//!
//! Error types for database operations and transactional units.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbError ← Adds context and categorization                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  TxError ← Merges with CoreError (validation, stock, not found)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorKind ← One of six kinds the delivery layer switches on           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Kinds
//! ```text
//! Validation          malformed input, rejected before any mutation
//! NotFound            product, sale or user id does not resolve
//! InsufficientStock   requested quantity exceeds available stock
//! ConflictRetryable   SQLite lock contention, retry the whole operation
//! DeadlineExceeded    the unit was rolled back when its deadline passed
//! StorageFailure      everything else, surfaced verbatim
//! ```

use std::fmt;

use kasir_core::{CoreError, ValidationError};
use thiserror::Error;

// SQLite primary result codes. Extended codes keep these in the low byte.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - ID doesn't exist
    /// - Soft-deleted product
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Caller-assigned product or sale id already taken
    /// - Duplicate username
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Another connection holds the lock or invalidated our snapshot.
    ///
    /// ## When This Occurs
    /// - `SQLITE_BUSY` after the busy timeout elapsed
    /// - `SQLITE_BUSY_SNAPSHOT`: a concurrent unit committed first
    /// - `SQLITE_LOCKED`
    #[error("Database busy: {0}")]
    Conflict(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    ///
    /// ## When This Occurs
    /// - CHECK constraint rejected a row
    /// - Runtime SQL error
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }
}

fn is_lock_contention(code: Option<&str>, msg: &str) -> bool {
    let primary = code
        .and_then(|c| c.parse::<i32>().ok())
        .map(|c| c & 0xff);

    matches!(primary, Some(SQLITE_BUSY) | Some(SQLITE_LOCKED))
        || msg.contains("database is locked")
        || msg.contains("database table is locked")
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Busy/locked code, else analyze message
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                let code = db_err.code();

                if is_lock_contention(code.as_deref(), msg) {
                    DbError::Conflict(msg.to_string())
                } else if msg.contains("UNIQUE constraint failed")
                    || msg.contains("PRIMARY KEY constraint failed")
                {
                    // "UNIQUE constraint failed: <table>.<column>"
                    let field = msg
                        .split("constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Transactional Errors
// =============================================================================

/// The kind a caller switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    InsufficientStock,
    ConflictRetryable,
    DeadlineExceeded,
    StorageFailure,
}

impl ErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::ConflictRetryable => "conflict_retryable",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::StorageFailure => "storage_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by every operation that runs inside an atomic unit.
///
/// Whatever the variant, the unit has been rolled back by the time the
/// caller sees it: no partial effect is observable.
#[derive(Debug, Error)]
pub enum TxError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Transient lock conflict. The whole operation may be retried.
    #[error("Conflicting concurrent update, retry the whole operation: {0}")]
    Conflict(String),

    /// The operation's deadline passed before commit.
    #[error("{operation} did not finish before its deadline")]
    DeadlineExceeded { operation: &'static str },

    /// Non-retryable storage failure.
    #[error(transparent)]
    Storage(DbError),
}

impl TxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TxError::Domain(err) => match err {
                CoreError::Validation(_) => ErrorKind::Validation,
                CoreError::ProductNotFound(_)
                | CoreError::SaleNotFound(_)
                | CoreError::UserNotFound(_) => ErrorKind::NotFound,
                CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
                // A stored identifier that doesn't parse is corrupt data.
                CoreError::InvalidIdentifier { .. } => ErrorKind::StorageFailure,
            },
            TxError::Conflict(_) => ErrorKind::ConflictRetryable,
            TxError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            TxError::Storage(_) => ErrorKind::StorageFailure,
        }
    }

    /// Only transient conflicts may be retried, and only as a whole.
    #[inline]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::ConflictRetryable
    }
}

/// ## Mapping
/// ```text
/// DbError::Conflict         → TxError::Conflict
/// DbError::UniqueViolation  → Validation (duplicate)
/// DbError::NotFound         → CoreError::{Product,Sale,User}NotFound
/// Other                     → TxError::Storage
/// ```
impl From<DbError> for TxError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => TxError::Conflict(msg),
            DbError::UniqueViolation { field, value } => {
                TxError::Domain(ValidationError::Duplicate { field, value }.into())
            }
            DbError::NotFound { entity, id } => match entity.as_str() {
                "Product" => TxError::Domain(CoreError::ProductNotFound(id)),
                "Sale" => TxError::Domain(CoreError::SaleNotFound(id)),
                "User" => TxError::Domain(CoreError::UserNotFound(id)),
                _ => TxError::Storage(DbError::NotFound { entity, id }),
            },
            other => TxError::Storage(other),
        }
    }
}

impl From<sqlx::Error> for TxError {
    fn from(err: sqlx::Error) -> Self {
        DbError::from(err).into()
    }
}

impl From<ValidationError> for TxError {
    fn from(err: ValidationError) -> Self {
        TxError::Domain(err.into())
    }
}

/// Result type for transactional operations.
pub type TxResult<T> = Result<T, TxError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_contention_detection() {
        assert!(is_lock_contention(Some("5"), "database is locked"));
        assert!(is_lock_contention(Some("517"), "database is locked"));
        assert!(is_lock_contention(Some("6"), ""));
        assert!(is_lock_contention(None, "database is locked"));
        assert!(!is_lock_contention(Some("2067"), "UNIQUE constraint failed: sales.id"));
    }

    #[test]
    fn test_kinds() {
        let err: TxError = CoreError::InsufficientStock {
            product_id: "001".to_string(),
            name: "Teh".to_string(),
            available: 1,
            requested: 2,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert!(!err.is_retryable());

        let err: TxError = DbError::Conflict("database is locked".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::ConflictRetryable);
        assert!(err.is_retryable());

        let err: TxError = DbError::duplicate("sales.id", "PJ001").into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: TxError = DbError::not_found("Sale", "PJ404").into();
        assert!(matches!(err, TxError::Domain(CoreError::SaleNotFound(ref id)) if id == "PJ404"));

        let err: TxError = DbError::QueryFailed("CHECK constraint failed".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);

        let err: TxError = CoreError::InvalidIdentifier {
            kind: "sale",
            value: "X1".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }
}
