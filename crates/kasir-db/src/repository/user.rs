//! # User Repository
//!
//! Login accounts and their roles. Password hashing happens before anything
//! reaches this module; only the hash is stored.
//!
//! ## Roles
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Capability        admin   owner                                        │
//! │  ───────────────   ─────   ─────                                        │
//! │  ViewAccounts        ✓       ✓                                          │
//! │  ManageAccounts      ✓       ✗    register / update / delete            │
//! │  ManageCatalog       ✓       ✓                                          │
//! │  RecordSales         ✓       ✓                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Capability checks are made by the delivery layer with [`Role::can`];
//! this repository only stores.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use kasir_core::validation::{validate_new_user, validate_user_update, validate_username};
use kasir_core::{NewUser, Role, User, UserUpdate, ValidationError};

use crate::error::{DbError, DbResult, TxResult};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Registers a new account.
    ///
    /// ## Returns
    /// * `Ok(User)` - Stored account with a fresh UUID
    /// * `Err(Validation)` - Bad input or username already taken
    pub async fn register(&self, new_user: NewUser) -> TxResult<User> {
        validate_new_user(&new_user)?;

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username.trim().to_string(),
            password_hash: new_user.password_hash,
            role: new_user.role,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, role, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result.map_err(DbError::from) {
            Ok(_) => {}
            Err(DbError::UniqueViolation { .. }) => {
                return Err(ValidationError::Duplicate {
                    field: "username".to_string(),
                    value: user.username,
                }
                .into());
            }
            Err(other) => return Err(other.into()),
        }

        info!(id = %user.id, username = %user.username, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, created_at FROM users WHERE username = ?1",
        )
        .bind(username.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    /// Lists all accounts ordered by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, created_at FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Changes the password hash and/or role of an account.
    ///
    /// ## Returns
    /// * `Ok(User)` - Account after the change
    /// * `Err(Validation)` - Nothing to update
    /// * `Err(NotFound)` - Unknown username
    pub async fn update(&self, username: &str, update: UserUpdate) -> TxResult<User> {
        validate_username(username)?;
        validate_user_update(&update)?;
        debug!(username = %username, "Updating user");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                password_hash = COALESCE(?2, password_hash),
                role = COALESCE(?3, role)
            WHERE username = ?1
            "#,
        )
        .bind(username.trim())
        .bind(update.password_hash)
        .bind(update.role)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", username).into());
        }

        self.get_by_username(username)
            .await?
            .ok_or_else(|| DbError::not_found("User", username).into())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
