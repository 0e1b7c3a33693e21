//! # Database Migrations
//!
//! Embedded SQL migrations for Kasir.
//!
//! ## Schema Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The schema backs the pipeline's invariants, so a bug in Rust code     │
//! │  fails the statement instead of committing bad state:                  │
//! │                                                                         │
//! │  products.stock      CHECK (stock >= 0)                                │
//! │  sale_items.quantity CHECK (quantity > 0)                              │
//! │  sale_items.subtotal CHECK (subtotal = unit_price * quantity)          │
//! │  users.role          CHECK (role IN ('admin', 'owner'))                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify existing migrations - always add new ones

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the `migrations/sqlite` directory.
///
/// The `sqlx::migrate!()` macro embeds all SQL files at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent and ordered by filename. Each migration runs in its own
/// transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)` for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_all_migrations_applied() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert_eq!(total, applied);
        assert!(total >= 1);

        // Running again is a no-op
        db.run_migrations().await.unwrap();
    }

    #[tokio::test]
    async fn test_negative_stock_is_rejected_by_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO products (id, name, price, stock, updated_at) VALUES ('001', 'x', 1, -1, '2024-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await;
        assert!(result.is_err());
    }
}
