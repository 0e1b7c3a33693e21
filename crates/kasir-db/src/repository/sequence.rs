//! # ID Sequencer
//!
//! Hands out the next human-readable identifier of a kind, based on the
//! highest one already stored.
//!
//! ## Cursor Within a Unit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    next()  → SELECT high-water ("PJ007")  → cursor = 7  → "PJ008"      │
//! │    next()  → cursor = 8                   → "PJ009"   (no re-read)     │
//! │    observe("PJ020")  → cursor = 20                                     │
//! │    next()  → "PJ021"                                                   │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The high-water read must run on the same connection and inside the same
//! transaction as the insert it names. Two writers cannot both commit the
//! same identifier: the second one either waits for the first, sees its row
//! and moves on, or fails on the primary key.

use sqlx::SqliteConnection;
use tracing::debug;

use kasir_core::IdKind;

use crate::error::TxResult;

/// Identifier generator scoped to one atomic unit.
#[derive(Debug, Clone)]
pub struct IdSequencer {
    kind: IdKind,
    /// Highest number known so far; `None` until the store has been read.
    cursor: Option<u64>,
    /// Highest caller-assigned number seen before the store was read.
    observed: u64,
}

impl IdSequencer {
    pub fn new(kind: IdKind) -> Self {
        IdSequencer {
            kind,
            cursor: None,
            observed: 0,
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// Accounts for an identifier assigned by the caller in the same batch.
    ///
    /// Identifiers outside this kind's pattern cannot collide with generated
    /// ones and are ignored.
    pub fn observe(&mut self, id: &str) {
        let Ok(number) = self.kind.parse(id) else {
            return;
        };
        match self.cursor.as_mut() {
            Some(cursor) => *cursor = (*cursor).max(number),
            None => self.observed = self.observed.max(number),
        }
    }

    /// Returns the next identifier.
    ///
    /// ## Errors
    /// `InvalidIdentifier` when the stored high-water id does not match the
    /// kind's pattern, or when the series has no number left.
    pub async fn next(&mut self, conn: &mut SqliteConnection) -> TxResult<String> {
        let current = match self.cursor {
            Some(cursor) => cursor,
            None => {
                let stored = match high_water(conn, self.kind).await? {
                    Some(id) => self.kind.parse(&id)?,
                    None => 0,
                };
                stored.max(self.observed)
            }
        };

        let next = self.kind.successor(current)?;
        self.cursor = Some(next);

        let id = self.kind.format(next);
        debug!(kind = %self.kind, id = %id, "Assigned identifier");
        Ok(id)
    }
}

/// Finds the stored identifier with the greatest number.
///
/// Ordering by length first keeps "PJ1000" above "PJ999". Soft-deleted
/// products are included so their ids are never reused.
pub async fn high_water(conn: &mut SqliteConnection, kind: IdKind) -> TxResult<Option<String>> {
    let sql = match kind {
        IdKind::Product => "SELECT id FROM products ORDER BY LENGTH(id) DESC, id DESC LIMIT 1",
        IdKind::Sale => "SELECT id FROM sales ORDER BY LENGTH(id) DESC, id DESC LIMIT 1",
    };

    let id: Option<String> = sqlx::query_scalar(sql).fetch_optional(&mut *conn).await?;
    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};

    async fn db_with_sales(ids: &[&str]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for id in ids {
            sqlx::query(
                "INSERT INTO sales (id, seller_name, sale_date, total, updated_at) VALUES (?1, 'Ann', '2024-01-01T00:00:00Z', 0, '2024-01-01T00:00:00Z')",
            )
            .bind(*id)
            .execute(db.pool())
            .await
            .unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_empty_collection_yields_seed() {
        let db = db_with_sales(&[]).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let mut seq = IdSequencer::new(IdKind::Sale);
        assert_eq!(seq.next(&mut conn).await.unwrap(), "PJ001");
        assert_eq!(seq.next(&mut conn).await.unwrap(), "PJ002");

        let mut seq = IdSequencer::new(IdKind::Product);
        assert_eq!(seq.next(&mut conn).await.unwrap(), "001");
    }

    #[tokio::test]
    async fn test_numeric_high_water() {
        let db = db_with_sales(&["PJ999", "PJ1000", "PJ998"]).await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(
            high_water(&mut conn, IdKind::Sale).await.unwrap().as_deref(),
            Some("PJ1000")
        );
        let mut seq = IdSequencer::new(IdKind::Sale);
        assert_eq!(seq.next(&mut conn).await.unwrap(), "PJ1001");
    }

    #[tokio::test]
    async fn test_observed_ids_are_skipped() {
        let db = db_with_sales(&["PJ003"]).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let mut seq = IdSequencer::new(IdKind::Sale);
        seq.observe("PJ010");
        seq.observe("custom-id");
        assert_eq!(seq.next(&mut conn).await.unwrap(), "PJ011");

        seq.observe("PJ050");
        assert_eq!(seq.next(&mut conn).await.unwrap(), "PJ051");
    }

    #[tokio::test]
    async fn test_exhausted_series_fails_instead_of_wrapping() {
        let db = db_with_sales(&[]).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let mut seq = IdSequencer::new(IdKind::Sale);
        seq.observe("PJ18446744073709551615");
        let err = seq.next(&mut conn).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }

    #[tokio::test]
    async fn test_malformed_high_water_fails() {
        let db = db_with_sales(&["PJ001", "LEGACY-42"]).await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = IdSequencer::new(IdKind::Sale)
            .next(&mut conn)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageFailure);
    }
}
