//! # Sale Record Store
//!
//! Persistence of finalized sales and their lines. No business rules live
//! here: the coordinator hands over documents that are already priced,
//! totalled and identified.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales                          sale_items                              │
//! │  ─────────────────────          ───────────────────────────────         │
//! │  id  (PK)          ◄─────────── sale_id  (FK, ON DELETE CASCADE)        │
//! │  seller_name                    position (input order)                  │
//! │  sale_date                      product_id (no FK, history survives)    │
//! │  total                          product_name, quantity                  │
//! │  updated_at                     unit_price, subtotal                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions take a connection so they run inside the caller's
//! transaction. [`SaleRepository`] is the pool-backed read side.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use kasir_core::{Money, Sale, SaleLine};

use crate::error::{DbError, DbResult};

// =============================================================================
// Row Mapping
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    seller_name: String,
    sale_date: DateTime<Utc>,
    total: i64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    sale_id: String,
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price: i64,
    subtotal: i64,
}

impl From<SaleItemRow> for SaleLine {
    fn from(row: SaleItemRow) -> Self {
        SaleLine {
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price),
            subtotal: Money::from_cents(row.subtotal),
        }
    }
}

fn assemble(row: SaleRow, items: Vec<SaleLine>) -> Sale {
    Sale {
        id: row.id,
        seller_name: row.seller_name,
        sale_date: row.sale_date,
        items,
        total: Money::from_cents(row.total),
        updated_at: row.updated_at,
    }
}

// =============================================================================
// Unit-Scoped Operations
// =============================================================================

/// Inserts sales and all their lines.
///
/// Statements run on the caller's connection, so inside a transaction the
/// whole batch lands in one commit.
pub async fn insert_all(conn: &mut SqliteConnection, sales: &[Sale]) -> DbResult<()> {
    let mut line_count = 0;

    for sale in sales {
        sqlx::query(
            r#"
            INSERT INTO sales (id, seller_name, sale_date, total, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.seller_name)
        .bind(sale.sale_date)
        .bind(sale.total.cents())
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        insert_lines(conn, sale).await?;
        line_count += sale.items.len();
    }

    debug!(sales = sales.len(), lines = line_count, "Inserted sales");
    Ok(())
}

async fn insert_lines(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    for (position, line) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, position, product_id, product_name,
                quantity, unit_price, subtotal
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale.id)
        .bind(position as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .bind(line.subtotal.cents())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Reads one sale with its lines in position order.
pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let row = sqlx::query_as::<_, SaleRow>(
        "SELECT id, seller_name, sale_date, total, updated_at FROM sales WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT sale_id, product_id, product_name, quantity, unit_price, subtotal
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY position
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(assemble(row, items.into_iter().map(SaleLine::from).collect())))
}

/// Reads every sale, ordered by identifier number.
pub async fn list(conn: &mut SqliteConnection) -> DbResult<Vec<Sale>> {
    let rows = sqlx::query_as::<_, SaleRow>(
        "SELECT id, seller_name, sale_date, total, updated_at FROM sales ORDER BY LENGTH(id), id",
    )
    .fetch_all(&mut *conn)
    .await?;

    let items = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT sale_id, product_id, product_name, quantity, unit_price, subtotal
        FROM sale_items
        ORDER BY sale_id, position
        "#,
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut by_sale: HashMap<String, Vec<SaleLine>> = HashMap::new();
    for item in items {
        by_sale
            .entry(item.sale_id.clone())
            .or_default()
            .push(SaleLine::from(item));
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let lines = by_sale.remove(&row.id).unwrap_or_default();
            assemble(row, lines)
        })
        .collect())
}

/// Whether a sale with `id` exists.
pub async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM sales WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

/// Replaces the header and all lines of an existing sale.
pub async fn replace(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE sales SET
            seller_name = ?2,
            sale_date = ?3,
            total = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.seller_name)
    .bind(sale.sale_date)
    .bind(sale.total.cents())
    .bind(sale.updated_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", &sale.id));
    }

    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(&sale.id)
        .execute(&mut *conn)
        .await?;

    insert_lines(conn, sale).await?;

    debug!(id = %sale.id, lines = sale.items.len(), "Replaced sale");
    Ok(())
}

/// Deletes a sale and its lines.
pub async fn remove(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", id));
    }

    debug!(id = %id, "Removed sale");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Pool-backed read access to committed sales.
///
/// Writes go through [`crate::coordinator::SaleCoordinator`], which keeps
/// stock and sale records in one unit.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, id).await
    }

    /// Lists every committed sale.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        list(&mut conn).await
    }

    /// Counts committed sales (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn line(product_id: &str, quantity: i64, unit_price: i64) -> SaleLine {
        SaleLine {
            product_id: product_id.to_string(),
            product_name: format!("Product {product_id}"),
            quantity,
            unit_price: Money::from_cents(unit_price),
            subtotal: Money::from_cents(unit_price * quantity),
        }
    }

    fn sale(id: &str, items: Vec<SaleLine>) -> Sale {
        let total = Money::checked_sum(items.iter().map(|l| l.subtotal)).unwrap();
        Sale {
            id: id.to_string(),
            seller_name: "Ann".to_string(),
            sale_date: Utc::now(),
            items,
            total,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_find_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        let sales = vec![
            sale("PJ002", vec![line("001", 2, 500), line("002", 1, 900)]),
            sale("PJ001", vec![line("003", 4, 250)]),
        ];
        insert_all(&mut conn, &sales).await.unwrap();

        let found = find(&mut conn, "PJ002").await.unwrap().unwrap();
        assert_eq!(found.items.len(), 2);
        assert_eq!(found.items[0].product_id, "001");
        assert_eq!(found.total.cents(), 1900);
        assert!(found.is_consistent());

        let all = list(&mut conn).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["PJ001", "PJ002"]);
        assert_eq!(all[0].items.len(), 1);

        assert!(find(&mut conn, "PJ404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_and_remove() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        insert_all(&mut conn, &[sale("PJ001", vec![line("001", 2, 500)])])
            .await
            .unwrap();

        let replacement = sale("PJ001", vec![line("002", 1, 700), line("001", 1, 500)]);
        replace(&mut conn, &replacement).await.unwrap();

        let found = find(&mut conn, "PJ001").await.unwrap().unwrap();
        assert_eq!(found.items, replacement.items);
        assert_eq!(found.total.cents(), 1200);

        remove(&mut conn, "PJ001").await.unwrap();
        assert!(!exists(&mut conn, "PJ001").await.unwrap());

        let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(leftover, 0);

        assert!(matches!(
            remove(&mut conn, "PJ001").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(
            replace(&mut conn, &replacement).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_unique_violation() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        insert_all(&mut conn, &[sale("PJ001", vec![line("001", 1, 500)])])
            .await
            .unwrap();
        let err = insert_all(&mut conn, &[sale("PJ001", vec![line("001", 1, 500)])])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_repository_reads() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        {
            let mut conn = db.pool().acquire().await.unwrap();
            insert_all(&mut conn, &[sale("PJ001", vec![line("001", 1, 500)])])
                .await
                .unwrap();
        }

        let repo = db.sales();
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get_by_id("PJ001").await.unwrap().is_some());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }
}
