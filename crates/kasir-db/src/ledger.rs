//! # Product Ledger
//!
//! Stock moves on single products. Every function here runs on a
//! connection the caller already holds, normally the connection of an open
//! transaction, so any number of moves compose into one atomic unit.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  decrease_stock("001", 3)                                              │
//! │                                                                         │
//! │  1. SELECT … WHERE id = '001' AND deleted_at IS NULL                   │
//! │        └── none?        → ProductNotFound                              │
//! │        └── stock < 3?   → InsufficientStock   (no write issued)        │
//! │                                                                         │
//! │  2. UPDATE products SET stock = stock - 3                              │
//! │     WHERE id = '001' AND deleted_at IS NULL AND stock >= 3             │
//! │        └── 0 rows?      → Conflict (stock moved under us)              │
//! │                                                                         │
//! │  The guard in step 2 means no statement can ever write a negative      │
//! │  count, and CHECK (stock >= 0) backs it at the schema level.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failures are returned, never retried here. The caller decides whether
//! the enclosing unit aborts.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::debug;

use kasir_core::validation::validate_quantity;
use kasir_core::{CoreError, Product};

use crate::error::{TxError, TxResult};
use crate::repository::product::ProductRow;

/// Reads an active product.
///
/// ## Returns
/// * `Ok(Product)` - Product exists and is not soft-deleted
/// * `Err(ProductNotFound)` - Unknown id or soft-deleted
pub async fn lookup(conn: &mut SqliteConnection, product_id: &str) -> TxResult<Product> {
    let row = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, category, subcategory, barcode,
               price, stock, updated_at, deleted_at
        FROM products
        WHERE id = ?1 AND deleted_at IS NULL
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(Product::from)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
}

/// Takes `quantity` units out of stock.
///
/// Returns the product as it stands after the decrement; its name and
/// price are what a sale line snapshots.
pub async fn decrease_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> TxResult<Product> {
    validate_quantity(quantity, "quantity")?;

    let mut product = lookup(conn, product_id).await?;

    if !product.can_fulfil(quantity) {
        debug!(
            product_id = %product_id,
            available = product.stock,
            requested = quantity,
            "Insufficient stock"
        );
        return Err(CoreError::InsufficientStock {
            product_id: product.id,
            name: product.name,
            available: product.stock,
            requested: quantity,
        }
        .into());
    }

    let now = Utc::now();
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?2,
            updated_at = ?3
        WHERE id = ?1 AND deleted_at IS NULL AND stock >= ?2
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(TxError::Conflict(format!(
            "stock of product {product_id} changed during the unit"
        )));
    }

    product.stock -= quantity;
    product.updated_at = now;

    debug!(
        product_id = %product_id,
        quantity,
        remaining = product.stock,
        "Stock decreased"
    );
    Ok(product)
}

/// Puts `quantity` units back into stock.
///
/// Only used to reverse an earlier decrement when a sale is updated or
/// deleted. Soft-deleted products are not touched and report not found.
pub async fn increase_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> TxResult<()> {
    validate_quantity(quantity, "quantity")?;

    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock + ?2,
            updated_at = ?3
        WHERE id = ?1 AND deleted_at IS NULL
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CoreError::ProductNotFound(product_id.to_string()).into());
    }

    debug!(product_id = %product_id, quantity, "Stock increased");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use kasir_core::{Money, ProductDraft};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
            .create(ProductDraft {
                id: Some("001".to_string()),
                name: "Teh Botol".to_string(),
                barcode: "8991001".to_string(),
                price: Money::from_cents(500),
                stock: 10,
                ..Default::default()
            })
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_decrease_within_stock() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let product = decrease_stock(&mut conn, "001", 3).await.unwrap();
        assert_eq!(product.stock, 7);
        assert_eq!(lookup(&mut conn, "001").await.unwrap().stock, 7);

        let product = decrease_stock(&mut conn, "001", 7).await.unwrap();
        assert_eq!(product.stock, 0);
    }

    #[tokio::test]
    async fn test_decrease_beyond_stock_leaves_it_untouched() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        let err = decrease_stock(&mut conn, "001", 11).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(lookup(&mut conn, "001").await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_unknown_and_deleted_products() {
        let db = setup().await;
        db.products().soft_delete("001").await.unwrap();
        let mut conn = db.pool().acquire().await.unwrap();

        for id in ["001", "404"] {
            assert_eq!(lookup(&mut conn, id).await.unwrap_err().kind(), ErrorKind::NotFound);
            assert_eq!(
                decrease_stock(&mut conn, id, 1).await.unwrap_err().kind(),
                ErrorKind::NotFound
            );
            assert_eq!(
                increase_stock(&mut conn, id, 1).await.unwrap_err().kind(),
                ErrorKind::NotFound
            );
        }
    }

    #[tokio::test]
    async fn test_quantity_must_be_positive() {
        let db = setup().await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert_eq!(
            increase_stock(&mut conn, "001", 0).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            decrease_stock(&mut conn, "001", -2).await.unwrap_err().kind(),
            ErrorKind::Validation
        );
    }

    #[tokio::test]
    async fn test_rolled_back_moves_disappear() {
        let db = setup().await;

        let mut tx = db.pool().begin().await.unwrap();
        decrease_stock(&mut *tx, "001", 4).await.unwrap();
        increase_stock(&mut *tx, "001", 1).await.unwrap();
        assert_eq!(lookup(&mut *tx, "001").await.unwrap().stock, 7);
        tx.rollback().await.unwrap();

        let product = db.products().get_by_id("001").await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
    }
}
