//! # Product Repository
//!
//! Catalog operations for products. Stock moves made by sales go through
//! [`crate::ledger`]; this repository owns everything else about a product.
//!
//! ## Soft Delete
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Lifecycle                                    │
//! │                                                                         │
//! │  create / import                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────┐   soft_delete   ┌────────────────────────────┐       │
//! │  │ deleted_at   │ ──────────────► │ deleted_at = <timestamp>   │       │
//! │  │   NULL       │                 │ hidden from every lookup   │       │
//! │  └──────────────┘                 │ row kept for sale history  │       │
//! │                                   └────────────────────────────┘       │
//! │                                                                         │
//! │  Deleted rows still count for the ID sequencer, so an id is never      │
//! │  handed out twice.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use kasir_core::validation::{is_importable, validate_product_draft};
use kasir_core::{
    IdKind, ImportReport, Money, Product, ProductDraft, ProductStatus, ValidationError,
};

use crate::error::{DbError, DbResult, TxResult};
use crate::repository::sequence::IdSequencer;

// =============================================================================
// Row Mapping
// =============================================================================

/// Raw `products` row. `deleted_at` becomes [`ProductStatus`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: String,
    name: String,
    category: String,
    subcategory: String,
    barcode: String,
    price: i64,
    stock: i64,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            category: row.category,
            subcategory: row.subcategory,
            barcode: row.barcode,
            price: Money::from_cents(row.price),
            stock: row.stock,
            updated_at: row.updated_at,
            status: ProductStatus::from_deleted_at(row.deleted_at),
        }
    }
}

fn into_product(id: String, draft: ProductDraft, now: DateTime<Utc>) -> Product {
    Product {
        id,
        name: draft.name.trim().to_string(),
        category: draft.category.trim().to_string(),
        subcategory: draft.subcategory.trim().to_string(),
        barcode: draft.barcode.trim().to_string(),
        price: draft.price,
        stock: draft.stock,
        updated_at: now,
        status: ProductStatus::Active,
    }
}

async fn insert_all(conn: &mut SqliteConnection, products: &[Product]) -> DbResult<()> {
    for p in products {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, category, subcategory, barcode,
                price, stock, updated_at, deleted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&p.id)
        .bind(&p.name)
        .bind(&p.category)
        .bind(&p.subcategory)
        .bind(&p.barcode)
        .bind(p.price.cents())
        .bind(p.stock)
        .bind(p.updated_at)
        .bind(p.status.deleted_at())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.create(draft).await?;
/// let active = repo.list_active().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    ///
    /// The id is assigned by the sequencer when the draft has none. Reading
    /// the high-water id and inserting happen in one transaction.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(Validation)` - Bad draft, or caller-assigned id already taken
    pub async fn create(&self, draft: ProductDraft) -> TxResult<Product> {
        validate_product_draft(&draft)?;

        let mut tx = self.pool.begin().await?;

        let id = match draft.id.clone() {
            Some(id) => {
                let id = id.trim().to_string();
                if exists(&mut *tx, &id).await? {
                    return Err(ValidationError::Duplicate {
                        field: "id".to_string(),
                        value: id,
                    }
                    .into());
                }
                id
            }
            None => IdSequencer::new(IdKind::Product).next(&mut *tx).await?,
        };

        let product = into_product(id, draft, Utc::now());
        insert_all(&mut *tx, std::slice::from_ref(&product)).await?;
        tx.commit().await?;

        info!(id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Lists active products ordered by id.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, subcategory, barcode,
                   price, stock, updated_at, deleted_at
            FROM products
            WHERE deleted_at IS NULL
            ORDER BY LENGTH(id), id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Listed active products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets an active product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Unknown or soft-deleted
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, subcategory, barcode,
                   price, stock, updated_at, deleted_at
            FROM products
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Gets an active product by its exact name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT id, name, category, subcategory, barcode,
                   price, stock, updated_at, deleted_at
            FROM products
            WHERE name = ?1 AND deleted_at IS NULL
            ORDER BY LENGTH(id), id
            LIMIT 1
            "#,
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Replaces the catalog fields of an active product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product as stored after the update
    /// * `Err(NotFound)` - Unknown or soft-deleted
    pub async fn update(&self, id: &str, draft: ProductDraft) -> TxResult<Product> {
        validate_product_draft(&draft)?;
        debug!(id = %id, "Updating product");

        let product = into_product(id.to_string(), draft, Utc::now());

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                subcategory = ?4,
                barcode = ?5,
                price = ?6,
                stock = ?7,
                updated_at = ?8
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(&product.subcategory)
        .bind(&product.barcode)
        .bind(product.price.cents())
        .bind(product.stock)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id).into());
        }

        Ok(product)
    }

    /// Soft-deletes a product by stamping `deleted_at`.
    ///
    /// Historical sales keep their lines; the product just stops resolving.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET deleted_at = ?2,
                updated_at = ?2
            WHERE id = ?1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        info!(id = %id, "Product soft-deleted");
        Ok(())
    }

    /// Bulk-inserts already parsed rows in one transaction.
    ///
    /// ## Skipped Rows
    /// - Empty name or barcode
    /// - Barcode already used by an active product
    /// - Barcode repeated earlier in the same import
    ///
    /// Accepted rows get consecutive sequencer ids, ignoring any id in the
    /// row. An import that accepts nothing fails with a validation error.
    pub async fn import(&self, drafts: Vec<ProductDraft>) -> TxResult<ImportReport> {
        let mut tx = self.pool.begin().await?;

        let taken: Vec<String> =
            sqlx::query_scalar("SELECT barcode FROM products WHERE deleted_at IS NULL")
                .fetch_all(&mut *tx)
                .await?;
        let mut barcodes: HashSet<String> = taken.into_iter().collect();

        let total = drafts.len();
        let accepted: Vec<ProductDraft> = drafts
            .into_iter()
            .filter(|draft| is_importable(draft) && barcodes.insert(draft.barcode.trim().to_string()))
            .collect();
        let skipped = total - accepted.len();

        if accepted.is_empty() {
            return Err(ValidationError::Empty {
                field: "products".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        let mut sequencer = IdSequencer::new(IdKind::Product);
        let mut inserted = Vec::with_capacity(accepted.len());
        for draft in accepted {
            let id = sequencer.next(&mut *tx).await?;
            inserted.push(into_product(id, draft, now));
        }

        insert_all(&mut *tx, &inserted).await?;
        tx.commit().await?;

        info!(inserted = inserted.len(), skipped, "Products imported");
        Ok(ImportReport { inserted, skipped })
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Whether any product row, deleted or not, uses `id`.
async fn exists(conn: &mut SqliteConnection, id: &str) -> DbResult<bool> {
    let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(found.is_some())
}

// =============================================================================
// Unit Tests
// =============================================================================
