//! # Sale Transaction Coordinator
//!
//! Creates, updates and deletes sales together with the stock moves they
//! imply, each call inside exactly one transaction.
//!
//! ## Batch Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    create_batch(drafts, deadline)                       │
//! │                                                                         │
//! │  Validating   every draft, every line; first error wins                │
//! │      │        nothing opened yet, nothing to undo                      │
//! │      ▼                                                                  │
//! │  BEGIN ─────────────────────────────────────────────────────────┐      │
//! │  Reserving    for sale in drafts, for line in sale (input order)│      │
//! │      │          ledger::decrease_stock  → snapshot name + price │      │
//! │      │          accumulate subtotal into the sale's total       │      │
//! │      ▼                                                          │      │
//! │  Committing   assign PJ ids, stamp updated_at, bulk insert      │      │
//! │      │                                                          │      │
//! │      ▼                                                          │      │
//! │  COMMIT ──► Committed                any error / deadline ──────┘      │
//! │                                        ──► ROLLBACK ──► Aborted        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Update and Delete
//! Both first put back the stock of every line of the stored version. Update
//! then reserves the new lines exactly like a create; delete removes the
//! record. Reverse and reapply share the unit, so a failed reapply also
//! undoes the reversal.
//!
//! ## Deadlines
//! Each entry point takes a `tokio::time::Instant` that bounds the work
//! before `COMMIT`. If it passes mid-unit, the in-flight future is dropped
//! along with its transaction and SQLite rolls it back. It is checked again
//! just before `COMMIT`, and the commit itself is never interrupted.
//! Nothing is retried automatically: a `ConflictRetryable` error tells the
//! caller to run the whole operation again.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use sqlx::{Sqlite, SqliteConnection, Transaction};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

use kasir_core::validation::{validate_quantity, validate_sale_batch, validate_sale_draft};
use kasir_core::{
    CoreError, IdKind, Money, Sale, SaleDraft, SaleLine, ValidationError,
};

use crate::error::{TxError, TxResult};
use crate::ledger;
use crate::pool::Database;
use crate::repository::sale as sale_store;
use crate::repository::sequence::IdSequencer;

/// A unit's work, staged in a transaction that has not been committed yet.
type Staged<T> = (Transaction<'static, Sqlite>, T);

/// Default deadline distance for each operation.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Used by [`SaleCoordinator::deadline`].
    pub operation_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// Orchestrates sale writes and their stock effects.
///
/// ## Usage
/// ```rust,ignore
/// let coordinator = db.coordinator();
///
/// let sales = coordinator
///     .create_batch(vec![SaleDraft::new("Ann", vec![LineDraft::new("001", 3)])], coordinator.deadline())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleCoordinator {
    db: Database,
    config: CoordinatorConfig,
}

impl SaleCoordinator {
    pub fn new(db: Database, config: CoordinatorConfig) -> Self {
        SaleCoordinator { db, config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Deadline for an operation starting now.
    pub fn deadline(&self) -> Instant {
        Instant::now() + self.config.operation_timeout
    }

    // =========================================================================
    // Entry Points
    // =========================================================================

    /// Creates every sale in `drafts`, or none of them.
    ///
    /// ## Returns
    /// * `Ok(Vec<Sale>)` - Committed sales in input order, with ids and totals
    /// * `Err(TxError)` - Nothing was written and no stock moved
    pub async fn create_batch(&self, drafts: Vec<SaleDraft>, deadline: Instant) -> TxResult<Vec<Sale>> {
        validate_sale_batch(&drafts).map_err(|err| rejected("create_batch", err))?;

        let sales = self
            .within("create_batch", deadline, self.create_unit(&drafts))
            .await?;

        info!(
            count = sales.len(),
            ids = ?sales.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            "Sale batch committed"
        );
        Ok(sales)
    }

    /// Replaces a stored sale with `draft`, whose id is required.
    ///
    /// Stock ends up as if only the new lines had ever been applied.
    pub async fn update(&self, draft: SaleDraft, deadline: Instant) -> TxResult<Sale> {
        let Some(id) = draft.id.clone() else {
            return Err(rejected("update", ValidationError::required("sale.id")));
        };
        validate_sale_draft(&draft, "sale").map_err(|err| rejected("update", err))?;

        let sale = self
            .within("update", deadline, self.update_unit(&id, &draft))
            .await?;

        info!(id = %sale.id, total = %sale.total, "Sale updated");
        Ok(sale)
    }

    /// Deletes a stored sale and puts its stock back.
    ///
    /// An unknown id fails with not found and moves no stock.
    pub async fn delete(&self, id: &str, deadline: Instant) -> TxResult<()> {
        let lines = self.within("delete", deadline, self.delete_unit(id)).await?;

        info!(id = %id, lines, "Sale deleted");
        Ok(())
    }

    /// Reads one committed sale.
    pub async fn get(&self, id: &str) -> TxResult<Sale> {
        self.db
            .sales()
            .get_by_id(id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()).into())
    }

    /// Reads every committed sale.
    pub async fn list(&self) -> TxResult<Vec<Sale>> {
        Ok(self.db.sales().list().await?)
    }

    // =========================================================================
    // Units
    // =========================================================================

    async fn create_unit(&self, drafts: &[SaleDraft]) -> TxResult<Staged<Vec<Sale>>> {
        let mut tx = self.db.pool().begin().await?;

        // Reserving
        let mut reserved = Vec::with_capacity(drafts.len());
        for (i, draft) in drafts.iter().enumerate() {
            let path = format!("sales[{i}]");
            reserved.push(reserve_lines(&mut *tx, draft, &path).await?);
        }

        // Committing
        let mut sequencer = IdSequencer::new(IdKind::Sale);
        for (i, draft) in drafts.iter().enumerate() {
            if let Some(id) = &draft.id {
                if sale_store::exists(&mut *tx, id).await? {
                    return Err(ValidationError::Duplicate {
                        field: format!("sales[{i}].id"),
                        value: id.clone(),
                    }
                    .into());
                }
                sequencer.observe(id);
            }
        }

        let now = Utc::now();
        let mut sales = Vec::with_capacity(drafts.len());
        for (draft, (items, total)) in drafts.iter().zip(reserved) {
            let id = match &draft.id {
                Some(id) => id.clone(),
                None => sequencer.next(&mut *tx).await?,
            };
            sales.push(Sale {
                id,
                seller_name: draft.seller_name.trim().to_string(),
                sale_date: draft.sale_date.unwrap_or(now),
                items,
                total,
                updated_at: now,
            });
        }

        sale_store::insert_all(&mut *tx, &sales).await?;
        Ok((tx, sales))
    }

    async fn update_unit(&self, id: &str, draft: &SaleDraft) -> TxResult<Staged<Sale>> {
        let mut tx = self.db.pool().begin().await?;

        let stored = sale_store::find(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        reverse_lines(&mut *tx, &stored).await?;
        let (items, total) = reserve_lines(&mut *tx, draft, "sale").await?;

        let sale = Sale {
            id: stored.id,
            seller_name: draft.seller_name.trim().to_string(),
            sale_date: draft.sale_date.unwrap_or(stored.sale_date),
            items,
            total,
            updated_at: Utc::now(),
        };

        sale_store::replace(&mut *tx, &sale).await?;
        Ok((tx, sale))
    }

    /// Stages the delete and yields how many lines were put back.
    async fn delete_unit(&self, id: &str) -> TxResult<Staged<usize>> {
        let mut tx = self.db.pool().begin().await?;

        let stored = sale_store::find(&mut *tx, id)
            .await?
            .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        reverse_lines(&mut *tx, &stored).await?;
        sale_store::remove(&mut *tx, id).await?;
        Ok((tx, stored.items.len()))
    }

    /// Runs `unit` until `deadline`, then commits what it staged.
    ///
    /// The deadline bounds the staging work and is checked once more right
    /// before commit. The commit itself is never cut short, so a
    /// `DeadlineExceeded` always means nothing was written.
    async fn within<T, F>(&self, operation: &'static str, deadline: Instant, unit: F) -> TxResult<T>
    where
        F: Future<Output = TxResult<Staged<T>>>,
    {
        let result = commit_before(operation, deadline, unit).await;

        if let Err(err) = &result {
            warn!(operation, kind = %err.kind(), error = %err, "Unit aborted, rolled back");
        }
        result
    }
}

async fn commit_before<T, F>(operation: &'static str, deadline: Instant, unit: F) -> TxResult<T>
where
    F: Future<Output = TxResult<Staged<T>>>,
{
    if Instant::now() >= deadline {
        return Err(TxError::DeadlineExceeded { operation });
    }

    let (tx, value) = timeout_at(deadline, unit)
        .await
        .map_err(|_| TxError::DeadlineExceeded { operation })??;

    if Instant::now() >= deadline {
        tx.rollback().await?;
        return Err(TxError::DeadlineExceeded { operation });
    }

    tx.commit().await?;
    Ok(value)
}

fn rejected(operation: &'static str, err: ValidationError) -> TxError {
    debug!(operation, error = %err, "Rejected before opening a unit");
    err.into()
}

/// Takes stock for every line of `draft`, in order, and prices the lines.
async fn reserve_lines(
    conn: &mut SqliteConnection,
    draft: &SaleDraft,
    path: &str,
) -> TxResult<(Vec<SaleLine>, Money)> {
    let mut items = Vec::with_capacity(draft.items.len());

    for (j, line) in draft.items.iter().enumerate() {
        let field = format!("{path}.items[{j}].quantity");
        validate_quantity(line.quantity, &field)?;

        let product = ledger::decrease_stock(conn, line.product_id.trim(), line.quantity).await?;
        let priced = SaleLine::snapshot(&product, line.quantity)
            .ok_or_else(|| out_of_range(&field))?;
        items.push(priced);
    }

    let total = Money::checked_sum(items.iter().map(|l| l.subtotal))
        .ok_or_else(|| out_of_range(&format!("{path}.total")))?;

    debug!(path = %path, lines = items.len(), total = %total, "Lines reserved");
    Ok((items, total))
}

/// Puts back the stock taken by every line of `sale`, one credit per product.
async fn reverse_lines(conn: &mut SqliteConnection, sale: &Sale) -> TxResult<()> {
    for (product_id, quantity) in sale.quantities_by_product() {
        ledger::increase_stock(conn, &product_id, quantity).await?;
    }
    debug!(id = %sale.id, lines = sale.items.len(), "Lines reversed");
    Ok(())
}

fn out_of_range(field: &str) -> TxError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "amount exceeds the supported range".to_string(),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::DbConfig;
    use kasir_core::{LineDraft, ProductDraft};

    async fn setup() -> (Database, SaleCoordinator) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for (id, name, price, stock) in [("001", "Teh Botol", 500, 10), ("002", "Aqua", 300, 5)] {
            db.products()
                .create(ProductDraft {
                    id: Some(id.to_string()),
                    name: name.to_string(),
                    barcode: format!("899{id}"),
                    price: Money::from_cents(price),
                    stock,
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        let coordinator = db.coordinator();
        (db, coordinator)
    }

    async fn stock(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock
    }

    #[tokio::test]
    async fn test_batch_assigns_distinct_ids_and_totals() {
        let (db, c) = setup().await;

        let sales = c
            .create_batch(
                vec![
                    SaleDraft::new("Ann", vec![LineDraft::new("001", 2), LineDraft::new("002", 1)]),
                    SaleDraft::new("Bob", vec![LineDraft::new("001", 1)]),
                ],
                c.deadline(),
            )
            .await
            .unwrap();

        assert_eq!(sales[0].id, "PJ001");
        assert_eq!(sales[1].id, "PJ002");
        assert_eq!(sales[0].total.cents(), 1300);
        assert_eq!(sales[0].items[0].product_name, "Teh Botol");
        assert!(sales.iter().all(Sale::is_consistent));

        assert_eq!(stock(&db, "001").await, 7);
        assert_eq!(stock(&db, "002").await, 4);
        assert_eq!(c.list().await.unwrap(), sales);
    }

    #[tokio::test]
    async fn test_validation_happens_before_any_stock_moves() {
        let (db, c) = setup().await;

        let err = c
            .create_batch(
                vec![
                    SaleDraft::new("Ann", vec![LineDraft::new("001", 2)]),
                    SaleDraft::new("Bob", vec![LineDraft::new("002", 0)]),
                ],
                c.deadline(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("sales[1].items[0].quantity"));
        assert_eq!(stock(&db, "001").await, 10);
    }

    #[tokio::test]
    async fn test_unknown_product_aborts_batch() {
        let (db, c) = setup().await;

        let err = c
            .create_batch(
                vec![SaleDraft::new(
                    "Ann",
                    vec![LineDraft::new("001", 2), LineDraft::new("999", 1)],
                )],
                c.deadline(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(stock(&db, "001").await, 10);
        assert!(c.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_caller_assigned_ids() {
        let (_db, c) = setup().await;

        let sales = c
            .create_batch(
                vec![
                    SaleDraft::new("Ann", vec![LineDraft::new("001", 1)]),
                    SaleDraft::new("Bob", vec![LineDraft::new("001", 1)]).with_id("PJ005"),
                ],
                c.deadline(),
            )
            .await
            .unwrap();
        assert_eq!(sales[0].id, "PJ006");
        assert_eq!(sales[1].id, "PJ005");

        let err = c
            .create_batch(
                vec![SaleDraft::new("Cy", vec![LineDraft::new("001", 1)]).with_id("PJ005")],
                c.deadline(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_update_keeps_date_unless_given() {
        let (db, c) = setup().await;
        let created = c
            .create_batch(
                vec![SaleDraft::new("Ann", vec![LineDraft::new("001", 3)])],
                c.deadline(),
            )
            .await
            .unwrap()
            .remove(0);

        let updated = c
            .update(
                SaleDraft::new("Ann", vec![LineDraft::new("002", 2)]).with_id(&created.id),
                c.deadline(),
            )
            .await
            .unwrap();

        assert_eq!(updated.sale_date, created.sale_date);
        assert_eq!(updated.total.cents(), 600);
        assert_eq!(stock(&db, "001").await, 10);
        assert_eq!(stock(&db, "002").await, 3);
        assert_eq!(c.get(&created.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_requires_existing_id() {
        let (_db, c) = setup().await;

        let err = c
            .update(SaleDraft::new("Ann", vec![LineDraft::new("001", 1)]), c.deadline())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = c
            .update(
                SaleDraft::new("Ann", vec![LineDraft::new("001", 1)]).with_id("PJ404"),
                c.deadline(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_failed_update_undoes_reversal() {
        let (db, c) = setup().await;
        let created = c
            .create_batch(
                vec![SaleDraft::new("Ann", vec![LineDraft::new("001", 3)])],
                c.deadline(),
            )
            .await
            .unwrap()
            .remove(0);

        let err = c
            .update(
                SaleDraft::new("Ann", vec![LineDraft::new("001", 11)]).with_id(&created.id),
                c.deadline(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        assert_eq!(stock(&db, "001").await, 7);
        assert_eq!(c.get(&created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_delete_unknown_sale() {
        let (db, c) = setup().await;

        let err = c.delete("PJ404", c.deadline()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(stock(&db, "001").await, 10);
    }

    #[tokio::test]
    async fn test_expired_deadline_aborts() {
        let (db, c) = setup().await;

        let err = c
            .create_batch(
                vec![SaleDraft::new("Ann", vec![LineDraft::new("001", 1)])],
                Instant::now(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        assert_eq!(stock(&db, "001").await, 10);
        assert!(c.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_passing_during_unit_discards_staged_work() {
        let (db, c) = setup().await;
        let deadline = Instant::now() + Duration::from_millis(200);

        let err = c
            .within("create_batch", deadline, async {
                let mut tx = db.pool().begin().await?;
                ledger::decrease_stock(&mut *tx, "001", 4).await?;
                // Blocks the runtime so the unit finishes after the deadline
                // without giving the timer a chance to fire first.
                while Instant::now() < deadline {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Ok::<_, TxError>((tx, ()))
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DeadlineExceeded);
        assert_eq!(stock(&db, "001").await, 10);
    }

    #[tokio::test]
    async fn test_update_may_reuse_stock_it_gives_back() {
        let (db, c) = setup().await;
        let created = c
            .create_batch(
                vec![SaleDraft::new("Ann", vec![LineDraft::new("001", 3)])],
                c.deadline(),
            )
            .await
            .unwrap()
            .remove(0);
        assert_eq!(stock(&db, "001").await, 7);

        let updated = c
            .update(
                SaleDraft::new("Ann", vec![LineDraft::new("001", 10)]).with_id(&created.id),
                c.deadline(),
            )
            .await
            .unwrap();

        assert_eq!(updated.items[0].quantity, 10);
        assert_eq!(stock(&db, "001").await, 0);
    }

    #[tokio::test]
    async fn test_delete_credits_repeated_product_once_in_total() {
        let (db, c) = setup().await;
        let created = c
            .create_batch(
                vec![SaleDraft::new(
                    "Ann",
                    vec![LineDraft::new("001", 2), LineDraft::new("002", 1), LineDraft::new("001", 3)],
                )],
                c.deadline(),
            )
            .await
            .unwrap()
            .remove(0);
        assert_eq!(stock(&db, "001").await, 5);

        c.delete(&created.id, c.deadline()).await.unwrap();
        assert_eq!(stock(&db, "001").await, 10);
        assert_eq!(stock(&db, "002").await, 5);
    }

    #[tokio::test]
    async fn test_foreign_caller_id_rejected_before_unit() {
        let (db, c) = setup().await;

        let err = c
            .create_batch(
                vec![
                    SaleDraft::new("Ann", vec![LineDraft::new("001", 1)]),
                    SaleDraft::new("Bob", vec![LineDraft::new("001", 1)]).with_id("INV-2024"),
                ],
                c.deadline(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("sales[1].id"));
        assert_eq!(stock(&db, "001").await, 10);

        let sales = c
            .create_batch(
                vec![SaleDraft::new("Cy", vec![LineDraft::new("001", 1)])],
                c.deadline(),
            )
            .await
            .unwrap();
        assert_eq!(sales[0].id, "PJ001");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            CoordinatorConfig::default().operation_timeout,
            Duration::from_secs(10)
        );
    }
}
