//! # Domain Types
//!
//! Core domain types used throughout Kasir.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    SaleLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id ("042")     │   │  id ("PJ017")   │   │  product_id     │       │
//! │  │  barcode        │◄──│  seller_name    │──►│  product_name   │       │
//! │  │  price          │   │  sale_date      │   │  quantity       │       │
//! │  │  stock (≥ 0)    │   │  total          │   │  unit_price     │       │
//! │  │  status         │   │  items[]        │   │  subtotal       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ProductStatus   │   │   SaleDraft     │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Active         │   │  id?            │   │  username       │       │
//! │  │  Deleted(at)    │   │  sale_date?     │   │  role           │       │
//! │  └─────────────────┘   │  items[]        │   │  Admin | Owner  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Drafts vs Records
//! Drafts are what the delivery layer hands in: identifiers and dates may be
//! missing, prices and totals are never trusted from the caller. Records are
//! what the database layer returns after a committed unit.
//!
//! A line references its product by id only. Name and price are copied into
//! the line when the sale commits, so later catalog edits or deletions leave
//! historical sales untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// Lifecycle of a catalog entry.
///
/// Products are never removed physically. A deleted product disappears from
/// every lookup and every stock mutation, but historical sale lines that
/// reference it stay valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "at", rename_all = "snake_case")]
pub enum ProductStatus {
    Active,
    Deleted(DateTime<Utc>),
}

impl ProductStatus {
    /// Builds the status from the nullable `deleted_at` column.
    pub fn from_deleted_at(deleted_at: Option<DateTime<Utc>>) -> Self {
        match deleted_at {
            None => ProductStatus::Active,
            Some(at) => ProductStatus::Deleted(at),
        }
    }

    /// The value stored in the `deleted_at` column.
    pub fn deleted_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ProductStatus::Active => None,
            ProductStatus::Deleted(at) => Some(*at),
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }
}

impl Default for ProductStatus {
    fn default() -> Self {
        ProductStatus::Active
    }
}

/// A catalog entry with its stock count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Sequencer identifier ("001", "042", ...) or caller-assigned.
    pub id: String,

    /// Display name, copied into sale lines at commit time.
    pub name: String,

    pub category: String,

    pub subcategory: String,

    /// External lookup code printed on the package.
    pub barcode: String,

    /// Unit price in the smallest currency unit.
    pub price: Money,

    /// Units on hand. Never negative.
    pub stock: i64,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[ts(type = "{ state: \"active\" } | { state: \"deleted\", at: string }")]
    pub status: ProductStatus,
}

impl Product {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Checks if `quantity` units can be taken from stock.
    pub fn can_fulfil(&self, quantity: i64) -> bool {
        self.is_active() && quantity > 0 && quantity <= self.stock
    }
}

/// Catalog input for create, update and import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductDraft {
    /// Assigned by the sequencer when absent.
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    pub subcategory: String,
    pub barcode: String,
    pub price: Money,
    pub stock: i64,
}

/// Outcome of a bulk catalog import.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ImportReport {
    /// Rows that were written, with their assigned identifiers.
    pub inserted: Vec<Product>,
    /// Rows dropped for an empty name or barcode, or a barcode already taken.
    pub skipped: usize,
}

// =============================================================================
// Sale
// =============================================================================

/// One product line of a committed sale.
///
/// Uses snapshot pattern: name and unit price are frozen at commit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub product_name: String,
    pub quantity: i64,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    /// unit_price × quantity.
    pub subtotal: Money,
}

impl SaleLine {
    /// Freezes `product` into a line of `quantity` units.
    ///
    /// Returns `None` when the subtotal does not fit in the money range.
    pub fn snapshot(product: &Product, quantity: i64) -> Option<Self> {
        let subtotal = product.price.checked_mul_quantity(quantity)?;
        Some(SaleLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            unit_price: product.price,
            subtotal,
        })
    }

    /// Whether `subtotal == unit_price × quantity` holds.
    pub fn is_consistent(&self) -> bool {
        self.unit_price.checked_mul_quantity(self.quantity) == Some(self.subtotal)
    }
}

/// A committed sale with its lines in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    /// Sequencer identifier ("PJ001", ...).
    pub id: String,
    pub seller_name: String,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub items: Vec<SaleLine>,
    /// Sum of all line subtotals.
    pub total: Money,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Sums the line subtotals, `None` on overflow.
    pub fn computed_total(&self) -> Option<Money> {
        Money::checked_sum(self.items.iter().map(|line| line.subtotal))
    }

    /// Whether the stored total and every line subtotal add up.
    pub fn is_consistent(&self) -> bool {
        self.items.iter().all(SaleLine::is_consistent)
            && self.computed_total() == Some(self.total)
    }

    /// Total units per product across all lines, in first-seen order.
    pub fn quantities_by_product(&self) -> Vec<(String, i64)> {
        let mut out: Vec<(String, i64)> = Vec::new();
        for line in &self.items {
            match out.iter_mut().find(|(id, _)| *id == line.product_id) {
                Some((_, qty)) => *qty += line.quantity,
                None => out.push((line.product_id.clone(), line.quantity)),
            }
        }
        out
    }
}

/// Requested product and quantity, before pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineDraft {
    pub product_id: String,
    pub quantity: i64,
}

impl LineDraft {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        LineDraft {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// A proposed sale as submitted for create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    /// Assigned by the sequencer on create when absent. Required on update.
    pub id: Option<String>,
    pub seller_name: String,
    /// Defaults to now on create and to the stored date on update.
    #[ts(as = "Option<String>")]
    pub sale_date: Option<DateTime<Utc>>,
    pub items: Vec<LineDraft>,
}

impl SaleDraft {
    pub fn new(seller_name: impl Into<String>, items: Vec<LineDraft>) -> Self {
        SaleDraft {
            id: None,
            seller_name: seller_name.into(),
            sale_date: None,
            items,
        }
    }

    /// Sets the identifier, for caller-assigned ids and updates.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_date(mut self, sale_date: DateTime<Utc>) -> Self {
        self.sale_date = Some(sale_date);
        self
    }
}

// =============================================================================
// Users & Roles
// =============================================================================

/// Account role. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including account management.
    Admin,
    /// Store owner: catalog and sales, read-only on accounts.
    Owner,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Whether this role grants `capability`.
    pub const fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::ManageAccounts => matches!(self, Role::Admin),
            Capability::ViewAccounts | Capability::ManageCatalog | Capability::RecordSales => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: format!("'{other}' is not one of admin, owner"),
            }),
        }
    }
}

/// Something a role may be allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewAccounts,
    ManageAccounts,
    ManageCatalog,
    RecordSales,
}

/// A login account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    /// UUID v4.
    pub id: String,
    pub username: String,
    /// Never serialized; hashing happens outside this crate.
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn can(&self, capability: Capability) -> bool {
        self.role.can(capability)
    }
}

/// Registration input.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial account change. At least one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.role.is_none()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
