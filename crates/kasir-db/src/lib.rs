//! # kasir-db: Storage and Sale Pipeline for Kasir
//!
//! SQLite storage through sqlx, plus the units of work that keep stock and
//! sales consistent with each other.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kasir Data Flow                                │
//! │                                                                         │
//! │  HTTP handler (POST /penjualan, PUT /produk/:id, ...)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     kasir-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐   ┌───────────────┐   ┌────────────────┐   │   │
//! │  │   │SaleCoordinator│──►│    ledger     │   │  Repositories  │   │   │
//! │  │   │ (coordinator) │   │ (stock moves) │   │ product / sale │   │   │
//! │  │   │ create_batch  │   └───────────────┘   │ user / sequence│   │   │
//! │  │   │ update/delete │──────────────────────►│                │   │   │
//! │  │   └───────┬───────┘                       └────────────────┘   │   │
//! │  │           │ one transaction per call                          │   │
//! │  │   ┌───────▼───────┐   ┌───────────────┐                        │   │
//! │  │   │   Database    │   │  Migrations   │                        │   │
//! │  │   │   (pool.rs)   │   │  (embedded)   │                        │   │
//! │  │   └───────────────┘   └───────────────┘                        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-driven settings
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage errors and the classified [`TxError`]
//! - [`ledger`] - Stock decrement and increment inside a unit
//! - [`coordinator`] - Sale create, update and delete with their stock effects
//! - [`repository`] - Products, sales, users and the id sequencer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kasir_db::{Database, KasirConfig};
//!
//! let config = KasirConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let coordinator = db.coordinator_with(config.coordinator_config());
//! let sales = coordinator.create_batch(drafts, coordinator.deadline()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{ConfigError, KasirConfig};
pub use coordinator::{CoordinatorConfig, SaleCoordinator};
pub use error::{DbError, DbResult, ErrorKind, TxError, TxResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::sequence::IdSequencer;
pub use repository::user::UserRepository;
