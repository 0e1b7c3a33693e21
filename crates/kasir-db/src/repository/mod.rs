//! # Repository Module
//!
//! Storage access for each collection.
//!
//! ## Two Ways In
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Pool-scoped (reads, single-statement writes)                          │
//! │       db.products().list_active()                                      │
//! │       db.users().register(new_user)                                    │
//! │                                                                         │
//! │  Unit-scoped (free functions taking &mut SqliteConnection)             │
//! │       sale::insert_all(&mut *tx, &sales)                               │
//! │       IdSequencer::next(&mut *tx)                                      │
//! │       Called by the coordinator while it holds the transaction.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog CRUD, soft delete, bulk import
//! - [`sale::SaleRepository`] - Committed sale reads
//! - [`user::UserRepository`] - Accounts and roles
//! - [`sequence::IdSequencer`] - Human-readable ids

pub mod product;
pub mod sale;
pub mod sequence;
pub mod user;
