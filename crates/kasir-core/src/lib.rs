//! # kasir-core: Pure Business Logic for Kasir
//!
//! Types and rules shared by every layer of the inventory / point-of-sale
//! backend. Nothing in here touches a database, a socket or a file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasir Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Delivery layer (HTTP, auth) - external             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ SaleDraft / ProductDraft              │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kasir-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    ids    │  │ validation│  │   │
//! │  │   │  Product  │  │   Money   │  │  IdKind   │  │   rules   │  │   │
//! │  │   │  Sale     │  │ line math │  │  PJ001    │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                kasir-db (Database Layer)                        │   │
//! │  │     ledger, sequencer, sale coordinator, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, User, etc.)
//! - [`money`] - Integer money with checked line arithmetic
//! - [`ids`] - Human-readable sequencer identifiers
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary validation of drafts
//!
//! ## Example Usage
//!
//! ```rust
//! use kasir_core::money::Money;
//!
//! let price = Money::from_cents(500);
//! let subtotal = price.checked_mul_quantity(3).unwrap();
//! assert_eq!(subtotal.cents(), 1500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ids;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use ids::IdKind;
pub use money::Money;
pub use types::*;
