//! # caisse-core: Pure Business Logic for Caisse POS
//!
//! Everything the cashier's screen computes locally lives here: packaging
//! (conditionnement) selection, quantity bounds, cart totals, stock
//! reconciliation and change calculation. There is no I/O in this crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caisse POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile shell (screens)                       │   │
//! │  │    Catalogue ──► Panier ──► Encaissement ──► Ticket             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caisse-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────────┐ ┌──────────┐ ┌──────────────┐  │   │
//! │  │   │  module  │ │conditionnemt │ │   cart   │ │   checkout   │  │   │
//! │  │   │  themes  │ │ labels/emoji │ │  lines   │ │   change     │  │   │
//! │  │   │  vocab   │ │ qty bounds   │ │ reconcile│ │   vente      │  │   │
//! │  │   └──────────┘ └──────────────┘ └──────────┘ └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                caisse-api (remote backend client)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer money in the smallest currency unit
//! - [`module`] - Module actif: themes, vocabulary, allowed packagings
//! - [`conditionnement`] - Packaging kinds, labels, emojis, quantity bounds
//! - [`types`] - Product, User, Vente, Payment
//! - [`cart`] - Cart lines, totals and stock reconciliation
//! - [`checkout`] - Change calculation and vente construction
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use caisse_core::money::Money;
//! use caisse_core::checkout::compute_change;
//! use caisse_core::types::PaymentMethod;
//!
//! let total = Money::from_minor(3_750);
//! let payment = compute_change(total, PaymentMethod::Cash, Some(Money::from_minor(5_000))).unwrap();
//! assert_eq!(payment.change.minor(), 1_250);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod conditionnement;
pub mod error;
pub mod module;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, CartTotals, LineKey, StockAdjustment};
pub use conditionnement::{Conditionnement, ConditionnementKind, QuantityBounds};
pub use error::{CoreError, CoreResult, ValidationError};
pub use module::{ModuleActif, Theme, Vocabulary};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line, whatever the packaging.
///
/// Catches fat-finger entries (1000 instead of 10) on the quantity pad.
pub const MAX_LINE_QUANTITY: i64 = 999;
