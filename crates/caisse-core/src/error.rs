//! # Error Types
//!
//! Domain-specific error types for caisse-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caisse-core errors (this file)                                        │
//! │  ├── CoreError        - Cart / checkout rule violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caisse-api errors (separate crate)                                    │
//! │  └── ClientError      - Backend call failures                          │
//! │                                                                         │
//! │  App errors                                                            │
//! │  └── CommandError     - What the screen sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                  │
//! │                          ClientError ┴→ CommandError → Screen          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Cart and checkout rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// The requested packaging does not exist on the product.
    #[error("Conditionnement {conditionnement_id} not found for product {product_id}")]
    ConditionnementNotFound {
        product_id: String,
        conditionnement_id: String,
    },

    #[error("Product {0} is not available for sale")]
    ProductInactive(String),

    /// Not enough stock in the selected packaging.
    ///
    /// ## User Workflow
    /// ```text
    /// Add 5 Cartons of "Eau minérale"
    ///      │
    ///      ▼
    /// Carton stock: 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Eau minérale", conditionnement: "Carton", available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product} ({conditionnement}): available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        conditionnement: String,
        available: i64,
        requested: i64,
    },

    #[error("Line {0} is not in the cart")]
    LineNotInCart(String),

    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    #[error("Cart is empty")]
    EmptyCart,

    /// Cash handed over does not cover the total.
    #[error("Insufficient payment: total {total}, tendered {tendered}")]
    InsufficientPayment { total: Money, tendered: Money },

    /// The logged-in user has no access to this module.
    #[error("Module {0} is not enabled for this user")]
    ModuleNotAllowed(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
