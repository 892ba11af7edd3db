//! # Domain Types
//!
//! Records exchanged with the remote backend. The client never owns them:
//! products and users are read from the backend, ventes are built locally
//! and handed over for persistence.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Vente      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id (UUID)      │   │  method         │       │
//! │  │  reference      │   │  receipt_number │   │  amount         │       │
//! │  │  module         │   │  status         │   │  tendered       │       │
//! │  │  conditionnemts │   │  lines (snap)   │   │  change         │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │   VenteStatus   │   │ PaymentMethod   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  role           │   │  Pending        │   │  Cash           │       │
//! │  │  modules        │   │  Recorded       │   │  MobileMoney    │       │
//! │  └─────────────────┘   │  Voided         │   │  Card           │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::conditionnement::{Conditionnement, ConditionnementKind};
use crate::error::ValidationError;
use crate::module::ModuleActif;
use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product of the catalogue, with every packaging it is sold in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Backend identifier.
    pub id: String,

    /// Internal reference (business identifier).
    pub reference: String,

    /// Product-level barcode. Packagings may carry their own.
    #[serde(default)]
    pub barcode: Option<String>,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    #[serde(default)]
    pub category: Option<String>,

    /// Vertical this product belongs to.
    #[serde(default)]
    pub module: ModuleActif,

    /// Packagings this product is sold in.
    #[serde(default)]
    pub conditionnements: Vec<Conditionnement>,

    /// Whether the backend counts stock for this product.
    #[serde(default = "default_true")]
    pub track_stock: bool,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Finds a packaging by id.
    pub fn conditionnement(&self, id: &str) -> Option<&Conditionnement> {
        self.conditionnements.iter().find(|c| c.id == id)
    }

    /// Packaging preselected when the product is tapped.
    ///
    /// ## Resolution Order
    /// 1. The packaging flagged `is_default` by the backend
    /// 2. The first packaging of the module's default kind
    /// 3. The first packaging
    pub fn default_conditionnement(&self) -> Option<&Conditionnement> {
        let module_kind = self.module.default_conditionnement();
        self.conditionnements
            .iter()
            .find(|c| c.is_default)
            .or_else(|| self.conditionnements.iter().find(|c| c.kind == module_kind))
            .or_else(|| self.conditionnements.first())
    }

    /// Finds the packaging scanned with `code`.
    ///
    /// A packaging barcode wins; the product barcode selects the default
    /// packaging.
    pub fn find_by_barcode(&self, code: &str) -> Option<&Conditionnement> {
        let code = code.trim();
        if code.is_empty() {
            return None;
        }
        if let Some(c) = self
            .conditionnements
            .iter()
            .find(|c| c.barcode.as_deref() == Some(code))
        {
            return Some(c);
        }
        if self.barcode.as_deref() == Some(code) {
            return self.default_conditionnement();
        }
        None
    }

    /// Whether stock limits apply to this product.
    pub fn tracks_stock(&self) -> bool {
        self.track_stock && self.module.tracks_stock()
    }

    /// Whether at least one packaging can be sold.
    pub fn in_stock(&self) -> bool {
        if !self.is_active {
            return false;
        }
        if !self.tracks_stock() {
            return !self.conditionnements.is_empty();
        }
        self.conditionnements
            .iter()
            .any(|c| c.available().map_or(true, |s| s > 0))
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
}

/// A logged-in user as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: Role,

    /// Modules this user may run. Empty means every module.
    #[serde(default)]
    pub modules: Vec<ModuleActif>,
}

impl User {
    /// Whether this user may run the terminal as `module`.
    pub fn can_use(&self, module: ModuleActif) -> bool {
        self.role == Role::Admin || self.modules.is_empty() || self.modules.contains(&module)
    }

    /// Name printed on receipts.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Notes and coins, change is given back.
    Cash,
    /// Orange Money, Wave, MTN MoMo... exact amount.
    MobileMoney,
    /// Card on an external terminal, exact amount.
    Card,
}

impl PaymentMethod {
    pub const fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Espèces",
            PaymentMethod::MobileMoney => "Mobile Money",
            PaymentMethod::Card => "Carte",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "especes" | "espèces" => Ok(PaymentMethod::Cash),
            "mobile_money" | "mobile-money" | "momo" | "mobile" => Ok(PaymentMethod::MobileMoney),
            "card" | "carte" => Ok(PaymentMethod::Card),
            _ => Err(ValidationError::NotAllowed {
                field: "payment method".to_string(),
                allowed: vec![
                    "cash".to_string(),
                    "mobile_money".to_string(),
                    "card".to_string(),
                ],
            }),
        }
    }
}

/// How a vente was paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub method: PaymentMethod,
    /// Amount due, equal to the vente total.
    pub amount: Money,
    /// Amount handed over by the customer.
    pub tendered: Money,
    /// Change given back (cash only).
    pub change: Money,
    /// Mobile money transaction id or card authorization code.
    #[serde(default)]
    pub reference: Option<String>,
}

// =============================================================================
// Vente
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum VenteStatus {
    /// Built locally, not yet acknowledged by the backend.
    #[default]
    Pending,
    /// Persisted by the backend.
    Recorded,
    /// Cancelled on the backend.
    Voided,
}

/// A line of a vente.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LigneVente {
    pub product_id: String,
    pub conditionnement_id: String,
    /// Reference at time of sale (frozen).
    pub reference: String,
    /// Product name at time of sale (frozen).
    pub name: String,
    pub conditionnement_kind: ConditionnementKind,
    /// Packaging label at time of sale (frozen).
    pub conditionnement_label: String,
    /// Price of one packaging at time of sale (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    /// unit_price × quantity.
    pub line_total: Money,
}

/// A sale transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Vente {
    /// UUID v4, also the idempotency key when recording.
    pub id: String,
    pub receipt_number: String,
    pub module: ModuleActif,
    #[serde(default)]
    pub status: VenteStatus,
    pub lines: Vec<LigneVente>,
    pub subtotal: Money,
    #[serde(default)]
    pub discount_bps: u32,
    #[serde(default)]
    pub discount: Money,
    pub total: Money,
    pub payment: Payment,
    pub cashier_id: String,
    pub device_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Vente {
    /// Sum of quantities over all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Daily Summary
// =============================================================================

/// Takings for one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub count: i64,
    pub amount: Money,
}

/// End-of-day figures computed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailySummary {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sale_count: i64,
    pub revenue: Money,
    #[serde(default)]
    pub by_method: Vec<MethodTotal>,
}

// =============================================================================
// Unit Tests
// =============================================================================
