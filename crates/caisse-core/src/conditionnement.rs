//! # Conditionnement
//!
//! A product is sold through one or more packagings ("conditionnements"):
//! a bottle, a crate of 24, a pallet of 60 crates. Each packaging carries its
//! own price and its own stock count as reported by the backend.
//!
//! ## Quantity Bounds
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Quantity stepper on the cart line                                      │
//! │                                                                         │
//! │     [ - ]   3   [ + ]        Carton (stock: 4)                          │
//! │                                                                         │
//! │  min = 1                                                               │
//! │  max = min(stock, MAX_LINE_QUANTITY)   if the product tracks stock     │
//! │        MAX_LINE_QUANTITY               otherwise                       │
//! │                                                                         │
//! │  stock 0  →  empty range (min 1 > max 0): the packaging is greyed out  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::Product;
use crate::MAX_LINE_QUANTITY;

// =============================================================================
// Conditionnement Kind
// =============================================================================

/// The kind of packaging. Unknown values from the backend become `Autre`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ConditionnementKind {
    Unite,
    Plaquette,
    Boite,
    Flacon,
    Bouteille,
    Casier,
    Pack,
    Carton,
    Sac,
    Palette,
    Portion,
    #[serde(other)]
    Autre,
}

impl ConditionnementKind {
    /// Singular label shown on buttons.
    pub const fn label(&self) -> &'static str {
        match self {
            ConditionnementKind::Unite => "Unité",
            ConditionnementKind::Plaquette => "Plaquette",
            ConditionnementKind::Boite => "Boîte",
            ConditionnementKind::Flacon => "Flacon",
            ConditionnementKind::Bouteille => "Bouteille",
            ConditionnementKind::Casier => "Casier",
            ConditionnementKind::Pack => "Pack",
            ConditionnementKind::Carton => "Carton",
            ConditionnementKind::Sac => "Sac",
            ConditionnementKind::Palette => "Palette",
            ConditionnementKind::Portion => "Portion",
            ConditionnementKind::Autre => "Autre",
        }
    }

    pub const fn plural_label(&self) -> &'static str {
        match self {
            ConditionnementKind::Unite => "Unités",
            ConditionnementKind::Plaquette => "Plaquettes",
            ConditionnementKind::Boite => "Boîtes",
            ConditionnementKind::Flacon => "Flacons",
            ConditionnementKind::Bouteille => "Bouteilles",
            ConditionnementKind::Casier => "Casiers",
            ConditionnementKind::Pack => "Packs",
            ConditionnementKind::Carton => "Cartons",
            ConditionnementKind::Sac => "Sacs",
            ConditionnementKind::Palette => "Palettes",
            ConditionnementKind::Portion => "Portions",
            ConditionnementKind::Autre => "Autres",
        }
    }

    pub const fn emoji(&self) -> &'static str {
        match self {
            ConditionnementKind::Unite => "🔹",
            ConditionnementKind::Plaquette => "💊",
            ConditionnementKind::Boite => "🗃️",
            ConditionnementKind::Flacon => "🧴",
            ConditionnementKind::Bouteille => "🍾",
            ConditionnementKind::Casier => "🍻",
            ConditionnementKind::Pack => "🧃",
            ConditionnementKind::Carton => "📦",
            ConditionnementKind::Sac => "🛍️",
            ConditionnementKind::Palette => "🪵",
            ConditionnementKind::Portion => "🍽️",
            ConditionnementKind::Autre => "❔",
        }
    }

    /// Quantity with the right grammatical number: "1 Carton", "3 Cartons".
    pub fn describe(&self, qty: i64) -> String {
        let label = if qty.abs() > 1 {
            self.plural_label()
        } else {
            self.label()
        };
        format!("{} {}", qty, label)
    }
}

// =============================================================================
// Conditionnement
// =============================================================================

/// A sellable packaging of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Conditionnement {
    /// Backend identifier of this packaging.
    pub id: String,

    pub kind: ConditionnementKind,

    /// Custom label ("Casier de 24"), falls back to the kind label.
    #[serde(default)]
    pub label: Option<String>,

    /// Price of one packaging, in minor units.
    pub price: Money,

    /// Stock of this packaging. `None` when the backend does not count it.
    #[serde(default)]
    pub stock: Option<i64>,

    /// Base units inside one packaging (24 bottles per crate).
    #[serde(default = "default_units_per_pack")]
    pub units_per_pack: i64,

    #[serde(default)]
    pub barcode: Option<String>,

    /// Preselected packaging for this product.
    #[serde(default)]
    pub is_default: bool,
}

fn default_units_per_pack() -> i64 {
    1
}

impl Conditionnement {
    /// Label for buttons and receipts.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.kind.label())
    }

    /// Price of one base unit inside this packaging, rounded down.
    ///
    /// Lets the cashier compare "1 200 per bottle" against "26 400 per crate".
    pub fn unit_price(&self) -> Money {
        if self.units_per_pack <= 1 {
            return self.price;
        }
        Money::from_minor(self.price.minor() / self.units_per_pack)
    }

    /// Stock that can be sold, negative counts read as zero.
    pub fn available(&self) -> Option<i64> {
        self.stock.map(|s| s.max(0))
    }
}

// =============================================================================
// Quantity Bounds
// =============================================================================

/// Inclusive quantity range for a packaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct QuantityBounds {
    pub min: i64,
    pub max: i64,
}

impl QuantityBounds {
    /// True when nothing can be sold (out of stock).
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }

    pub fn contains(&self, qty: i64) -> bool {
        qty >= self.min && qty <= self.max
    }

    /// Clamps `qty` into the range. An empty range clamps to 0.
    ///
    /// ## Example
    /// ```rust
    /// use caisse_core::conditionnement::QuantityBounds;
    ///
    /// let bounds = QuantityBounds { min: 1, max: 4 };
    /// assert_eq!(bounds.clamp(7), 4);
    /// assert_eq!(bounds.clamp(0), 1);
    /// assert_eq!(QuantityBounds { min: 1, max: 0 }.clamp(3), 0);
    /// ```
    pub fn clamp(&self, qty: i64) -> i64 {
        if self.is_empty() {
            return 0;
        }
        qty.clamp(self.min, self.max)
    }
}

/// Quantity range for selling `conditionnement` of `product`.
pub fn quantity_bounds(product: &Product, conditionnement: &Conditionnement) -> QuantityBounds {
    let max = match (product.tracks_stock(), conditionnement.available()) {
        (true, Some(stock)) => stock.min(MAX_LINE_QUANTITY),
        _ => MAX_LINE_QUANTITY,
    };
    QuantityBounds { min: 1, max }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleActif;
    use chrono::Utc;

    fn carton(stock: Option<i64>) -> Conditionnement {
        Conditionnement {
            id: "c-carton".to_string(),
            kind: ConditionnementKind::Carton,
            label: None,
            price: Money::from_minor(26_400),
            stock,
            units_per_pack: 24,
            barcode: None,
            is_default: false,
        }
    }

    fn product(module: ModuleActif, track_stock: bool, conds: Vec<Conditionnement>) -> Product {
        Product {
            id: "p-1".to_string(),
            reference: "EAU-150".to_string(),
            barcode: None,
            name: "Eau minérale 1.5L".to_string(),
            category: None,
            module,
            conditionnements: conds,
            track_stock,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_labels_and_emojis() {
        assert_eq!(ConditionnementKind::Boite.label(), "Boîte");
        assert_eq!(ConditionnementKind::Carton.emoji(), "📦");
        assert_eq!(ConditionnementKind::Carton.describe(1), "1 Carton");
        assert_eq!(ConditionnementKind::Carton.describe(3), "3 Cartons");
        assert_eq!(ConditionnementKind::Unite.describe(2), "2 Unités");
    }

    #[test]
    fn test_unknown_kind_deserializes_as_autre() {
        let kind: ConditionnementKind = serde_json::from_str("\"fut\"").unwrap();
        assert_eq!(kind, ConditionnementKind::Autre);
        let kind: ConditionnementKind = serde_json::from_str("\"casier\"").unwrap();
        assert_eq!(kind, ConditionnementKind::Casier);
    }

    #[test]
    fn test_display_label_and_unit_price() {
        let mut c = carton(Some(4));
        assert_eq!(c.display_label(), "Carton");
        c.label = Some("Carton de 24".to_string());
        assert_eq!(c.display_label(), "Carton de 24");
        assert_eq!(c.unit_price().minor(), 1_100);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"id":"c1","kind":"unite","price":500}"#;
        let c: Conditionnement = serde_json::from_str(json).unwrap();
        assert_eq!(c.units_per_pack, 1);
        assert_eq!(c.stock, None);
        assert!(!c.is_default);
    }

    #[test]
    fn test_bounds_follow_stock() {
        let p = product(ModuleActif::Depot, true, vec![carton(Some(4))]);
        let bounds = quantity_bounds(&p, &p.conditionnements[0]);
        assert_eq!(bounds, QuantityBounds { min: 1, max: 4 });
        assert!(bounds.contains(4));
        assert!(!bounds.contains(5));
    }

    #[test]
    fn test_bounds_capped_by_max_line_quantity() {
        let p = product(ModuleActif::Depot, true, vec![carton(Some(50_000))]);
        let bounds = quantity_bounds(&p, &p.conditionnements[0]);
        assert_eq!(bounds.max, MAX_LINE_QUANTITY);
    }

    #[test]
    fn test_out_of_stock_is_empty_range() {
        let p = product(ModuleActif::Depot, true, vec![carton(Some(-2))]);
        let bounds = quantity_bounds(&p, &p.conditionnements[0]);
        assert!(bounds.is_empty());
        assert_eq!(bounds.clamp(5), 0);
    }

    #[test]
    fn test_untracked_stock_uses_max_line_quantity() {
        let p = product(ModuleActif::Depot, false, vec![carton(Some(0))]);
        assert_eq!(quantity_bounds(&p, &p.conditionnements[0]).max, MAX_LINE_QUANTITY);

        let p = product(ModuleActif::Restaurant, true, vec![carton(Some(0))]);
        assert_eq!(quantity_bounds(&p, &p.conditionnements[0]).max, MAX_LINE_QUANTITY);

        let p = product(ModuleActif::Depot, true, vec![carton(None)]);
        assert_eq!(quantity_bounds(&p, &p.conditionnements[0]).max, MAX_LINE_QUANTITY);
    }
}
