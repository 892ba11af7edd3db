//! # Cart
//!
//! The cashier's current cart. Lines are keyed by product *and* packaging:
//! two bottles and one crate of the same beer are two lines.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Screen Action            Operation                 Line Change         │
//! │  ─────────────            ─────────                 ───────────         │
//! │                                                                         │
//! │  Tap product ───────────► add() ──────────────────► push / merge qty    │
//! │  Type quantity ─────────► set_quantity() ─────────► qty = n (0 removes) │
//! │  [+] / [-] ─────────────► increment()/decrement() ► qty ± 1, clamped    │
//! │  Pick packaging ────────► change_conditionnement() ► re-price, clamp    │
//! │  Swipe line ────────────► remove() ───────────────► line dropped        │
//! │  Catalogue refresh ─────► reconcile_stock() ──────► clamp / drop lines  │
//! │  Pay ───────────────────► validate_for_checkout()                       │
//! │  Vente recorded ────────► remove_sold() ──────────► sold qty taken out  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - At most one line per `(product_id, conditionnement_id)`
//! - Every line has `1 <= quantity <= max_quantity`
//! - At most [`MAX_CART_LINES`](crate::MAX_CART_LINES) lines
//! - The unit price is frozen when the line is created

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::conditionnement::{quantity_bounds, Conditionnement, ConditionnementKind, QuantityBounds};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::validation::{validate_cart_size, validate_discount_bps, validate_price, validate_quantity};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Line Key
// =============================================================================

/// Identifies a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LineKey {
    pub product_id: String,
    pub conditionnement_id: String,
}

impl LineKey {
    pub fn new(product_id: impl Into<String>, conditionnement_id: impl Into<String>) -> Self {
        LineKey {
            product_id: product_id.into(),
            conditionnement_id: conditionnement_id.into(),
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.product_id, self.conditionnement_id)
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A line of the cart.
///
/// ## Design Notes
/// Product and packaging data are copied when the line is created so the
/// cart keeps showing the same name and price even if the catalogue is
/// refreshed in between. `max_quantity` is the upper quantity bound known
/// at the last add or reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub conditionnement_id: String,
    pub reference: String,
    pub name: String,
    pub conditionnement_kind: ConditionnementKind,
    pub conditionnement_label: String,
    /// Price of one packaging, frozen when added.
    pub unit_price: Money,
    pub quantity: i64,
    pub max_quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn new(product: &Product, conditionnement: &Conditionnement, quantity: i64, max: i64) -> Self {
        CartLine {
            product_id: product.id.clone(),
            conditionnement_id: conditionnement.id.clone(),
            reference: product.reference.clone(),
            name: product.name.clone(),
            conditionnement_kind: conditionnement.kind,
            conditionnement_label: conditionnement.display_label().to_string(),
            unit_price: conditionnement.price,
            quantity,
            max_quantity: max,
            added_at: Utc::now(),
        }
    }

    pub fn key(&self) -> LineKey {
        LineKey::new(self.product_id.clone(), self.conditionnement_id.clone())
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.conditionnement_id == key.conditionnement_id
    }

    /// unit_price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply_quantity(self.quantity)
    }

    pub fn bounds(&self) -> QuantityBounds {
        QuantityBounds {
            min: 1,
            max: self.max_quantity,
        }
    }

    /// "3 Cartons".
    pub fn describe_quantity(&self) -> String {
        self.conditionnement_kind.describe(self.quantity)
    }
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Why reconciliation dropped a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RemovalReason {
    ProductMissing,
    ProductInactive,
    ConditionnementMissing,
    OutOfStock,
}

/// A change made to the cart by [`Cart::reconcile_stock`], shown to the cashier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum StockAdjustment {
    Removed {
        key: LineKey,
        name: String,
        reason: RemovalReason,
    },
    Clamped {
        key: LineKey,
        name: String,
        from: i64,
        to: i64,
    },
    /// The line keeps its frozen price.
    PriceChanged {
        key: LineKey,
        name: String,
        frozen: Money,
        current: Money,
    },
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    /// Whole-cart discount in basis points.
    pub discount_bps: u32,
    /// When the cart was created or last cleared.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            discount_bps: 0,
            created_at: Utc::now(),
        }
    }

    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.matches(key))
    }

    fn line_mut(&mut self, key: &LineKey) -> CoreResult<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|l| l.matches(key))
            .ok_or_else(|| CoreError::LineNotInCart(key.to_string()))
    }

    /// Adds `qty` packagings of `product`, merging with an existing line.
    ///
    /// ## Errors
    /// - quantity outside `1..=MAX_LINE_QUANTITY` (merged total included)
    /// - inactive product, unknown packaging, negative packaging price
    /// - merged quantity above the packaging's stock
    /// - a new line when the cart already has `MAX_CART_LINES` lines
    pub fn add(
        &mut self,
        product: &Product,
        conditionnement_id: &str,
        qty: i64,
    ) -> CoreResult<LineKey> {
        validate_quantity(qty)?;

        if !product.is_active {
            return Err(CoreError::ProductInactive(product.name.clone()));
        }

        let conditionnement =
            product
                .conditionnement(conditionnement_id)
                .ok_or_else(|| CoreError::ConditionnementNotFound {
                    product_id: product.id.clone(),
                    conditionnement_id: conditionnement_id.to_string(),
                })?;
        validate_price(conditionnement.price.minor())?;

        let bounds = quantity_bounds(product, conditionnement);
        let key = LineKey::new(product.id.clone(), conditionnement.id.clone());
        let existing = self.line(&key).map_or(0, |l| l.quantity);
        let requested = existing + qty;

        check_against_bounds(product, conditionnement, bounds, requested)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.matches(&key)) {
            line.quantity = requested;
            line.max_quantity = bounds.max;
            return Ok(key);
        }

        validate_cart_size(self.lines.len()).map_err(|_| CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        })?;

        self.lines
            .push(CartLine::new(product, conditionnement, requested, bounds.max));
        Ok(key)
    }

    /// Sets the quantity of a line. `0` removes the line.
    pub fn set_quantity(&mut self, key: &LineKey, qty: i64) -> CoreResult<()> {
        if qty == 0 {
            return self.remove(key).map(|_| ());
        }
        validate_quantity(qty)?;

        let line = self.line_mut(key)?;
        if qty > line.max_quantity {
            return Err(CoreError::InsufficientStock {
                product: line.name.clone(),
                conditionnement: line.conditionnement_label.clone(),
                available: line.max_quantity,
                requested: qty,
            });
        }
        line.quantity = qty;
        Ok(())
    }

    /// Adds one packaging, stopping at the upper bound. Returns the new quantity.
    pub fn increment(&mut self, key: &LineKey) -> CoreResult<i64> {
        let line = self.line_mut(key)?;
        line.quantity = (line.quantity + 1).min(line.max_quantity.max(line.quantity));
        Ok(line.quantity)
    }

    /// Removes one packaging, stopping at 1. Returns the new quantity.
    pub fn decrement(&mut self, key: &LineKey) -> CoreResult<i64> {
        let line = self.line_mut(key)?;
        line.quantity = (line.quantity - 1).max(1);
        Ok(line.quantity)
    }

    /// Switches a line to another packaging of the same product.
    ///
    /// The line is re-priced at the new packaging's current price and its
    /// quantity clamped to the new stock. If the cart already holds the
    /// target packaging, both lines are merged.
    ///
    /// ## User Workflow
    /// ```text
    /// 30 Bouteilles (stock 40)  ──► switch to Casier (stock 2)
    ///      │
    ///      ▼
    /// 2 Casiers, priced per Casier
    /// ```
    pub fn change_conditionnement(
        &mut self,
        key: &LineKey,
        product: &Product,
        new_conditionnement_id: &str,
    ) -> CoreResult<LineKey> {
        if product.id != key.product_id {
            return Err(CoreError::ProductNotFound(key.product_id.clone()));
        }
        let current_qty = self
            .line(key)
            .map(|l| l.quantity)
            .ok_or_else(|| CoreError::LineNotInCart(key.to_string()))?;

        if key.conditionnement_id == new_conditionnement_id {
            return Ok(key.clone());
        }

        let conditionnement = product
            .conditionnement(new_conditionnement_id)
            .ok_or_else(|| CoreError::ConditionnementNotFound {
                product_id: product.id.clone(),
                conditionnement_id: new_conditionnement_id.to_string(),
            })?;
        validate_price(conditionnement.price.minor())?;

        let bounds = quantity_bounds(product, conditionnement);
        if bounds.is_empty() {
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                conditionnement: conditionnement.display_label().to_string(),
                available: 0,
                requested: current_qty,
            });
        }

        let new_key = LineKey::new(product.id.clone(), conditionnement.id.clone());

        if let Some(target) = self.lines.iter_mut().find(|l| l.matches(&new_key)) {
            target.quantity = bounds.clamp(target.quantity + current_qty);
            target.max_quantity = bounds.max;
            self.lines.retain(|l| !l.matches(key));
            return Ok(new_key);
        }

        let line = self.line_mut(key)?;
        line.conditionnement_id = conditionnement.id.clone();
        line.conditionnement_kind = conditionnement.kind;
        line.conditionnement_label = conditionnement.display_label().to_string();
        line.unit_price = conditionnement.price;
        line.quantity = bounds.clamp(current_qty);
        line.max_quantity = bounds.max;
        Ok(new_key)
    }

    /// Removes a line and returns it.
    pub fn remove(&mut self, key: &LineKey) -> CoreResult<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.matches(key))
            .ok_or_else(|| CoreError::LineNotInCart(key.to_string()))?;
        Ok(self.lines.remove(index))
    }

    /// Empties the cart and resets the discount.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount_bps = 0;
        self.created_at = Utc::now();
    }

    /// Takes the lines of `sold`, an earlier copy of this cart that was rung
    /// up, out of the cart.
    ///
    /// Quantities added since the copy stay, so do lines the copy did not
    /// have. The sold discount goes with the sale.
    pub fn remove_sold(&mut self, sold: &Cart) {
        for sold_line in &sold.lines {
            let key = sold_line.key();
            if let Some(line) = self.lines.iter_mut().find(|l| l.matches(&key)) {
                line.quantity -= sold_line.quantity;
            }
        }
        self.lines.retain(|l| l.quantity > 0);

        if self.lines.is_empty() {
            self.clear();
        } else if self.discount_bps == sold.discount_bps {
            self.discount_bps = 0;
        }
    }

    pub fn set_discount_bps(&mut self, bps: u32) -> CoreResult<()> {
        validate_discount_bps(bps)?;
        self.discount_bps = bps;
        Ok(())
    }

    // =========================================================================
    // Totals
    // =========================================================================

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(|l| l.line_total()).sum()
    }

    pub fn discount(&self) -> Money {
        self.subtotal().percentage_of(self.discount_bps)
    }

    /// Amount due: subtotal minus discount.
    pub fn total(&self) -> Money {
        self.subtotal() - self.discount()
    }

    // =========================================================================
    // Stock Reconciliation
    // =========================================================================

    /// Reconciles the cart against fresh catalogue data.
    ///
    /// ## Rules
    /// ```text
    /// product missing / inactive        → line removed
    /// packaging missing / out of stock  → line removed
    /// quantity above stock              → clamped down to stock
    /// price changed                     → reported, frozen price kept
    /// ```
    pub fn reconcile_stock(&mut self, products: &[Product]) -> Vec<StockAdjustment> {
        let by_id: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();
        let mut adjustments = Vec::new();

        self.lines.retain_mut(|line| {
            let key = line.key();
            let removed = |reason| StockAdjustment::Removed {
                key: key.clone(),
                name: line.name.clone(),
                reason,
            };

            let Some(product) = by_id.get(line.product_id.as_str()) else {
                adjustments.push(removed(RemovalReason::ProductMissing));
                return false;
            };
            if !product.is_active {
                adjustments.push(removed(RemovalReason::ProductInactive));
                return false;
            }
            let Some(conditionnement) = product.conditionnement(&line.conditionnement_id) else {
                adjustments.push(removed(RemovalReason::ConditionnementMissing));
                return false;
            };

            let bounds = quantity_bounds(product, conditionnement);
            if bounds.is_empty() {
                adjustments.push(removed(RemovalReason::OutOfStock));
                return false;
            }

            if line.quantity > bounds.max {
                adjustments.push(StockAdjustment::Clamped {
                    key: key.clone(),
                    name: line.name.clone(),
                    from: line.quantity,
                    to: bounds.max,
                });
                line.quantity = bounds.max;
            }
            line.max_quantity = bounds.max;

            if conditionnement.price != line.unit_price {
                adjustments.push(StockAdjustment::PriceChanged {
                    key: key.clone(),
                    name: line.name.clone(),
                    frozen: line.unit_price,
                    current: conditionnement.price,
                });
            }
            true
        });

        adjustments
    }

    /// Checks the cart can be paid: not empty and every line within stock.
    pub fn validate_for_checkout(&self, products: &[Product]) -> CoreResult<()> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        for line in &self.lines {
            let product = products
                .iter()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.clone()))?;
            if !product.is_active {
                return Err(CoreError::ProductInactive(product.name.clone()));
            }
            let conditionnement = product
                .conditionnement(&line.conditionnement_id)
                .ok_or_else(|| CoreError::ConditionnementNotFound {
                    product_id: product.id.clone(),
                    conditionnement_id: line.conditionnement_id.clone(),
                })?;
            let bounds = quantity_bounds(product, conditionnement);
            check_against_bounds(product, conditionnement, bounds, line.quantity)?;
        }

        Ok(())
    }
}

/// Maps an out-of-range quantity to the matching error.
fn check_against_bounds(
    product: &Product,
    conditionnement: &Conditionnement,
    bounds: QuantityBounds,
    requested: i64,
) -> CoreResult<()> {
    if requested > MAX_LINE_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested,
            max: MAX_LINE_QUANTITY,
        });
    }
    if requested > bounds.max {
        return Err(CoreError::InsufficientStock {
            product: product.name.clone(),
            conditionnement: conditionnement.display_label().to_string(),
            available: bounds.max,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Cart Totals
// =============================================================================

/// Cart totals summary for the screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal: Money,
    pub discount_bps: u32,
    pub discount: Money,
    pub total: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            subtotal: cart.subtotal(),
            discount_bps: cart.discount_bps,
            discount: cart.discount(),
            total: cart.total(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
