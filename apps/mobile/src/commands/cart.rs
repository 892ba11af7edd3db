//! # Cart Commands
//!
//! Every command returns the whole cart so the screen re-renders from one
//! payload.
//!
//! ## Packaging Switch
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Bière 65cl × 14 Bouteilles ──► change_line_conditionnement("casier")   │
//! │                                                                         │
//! │  quantity kept if within the casier bounds, clamped otherwise           │
//! │  line re-priced at the casier price, merged if a casier line exists     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caisse_core::conditionnement::quantity_bounds as bounds_for;
use caisse_core::{
    Cart, CartLine, CartTotals, ConditionnementKind, LineKey, Money, QuantityBounds,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::product::{ensure_module, resolve_product};
use super::require_session;
use crate::error::{CommandError, CommandResult};
use crate::state::{ApiState, CartState, CatalogState, ConfigState, SessionState};

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: String,
    /// Defaults to the product's default packaging.
    #[serde(default)]
    pub conditionnement_id: Option<String>,
    /// Defaults to 1.
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// A cart line dressed for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
    pub key: LineKey,
    pub product_id: String,
    pub conditionnement_id: String,
    pub name: String,
    pub reference: String,
    pub kind: ConditionnementKind,
    pub emoji: &'static str,
    pub conditionnement_label: String,
    pub quantity: i64,
    /// e.g. "3 Casiers"
    pub quantity_label: String,
    pub min_quantity: i64,
    pub max_quantity: i64,
    pub unit_price: Money,
    pub unit_price_display: String,
    pub line_total: Money,
    pub line_total_display: String,
}

impl CartLineView {
    fn new(line: &CartLine, config: &ConfigState) -> Self {
        let bounds = line.bounds();
        let line_total = line.line_total();
        CartLineView {
            key: line.key(),
            product_id: line.product_id.clone(),
            conditionnement_id: line.conditionnement_id.clone(),
            name: line.name.clone(),
            reference: line.reference.clone(),
            kind: line.conditionnement_kind,
            emoji: line.conditionnement_kind.emoji(),
            conditionnement_label: line.conditionnement_label.clone(),
            quantity: line.quantity,
            quantity_label: line.describe_quantity(),
            min_quantity: bounds.min,
            max_quantity: bounds.max,
            unit_price: line.unit_price,
            unit_price_display: config.format_money(line.unit_price),
            line_total,
            line_total_display: config.format_money(line_total),
        }
    }
}

/// The cart as the screen shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub lines: Vec<CartLineView>,
    pub totals: CartTotals,
    pub subtotal_display: String,
    pub discount_display: String,
    pub total_display: String,
}

impl CartResponse {
    pub fn build(cart: &Cart, config: &ConfigState) -> Self {
        let totals = CartTotals::from(cart);
        CartResponse {
            lines: cart
                .lines
                .iter()
                .map(|l| CartLineView::new(l, config))
                .collect(),
            subtotal_display: config.format_money(totals.subtotal),
            discount_display: config.format_money(totals.discount),
            total_display: config.format_money(totals.total),
            totals,
        }
    }
}

/// Runs a cart mutation and renders the result.
fn mutate<F>(cart: &CartState, config: &ConfigState, f: F) -> CommandResult<CartResponse>
where
    F: FnOnce(&mut Cart) -> CommandResult<()>,
{
    cart.with_cart_mut(|c| {
        f(c)?;
        Ok(CartResponse::build(c, config))
    })
}

// =============================================================================
// Commands
// =============================================================================

pub fn get_cart(cart: &CartState, config: &ConfigState) -> CartResponse {
    debug!("get_cart command");
    cart.with_cart(|c| CartResponse::build(c, config))
}

/// Adds a product of the module actif to the cart.
///
/// ## Errors
/// - `NOT_FOUND` for an unknown product or packaging
/// - `WRONG_MODULE` when the product belongs to another module
/// - `INSUFFICIENT_STOCK` when the merged quantity exceeds stock
pub async fn add_to_cart(
    api: &ApiState,
    session: &SessionState,
    catalog: &CatalogState,
    cart: &CartState,
    config: &ConfigState,
    request: AddToCartRequest,
) -> CommandResult<CartResponse> {
    let module = require_session(session)?.module;
    debug!(
        product_id = %request.product_id,
        conditionnement_id = ?request.conditionnement_id,
        quantity = ?request.quantity,
        "add_to_cart command"
    );

    let product = resolve_product(api, catalog, &request.product_id).await?;
    ensure_module(&product, module)?;

    let conditionnement_id = match request.conditionnement_id {
        Some(id) => id,
        None => product
            .default_conditionnement()
            .map(|c| c.id.clone())
            .ok_or_else(|| {
                CommandError::cart(format!("{} n'a aucun conditionnement", product.name))
            })?,
    };
    let quantity = request.quantity.unwrap_or(1);

    let response = mutate(cart, config, |c| {
        c.add(&product, &conditionnement_id, quantity)?;
        Ok(())
    })?;

    info!(
        product_id = %product.id,
        conditionnement_id = %conditionnement_id,
        quantity,
        "Added to cart"
    );
    Ok(response)
}

/// Sets a line's quantity; 0 removes the line.
pub fn update_cart_line(
    cart: &CartState,
    config: &ConfigState,
    key: &LineKey,
    quantity: i64,
) -> CommandResult<CartResponse> {
    debug!(key = %key, quantity, "update_cart_line command");
    mutate(cart, config, |c| Ok(c.set_quantity(key, quantity)?))
}

/// `+` button. Stops at the stock bound.
pub fn increment_line(
    cart: &CartState,
    config: &ConfigState,
    key: &LineKey,
) -> CommandResult<CartResponse> {
    debug!(key = %key, "increment_line command");
    mutate(cart, config, |c| c.increment(key).map(|_| ()).map_err(Into::into))
}

/// `−` button. Stops at 1; removing a line is explicit.
pub fn decrement_line(
    cart: &CartState,
    config: &ConfigState,
    key: &LineKey,
) -> CommandResult<CartResponse> {
    debug!(key = %key, "decrement_line command");
    mutate(cart, config, |c| c.decrement(key).map(|_| ()).map_err(Into::into))
}

/// Sells the line in another packaging of the same product.
pub async fn change_line_conditionnement(
    api: &ApiState,
    catalog: &CatalogState,
    cart: &CartState,
    config: &ConfigState,
    key: &LineKey,
    conditionnement_id: &str,
) -> CommandResult<CartResponse> {
    debug!(key = %key, to = %conditionnement_id, "change_line_conditionnement command");

    if cart.with_cart(|c| c.line(key).is_none()) {
        return Err(CommandError::from(caisse_core::CoreError::LineNotInCart(
            key.to_string(),
        )));
    }
    let product = resolve_product(api, catalog, &key.product_id).await?;

    mutate(cart, config, |c| {
        c.change_conditionnement(key, &product, conditionnement_id)?;
        Ok(())
    })
}

pub fn remove_from_cart(
    cart: &CartState,
    config: &ConfigState,
    key: &LineKey,
) -> CommandResult<CartResponse> {
    debug!(key = %key, "remove_from_cart command");
    let response = mutate(cart, config, |c| c.remove(key).map(|_| ()).map_err(Into::into))?;
    info!(key = %key, "Line removed");
    Ok(response)
}

/// Whole-cart discount in basis points (`1000` = 10 %).
pub fn set_discount(
    cart: &CartState,
    config: &ConfigState,
    discount_bps: u32,
) -> CommandResult<CartResponse> {
    debug!(discount_bps, "set_discount command");
    mutate(cart, config, |c| Ok(c.set_discount_bps(discount_bps)?))
}

pub fn clear_cart(cart: &CartState, config: &ConfigState) -> CartResponse {
    debug!("clear_cart command");
    cart.with_cart_mut(|c| {
        c.clear();
        CartResponse::build(c, config)
    })
}

/// Quantity range the picker offers for a packaging.
pub async fn quantity_bounds(
    api: &ApiState,
    catalog: &CatalogState,
    product_id: &str,
    conditionnement_id: &str,
) -> CommandResult<QuantityBounds> {
    let product = resolve_product(api, catalog, product_id).await?;
    let conditionnement = product
        .conditionnement(conditionnement_id)
        .ok_or_else(|| CommandError::not_found("Conditionnement", conditionnement_id))?;
    Ok(bounds_for(&product, conditionnement))
}
