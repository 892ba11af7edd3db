//! # Cart State
//!
//! Holds the cart being rung up. The cart logic itself is
//! [`caisse_core::Cart`]; this file only guards it.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>` because:
//! 1. Multiple commands may access/modify the cart
//! 2. Only one command should modify the cart at a time
//! 3. Commands can run concurrently
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  Screen Action            Command                    Cart Change        │
//! │  ─────────────            ───────                    ───────────        │
//! │                                                                         │
//! │  Tap product ────────────► add_to_cart() ──────────► line added/merged │
//! │                                                                         │
//! │  + / − buttons ──────────► increment/decrement ────► qty ±1, clamped   │
//! │                                                                         │
//! │  Pick Casier ────────────► change_line_cond...() ──► line re-priced    │
//! │                                                                         │
//! │  Swipe line ─────────────► remove_from_cart() ─────► line removed      │
//! │                                                                         │
//! │  Catalogue refresh ──────► refresh_catalog() ──────► reconciled        │
//! │                                                                         │
//! │  NOTE: All operations hold the lock only for the pure cart call,       │
//! │        never across a backend request.                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::{Arc, Mutex};

use caisse_core::Cart;

/// Thread-safe cart state.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|cart| CartTotals::from(cart));
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(|e| e.into_inner());
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|cart| cart.add(&product, "casier", 2))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut cart)
    }

    /// Product ids of the cart lines, without duplicates.
    pub fn product_ids(&self) -> Vec<String> {
        self.with_cart(|cart| {
            let mut ids: Vec<String> = cart.lines.iter().map(|l| l.product_id.clone()).collect();
            ids.sort();
            ids.dedup();
            ids
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_core::{Conditionnement, ConditionnementKind, ModuleActif, Money, Product};
    use chrono::Utc;

    fn product(id: &str) -> Product {
        Product {
            id: id.to_string(),
            reference: id.to_uppercase(),
            barcode: None,
            name: id.to_string(),
            category: None,
            module: ModuleActif::Boutique,
            conditionnements: vec![Conditionnement {
                id: "u".to_string(),
                kind: ConditionnementKind::Unite,
                label: None,
                price: Money::from_minor(500),
                stock: Some(10),
                units_per_pack: 1,
                barcode: None,
                is_default: true,
            }],
            track_stock: true,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_clones_share_the_cart() {
        let state = CartState::new();
        let shell_handle = state.clone();

        state
            .with_cart_mut(|cart| cart.add(&product("savon"), "u", 2))
            .unwrap();
        assert_eq!(shell_handle.with_cart(|c| c.total_quantity()), 2);
    }

    #[test]
    fn test_product_ids_are_unique() {
        let state = CartState::new();
        state.with_cart_mut(|cart| {
            cart.add(&product("b"), "u", 1).unwrap();
            cart.add(&product("a"), "u", 1).unwrap();
        });
        assert_eq!(state.product_ids(), vec!["a", "b"]);
    }
}
