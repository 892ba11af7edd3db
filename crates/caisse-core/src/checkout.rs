//! # Checkout
//!
//! Turns a cart into a [`Vente`]: change calculation, quick cash buttons and
//! the vente record handed to the backend.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cart total: 3 750                                                      │
//! │                                                                         │
//! │  suggested_tenders(.., FCFA) → [3 750] [4 000] [5 000] [10 000]         │
//! │                                                                         │
//! │  Cashier taps 5 000                                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  compute_change(3 750, Cash, 5 000) → Payment { change: 1 250 }        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  build_vente(cart, payment, ctx) → Vente { status: Pending, ... }      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  POST /api/ventes (caisse-api)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::module::ModuleActif;
use crate::money::Money;
use crate::types::{LigneVente, Payment, PaymentMethod, Vente, VenteStatus};

/// FCFA notes, for currencies without decimals.
pub const CASH_DENOMINATIONS: [i64; 5] = [500, 1_000, 2_000, 5_000, 10_000];

/// Notes of decimal currencies (EUR, USD), in major units.
pub const DECIMAL_NOTE_DENOMINATIONS: [i64; 5] = [5, 10, 20, 50, 100];

/// Note denominations in minor units of a currency with `decimals` digits
/// after the point.
///
/// ```rust
/// use caisse_core::checkout::cash_denominations;
///
/// assert_eq!(cash_denominations(0), [500, 1_000, 2_000, 5_000, 10_000]);
/// assert_eq!(cash_denominations(2), [500, 1_000, 2_000, 5_000, 10_000]);
/// assert_eq!(cash_denominations(3), [5_000, 10_000, 20_000, 50_000, 100_000]);
/// ```
pub fn cash_denominations(decimals: u8) -> [i64; 5] {
    if decimals == 0 {
        return CASH_DENOMINATIONS;
    }
    let scale = 10_i64.pow(u32::from(decimals));
    DECIMAL_NOTE_DENOMINATIONS.map(|d| d * scale)
}

/// Maximum number of quick cash buttons.
pub const MAX_SUGGESTED_TENDERS: usize = 5;

// =============================================================================
// Change Calculation
// =============================================================================

/// Computes the payment for `total`.
///
/// ## Rules
/// - Cash: `tendered` must cover `total`, change is the difference.
///   No tendered amount means the exact amount was given.
/// - Mobile money and card: always exact, change is zero.
///
/// ## Example
/// ```rust
/// use caisse_core::checkout::compute_change;
/// use caisse_core::money::Money;
/// use caisse_core::types::PaymentMethod;
///
/// let total = Money::from_minor(3_750);
/// let payment = compute_change(total, PaymentMethod::Cash, Some(Money::from_minor(2_000)));
/// assert!(payment.is_err());
///
/// let payment = compute_change(total, PaymentMethod::MobileMoney, None).unwrap();
/// assert!(payment.change.is_zero());
/// ```
pub fn compute_change(
    total: Money,
    method: PaymentMethod,
    tendered: Option<Money>,
) -> CoreResult<Payment> {
    let tendered = match method {
        PaymentMethod::Cash => tendered.unwrap_or(total),
        PaymentMethod::MobileMoney | PaymentMethod::Card => total,
    };

    if tendered < total {
        return Err(CoreError::InsufficientPayment { total, tendered });
    }

    Ok(Payment {
        method,
        amount: total,
        tendered,
        change: tendered - total,
        reference: None,
    })
}

/// Quick cash amounts for `total`: the exact amount, then `total` rounded
/// up to each of `denominations`. Ascending, no duplicates.
///
/// ## Example
/// ```rust
/// use caisse_core::checkout::{suggested_tenders, CASH_DENOMINATIONS};
/// use caisse_core::money::Money;
///
/// let tenders: Vec<i64> = suggested_tenders(Money::from_minor(3_750), &CASH_DENOMINATIONS)
///     .iter()
///     .map(|m| m.minor())
///     .collect();
/// assert_eq!(tenders, vec![3_750, 4_000, 5_000, 10_000]);
/// ```
pub fn suggested_tenders(total: Money, denominations: &[i64]) -> Vec<Money> {
    if !total.is_positive() {
        return vec![Money::zero()];
    }

    let mut tenders: Vec<Money> = std::iter::once(total)
        .chain(denominations.iter().map(|d| total.round_up_to(*d)))
        .collect();
    tenders.sort();
    tenders.dedup();
    tenders.truncate(MAX_SUGGESTED_TENDERS);
    tenders
}

// =============================================================================
// Vente Construction
// =============================================================================

/// Who, where and when a vente is rung up.
#[derive(Debug, Clone)]
pub struct VenteContext {
    pub module: ModuleActif,
    pub cashier_id: String,
    pub device_id: String,
    pub customer_name: Option<String>,
    /// Per-device counter, the last four digits of the receipt number.
    pub sequence: u32,
    pub now: DateTime<Utc>,
}

/// Receipt number `YYMMDD-HHMMSS-NNNN`.
///
/// ## Example
/// ```rust
/// use caisse_core::checkout::receipt_number;
/// use chrono::{TimeZone, Utc};
///
/// let at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 5, 7).unwrap();
/// assert_eq!(receipt_number(at, 42), "260314-090507-0042");
/// ```
pub fn receipt_number(at: DateTime<Utc>, sequence: u32) -> String {
    format!("{}-{:04}", at.format("%y%m%d-%H%M%S"), sequence % 10_000)
}

/// Builds a pending vente from the cart and its payment.
pub fn build_vente(cart: &Cart, payment: Payment, ctx: &VenteContext) -> CoreResult<Vente> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let total = cart.total();
    if payment.tendered < total {
        return Err(CoreError::InsufficientPayment {
            total,
            tendered: payment.tendered,
        });
    }

    let lines = cart
        .lines
        .iter()
        .map(|line| LigneVente {
            product_id: line.product_id.clone(),
            conditionnement_id: line.conditionnement_id.clone(),
            reference: line.reference.clone(),
            name: line.name.clone(),
            conditionnement_kind: line.conditionnement_kind,
            conditionnement_label: line.conditionnement_label.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
        })
        .collect();

    Ok(Vente {
        id: Uuid::new_v4().to_string(),
        receipt_number: receipt_number(ctx.now, ctx.sequence),
        module: ctx.module,
        status: VenteStatus::Pending,
        lines,
        subtotal: cart.subtotal(),
        discount_bps: cart.discount_bps,
        discount: cart.discount(),
        total,
        payment,
        cashier_id: ctx.cashier_id.clone(),
        device_id: ctx.device_id.clone(),
        customer_name: ctx.customer_name.clone(),
        created_at: ctx.now,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditionnement::{Conditionnement, ConditionnementKind};
    use crate::types::Product;
    use chrono::TimeZone;

    fn doliprane() -> Product {
        Product {
            id: "doli".to_string(),
            reference: "DOLI-500".to_string(),
            barcode: None,
            name: "Doliprane 500mg".to_string(),
            category: None,
            module: ModuleActif::Pharmacie,
            conditionnements: vec![Conditionnement {
                id: "boite".to_string(),
                kind: ConditionnementKind::Boite,
                label: None,
                price: Money::from_minor(1_250),
                stock: Some(20),
                units_per_pack: 2,
                barcode: None,
                is_default: true,
            }],
            track_stock: true,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    fn ctx() -> VenteContext {
        VenteContext {
            module: ModuleActif::Pharmacie,
            cashier_id: "u-awa".to_string(),
            device_id: "tab-01".to_string(),
            customer_name: Some("M. Diallo".to_string()),
            sequence: 7,
            now: Utc.with_ymd_and_hms(2026, 1, 2, 18, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_cash_change() {
        let total = Money::from_minor(3_750);
        let payment =
            compute_change(total, PaymentMethod::Cash, Some(Money::from_minor(5_000))).unwrap();
        assert_eq!(payment.change.minor(), 1_250);
        assert_eq!(payment.amount, total);

        let exact = compute_change(total, PaymentMethod::Cash, None).unwrap();
        assert!(exact.change.is_zero());
        assert_eq!(exact.tendered, total);
    }

    #[test]
    fn test_cash_insufficient() {
        let err = compute_change(
            Money::from_minor(3_750),
            PaymentMethod::Cash,
            Some(Money::from_minor(3_000)),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
    }

    #[test]
    fn test_non_cash_is_exact() {
        let total = Money::from_minor(3_750);
        let payment =
            compute_change(total, PaymentMethod::Card, Some(Money::from_minor(10_000))).unwrap();
        assert_eq!(payment.tendered, total);
        assert!(payment.change.is_zero());
    }

    #[test]
    fn test_suggested_tenders() {
        let minors = |t: Money| -> Vec<i64> {
            suggested_tenders(t, &CASH_DENOMINATIONS)
                .iter()
                .map(|m| m.minor())
                .collect()
        };

        assert_eq!(minors(Money::from_minor(3_750)), vec![3_750, 4_000, 5_000, 10_000]);
        assert_eq!(minors(Money::from_minor(10_000)), vec![10_000]);
        assert_eq!(
            minors(Money::from_minor(1_200)),
            vec![1_200, 1_500, 2_000, 5_000, 10_000]
        );
        assert_eq!(minors(Money::from_minor(12_300)), vec![12_300, 12_500, 13_000, 14_000, 15_000]);
        assert_eq!(minors(Money::zero()), vec![0]);
    }

    #[test]
    fn test_suggested_tenders_with_decimals() {
        // 37.500 TND, three decimals
        let tenders: Vec<i64> = suggested_tenders(Money::from_minor(37_500), &cash_denominations(3))
            .iter()
            .map(|m| m.minor())
            .collect();
        assert_eq!(tenders, vec![37_500, 40_000, 50_000, 100_000]);

        // 0.80 EUR
        let tenders: Vec<i64> = suggested_tenders(Money::from_minor(80), &cash_denominations(2))
            .iter()
            .map(|m| m.minor())
            .collect();
        assert_eq!(tenders, vec![80, 500, 1_000, 2_000, 5_000]);
    }

    #[test]
    fn test_receipt_number_wraps_sequence() {
        let at = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(receipt_number(at, 12_345), "261231-235959-2345");
    }

    #[test]
    fn test_build_vente_snapshots_cart() {
        let mut cart = Cart::new();
        cart.add(&doliprane(), "boite", 3).unwrap();
        cart.set_discount_bps(1_000).unwrap();

        let payment = compute_change(cart.total(), PaymentMethod::Cash, Some(Money::from_minor(5_000)))
            .unwrap();
        let vente = build_vente(&cart, payment, &ctx()).unwrap();

        assert_eq!(vente.status, VenteStatus::Pending);
        assert_eq!(vente.receipt_number, "260102-183000-0007");
        assert_eq!(vente.subtotal.minor(), 3_750);
        assert_eq!(vente.discount.minor(), 375);
        assert_eq!(vente.total.minor(), 3_375);
        assert_eq!(vente.payment.change.minor(), 1_625);
        assert_eq!(vente.lines.len(), 1);
        assert_eq!(vente.lines[0].line_total.minor(), 3_750);
        assert_eq!(vente.lines[0].conditionnement_kind, ConditionnementKind::Boite);
        assert!(Uuid::parse_str(&vente.id).is_ok());
    }

    #[test]
    fn test_build_vente_rejects_empty_cart_and_short_payment() {
        let cart = Cart::new();
        let payment = compute_change(Money::zero(), PaymentMethod::Cash, None).unwrap();
        assert!(matches!(build_vente(&cart, payment, &ctx()), Err(CoreError::EmptyCart)));

        let mut cart = Cart::new();
        cart.add(&doliprane(), "boite", 1).unwrap();
        let short = Payment {
            method: PaymentMethod::Cash,
            amount: Money::from_minor(1_000),
            tendered: Money::from_minor(1_000),
            change: Money::zero(),
            reference: None,
        };
        assert!(matches!(
            build_vente(&cart, short, &ctx()),
            Err(CoreError::InsufficientPayment { .. })
        ));
    }
}
