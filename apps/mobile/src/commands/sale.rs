//! # Sale Commands
//!
//! Change calculation, checkout, the pending queue and reports.
//!
//! ## Checkout Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Checkout Flow                                        │
//! │                                                                         │
//! │  1. Fresh stock for the cart's products (catalogue cache if offline)   │
//! │  2. Cart::validate_for_checkout ──── INSUFFICIENT_STOCK? cart kept     │
//! │  3. compute_change ──────────────── PAYMENT_ERROR? cart kept          │
//! │  4. build_vente (status Pending, receipt number)                        │
//! │  5. POST /api/ventes + Idempotency-Key                                  │
//! │       ├── 201          ──► Recorded, sold lines leave the cart          │
//! │       ├── unreachable  ──► queued in PendingState, sold lines leave     │
//! │       └── rejected     ──► error returned, cart kept                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caisse_core::checkout::{
    build_vente, cash_denominations, compute_change, suggested_tenders, VenteContext,
};
use caisse_core::validation::validate_tendered_amount;
use caisse_core::{DailySummary, Money, PaymentMethod, Product, Vente};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::require_session;
use crate::error::CommandResult;
use crate::receipt::render_receipt;
use crate::state::{ApiState, CartState, CatalogState, ConfigState, PendingState, SessionState};

/// Ventes shown by default in the history screen.
pub const DEFAULT_RECENT_LIMIT: usize = 20;

// =============================================================================
// Request / Response Types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderOption {
    pub amount: Money,
    pub display: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePreview {
    pub total: Money,
    pub total_display: String,
    pub tendered: Money,
    pub change: Money,
    pub change_display: String,
    /// False while the cash tendered is below the total.
    pub sufficient: bool,
    pub missing: Money,
    pub missing_display: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub method: PaymentMethod,
    /// Cash handed over. Ignored for non-cash methods.
    #[serde(default)]
    pub tendered: Option<Money>,
    /// Mobile money transaction id or card slip number.
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub vente: Vente,
    pub change_display: String,
    pub receipt: String,
    /// True when the backend was unreachable and the vente awaits sending.
    pub queued: bool,
}

/// A queued vente the backend refused.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedVente {
    pub vente_id: String,
    pub receipt_number: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    pub sent: usize,
    /// Still queued after the flush, rejected ones included.
    pub remaining: usize,
    pub rejected: Vec<RejectedVente>,
    /// The backend became unreachable during the flush.
    pub interrupted: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSales {
    pub pending: Vec<Vente>,
    pub recorded: Vec<Vente>,
    /// Recorded ventes could not be fetched.
    pub offline: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodLine {
    pub method: PaymentMethod,
    pub label: &'static str,
    pub count: i64,
    pub amount_display: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: DailySummary,
    pub revenue_display: String,
    pub by_method: Vec<MethodLine>,
}

// =============================================================================
// Change
// =============================================================================

/// Quick cash buttons for the cart total, in notes of the configured currency.
pub fn suggest_tenders(cart: &CartState, config: &ConfigState) -> Vec<TenderOption> {
    let total = cart.with_cart(|c| c.total());
    suggested_tenders(total, &cash_denominations(config.currency_decimals))
        .into_iter()
        .map(|amount| TenderOption {
            amount,
            display: config.format_money(amount),
        })
        .collect()
}

/// Change due for what the customer hands over. Never fails on a short
/// tender; the screen shows what is missing instead.
pub fn preview_change(
    cart: &CartState,
    config: &ConfigState,
    method: PaymentMethod,
    tendered: Option<Money>,
) -> ChangePreview {
    let total = cart.with_cart(|c| c.total());
    let tendered = match method {
        PaymentMethod::Cash => tendered.unwrap_or(total),
        PaymentMethod::MobileMoney | PaymentMethod::Card => total,
    };

    let sufficient = tendered >= total;
    let (change, missing) = if sufficient {
        (tendered - total, Money::zero())
    } else {
        (Money::zero(), total - tendered)
    };

    ChangePreview {
        total,
        total_display: config.format_money(total),
        tendered,
        change,
        change_display: config.format_money(change),
        sufficient,
        missing,
        missing_display: config.format_money(missing),
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Products of the cart lines, fresh from the backend or cached when the
/// backend is unreachable.
async fn checkout_products(
    api: &ApiState,
    catalog: &CatalogState,
    ids: &[String],
) -> CommandResult<Vec<Product>> {
    match api.client().products().get_many(ids).await {
        Ok(products) => {
            catalog.upsert(products.clone());
            Ok(products)
        }
        Err(e) if e.is_retryable() => {
            warn!(error = %e, "Checking stock against the cached catalogue");
            Ok(catalog.get_many(ids))
        }
        Err(e) => Err(e.into()),
    }
}

/// Rings the cart up.
///
/// ## Errors
/// - `CART_ERROR` for an empty cart
/// - `INSUFFICIENT_STOCK` when stock moved since the lines were added
/// - `PAYMENT_ERROR` when the cash tendered is short
/// - backend rejections other than unavailability
///
/// The sold lines leave the cart only once the vente is recorded or queued.
/// Lines scanned while the backend answers stay for the next vente.
pub async fn checkout(
    api: &ApiState,
    session: &SessionState,
    catalog: &CatalogState,
    cart: &CartState,
    pending: &PendingState,
    config: &ConfigState,
    request: CheckoutRequest,
) -> CommandResult<CheckoutResponse> {
    let current = require_session(session)?;
    debug!(method = %request.method, tendered = ?request.tendered, "checkout command");

    if let Some(tendered) = request.tendered {
        validate_tendered_amount(tendered.minor())?;
    }

    let snapshot = cart.with_cart(|c| c.clone());
    if snapshot.is_empty() {
        return Err(caisse_core::CoreError::EmptyCart.into());
    }

    let ids = cart.product_ids();
    let products = checkout_products(api, catalog, &ids).await?;
    snapshot.validate_for_checkout(&products)?;

    let mut payment = compute_change(snapshot.total(), request.method, request.tendered)?;
    payment.reference = request
        .reference
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());

    let ctx = VenteContext {
        module: current.module,
        cashier_id: current.user.id.clone(),
        device_id: api.device_id().to_string(),
        customer_name: request
            .customer_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        sequence: pending.next_sequence(),
        now: Utc::now(),
    };
    let vente = build_vente(&snapshot, payment, &ctx)?;

    let (vente, queued) = match api.client().ventes().record(&vente).await {
        Ok(recorded) => (recorded, false),
        Err(e) if e.is_retryable() => {
            warn!(vente_id = %vente.id, error = %e, "Backend unreachable, vente queued");
            pending.push(vente.clone());
            (vente, true)
        }
        Err(e) => {
            error!(vente_id = %vente.id, error = %e, "Vente rejected by the backend");
            return Err(e.into());
        }
    };

    cart.with_cart_mut(|c| c.remove_sold(&snapshot));

    info!(
        vente_id = %vente.id,
        receipt_number = %vente.receipt_number,
        module = %vente.module,
        total = %vente.total,
        lines = vente.lines.len(),
        queued,
        "Checkout complete"
    );

    Ok(CheckoutResponse {
        change_display: config.format_money(vente.payment.change),
        receipt: render_receipt(&vente, current.user.display_name(), config),
        vente,
        queued,
    })
}

// =============================================================================
// Pending Queue
// =============================================================================

/// Sends queued ventes, oldest first.
///
/// Stops at the first unavailability. A vente the backend refuses stays
/// queued and is reported so a manager can look at it.
pub async fn flush_pending(api: &ApiState, pending: &PendingState) -> CommandResult<FlushReport> {
    let queued = pending.snapshot();
    debug!(count = queued.len(), "flush_pending command");

    let mut report = FlushReport::default();
    for vente in queued {
        match api.client().ventes().record(&vente).await {
            Ok(_) => {
                pending.acknowledge(&vente.id);
                report.sent += 1;
            }
            Err(e) if e.is_retryable() => {
                warn!(vente_id = %vente.id, error = %e, "Backend unreachable, flush interrupted");
                report.interrupted = true;
                break;
            }
            Err(e) if e.is_auth_error() => return Err(e.into()),
            Err(e) => {
                error!(vente_id = %vente.id, error = %e, "Queued vente rejected");
                report.rejected.push(RejectedVente {
                    vente_id: vente.id.clone(),
                    receipt_number: vente.receipt_number.clone(),
                    message: e.to_string(),
                });
            }
        }
    }
    report.remaining = pending.len();

    info!(
        sent = report.sent,
        remaining = report.remaining,
        rejected = report.rejected.len(),
        "Pending ventes flushed"
    );
    Ok(report)
}

// =============================================================================
// Reports
// =============================================================================

/// Latest recorded ventes, with the queued ones on top.
pub async fn recent_sales(
    api: &ApiState,
    pending: &PendingState,
    limit: Option<usize>,
) -> CommandResult<RecentSales> {
    let limit = limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    debug!(limit, "recent_sales command");

    let mut queued = pending.snapshot();
    queued.reverse();

    match api.client().ventes().recent(limit).await {
        Ok(page) => Ok(RecentSales {
            pending: queued,
            recorded: page.items,
            offline: false,
        }),
        Err(e) if e.is_retryable() => Ok(RecentSales {
            pending: queued,
            recorded: Vec::new(),
            offline: true,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Totals of the day, today when `date` is `None`.
pub async fn daily_summary(
    api: &ApiState,
    config: &ConfigState,
    date: Option<NaiveDate>,
) -> CommandResult<SummaryResponse> {
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    debug!(date = %date, "daily_summary command");

    let summary = api.client().ventes().daily_summary(date).await?;
    let by_method = summary
        .by_method
        .iter()
        .map(|m| MethodLine {
            method: m.method,
            label: m.method.label(),
            count: m.count,
            amount_display: config.format_money(m.amount),
        })
        .collect();

    Ok(SummaryResponse {
        revenue_display: config.format_money(summary.revenue),
        by_method,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::auth::{login, switch_module};
    use crate::commands::cart::{add_to_cart, AddToCartRequest};
    use crate::error::ErrorCode;
    use crate::App;
    use caisse_api::testing::FakeBackend;
    use caisse_core::{ModuleActif, VenteStatus};

    async fn pharmacie_with_cart(backend: &FakeBackend) -> App {
        let app = App::for_backend(backend);
        login(&app.api, &app.session, &app.config, "awa", "1234")
            .await
            .unwrap();
        switch_module(&app.api, &app.session, &app.cart, &app.catalog, ModuleActif::Pharmacie)
            .await
            .unwrap();
        add_to_cart(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.config,
            AddToCartRequest {
                product_id: "doliprane".to_string(),
                conditionnement_id: Some("boite".to_string()),
                quantity: Some(2),
            },
        )
        .await
        .unwrap();
        app
    }

    fn cash(tendered: i64) -> CheckoutRequest {
        CheckoutRequest {
            method: PaymentMethod::Cash,
            tendered: Some(Money::from_minor(tendered)),
            reference: None,
            customer_name: None,
        }
    }

    #[tokio::test]
    async fn test_tenders_and_preview() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;

        let tenders = suggest_tenders(&app.cart, &app.config);
        assert_eq!(tenders[0].amount, Money::from_minor(3_000));
        assert_eq!(tenders[0].display, "3 000 FCFA");

        let preview = preview_change(&app.cart, &app.config, PaymentMethod::Cash, Some(Money::from_minor(2_000)));
        assert!(!preview.sufficient);
        assert_eq!(preview.missing, Money::from_minor(1_000));

        let preview = preview_change(&app.cart, &app.config, PaymentMethod::Cash, Some(Money::from_minor(5_000)));
        assert!(preview.sufficient);
        assert_eq!(preview.change_display, "2 000 FCFA");

        let preview = preview_change(&app.cart, &app.config, PaymentMethod::MobileMoney, None);
        assert!(preview.change.is_zero());
    }

    #[tokio::test]
    async fn test_tenders_follow_currency_decimals() {
        let backend = FakeBackend::start().await;
        let mut app = pharmacie_with_cart(&backend).await;
        app.config = ConfigState::from_lookup(|key| {
            (key == "CAISSE_CURRENCY").then(|| "TND:DT:3".to_string())
        });

        let tenders = suggest_tenders(&app.cart, &app.config);
        let amounts: Vec<i64> = tenders.iter().map(|t| t.amount.minor()).collect();
        assert_eq!(amounts, vec![3_000, 5_000, 10_000, 20_000, 50_000]);
        assert_eq!(tenders[1].display, "DT5.000");
    }

    #[tokio::test]
    async fn test_checkout_records_and_clears_cart() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;

        let done = checkout(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.pending,
            &app.config,
            cash(5_000),
        )
        .await
        .unwrap();

        assert!(!done.queued);
        assert_eq!(done.vente.status, VenteStatus::Recorded);
        assert_eq!(done.vente.total, Money::from_minor(3_000));
        assert_eq!(done.vente.payment.change, Money::from_minor(2_000));
        assert_eq!(done.vente.module, ModuleActif::Pharmacie);
        assert!(done.receipt.contains("Délivrance"));
        assert!(app.cart.with_cart(|c| c.is_empty()));
        assert_eq!(backend.state.recorded_ventes().await, 1);
    }

    #[tokio::test]
    async fn test_checkout_keeps_cart_on_short_tender_or_stock_change() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;

        let err = checkout(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.pending,
            &app.config,
            cash(1_000),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::PaymentError);

        backend.state.set_stock("doliprane", "boite", 1).await;
        let err = checkout(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.pending,
            &app.config,
            cash(5_000),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(app.cart.with_cart(|c| c.line_count()), 1);
        assert_eq!(backend.state.recorded_ventes().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_keeps_lines_added_while_waiting() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;

        // The stock refresh backs off a few times before the backend answers.
        backend.state.fail_next_requests(3);
        let (done, added) = tokio::join!(
            checkout(
                &app.api,
                &app.session,
                &app.catalog,
                &app.cart,
                &app.pending,
                &app.config,
                cash(5_000),
            ),
            async {
                tokio::task::yield_now().await;
                add_to_cart(
                    &app.api,
                    &app.session,
                    &app.catalog,
                    &app.cart,
                    &app.config,
                    AddToCartRequest {
                        product_id: "doliprane".to_string(),
                        conditionnement_id: Some("plaquette".to_string()),
                        quantity: None,
                    },
                )
                .await
            }
        );
        let done = done.unwrap();
        added.unwrap();

        assert_eq!(done.vente.lines.len(), 1);
        assert_eq!(done.vente.lines[0].conditionnement_id, "boite");
        assert_eq!(done.vente.total, Money::from_minor(3_000));

        let left = app.cart.with_cart(|c| c.lines.clone());
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].conditionnement_id, "plaquette");
        assert_eq!(left[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_checkout_keeps_cart_when_backend_refuses() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;

        // Stock is checked against the cache while another terminal sells
        // the boxes.
        backend.state.set_stock("doliprane", "boite", 1).await;
        backend.state.fail_next_requests(4);
        let err = checkout(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.pending,
            &app.config,
            cash(5_000),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(app.cart.with_cart(|c| (c.line_count(), c.total_quantity())), (1, 2));
        assert_eq!(app.pending.len(), 0);
        assert_eq!(backend.state.recorded_ventes().await, 0);
    }

    #[tokio::test]
    async fn test_checkout_queues_when_offline_then_flushes() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;

        // Product refresh and vente recording each exhaust their retries.
        backend.state.fail_next_requests(8);
        let done = checkout(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.pending,
            &app.config,
            cash(3_000),
        )
        .await
        .unwrap();

        assert!(done.queued);
        assert_eq!(done.vente.status, VenteStatus::Pending);
        assert!(done.receipt.contains("EN ATTENTE D'ENVOI"));
        assert!(app.cart.with_cart(|c| c.is_empty()));
        assert_eq!(app.pending.len(), 1);

        let recent = recent_sales(&app.api, &app.pending, None).await.unwrap();
        assert_eq!(recent.pending.len(), 1);
        assert!(recent.recorded.is_empty());

        let report = flush_pending(&app.api, &app.pending).await.unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(report.remaining, 0);
        assert!(!report.interrupted);
        assert_eq!(backend.state.recorded_ventes().await, 1);
    }

    #[tokio::test]
    async fn test_flush_stops_when_backend_unreachable() {
        let backend = FakeBackend::start().await;
        let app = App::for_backend(&backend);
        login(&app.api, &app.session, &app.config, "awa", "1234")
            .await
            .unwrap();
        app.pending.push(caisse_api::testing::sample_vente("test-device"));
        app.pending.push(caisse_api::testing::sample_vente("test-device"));

        backend.state.fail_next_requests(100);
        let report = flush_pending(&app.api, &app.pending).await.unwrap();
        assert!(report.interrupted);
        assert_eq!(report.sent, 0);
        assert_eq!(report.remaining, 2);
    }

    #[tokio::test]
    async fn test_flush_keeps_refused_ventes_queued() {
        let backend = FakeBackend::start().await;
        let app = App::for_backend(&backend);
        login(&app.api, &app.session, &app.config, "awa", "1234")
            .await
            .unwrap();
        let vente = caisse_api::testing::sample_vente("test-device");
        app.pending.push(vente.clone());

        backend.state.set_stock("doliprane", "plaquette", 1).await;
        let report = flush_pending(&app.api, &app.pending).await.unwrap();
        assert_eq!(report.sent, 0);
        assert_eq!(report.remaining, 1);
        assert!(!report.interrupted);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].vente_id, vente.id);
        assert_eq!(report.rejected[0].receipt_number, vente.receipt_number);

        // Restocked: the same vente goes through on the next flush.
        backend.state.set_stock("doliprane", "plaquette", 40).await;
        let report = flush_pending(&app.api, &app.pending).await.unwrap();
        assert_eq!(report.sent, 1);
        assert!(report.rejected.is_empty());
        assert_eq!(app.pending.len(), 0);
    }

    #[tokio::test]
    async fn test_daily_summary() {
        let backend = FakeBackend::start().await;
        let app = pharmacie_with_cart(&backend).await;
        let done = checkout(
            &app.api,
            &app.session,
            &app.catalog,
            &app.cart,
            &app.pending,
            &app.config,
            cash(3_000),
        )
        .await
        .unwrap();

        let date = done.vente.created_at.date_naive();
        let summary = daily_summary(&app.api, &app.config, Some(date)).await.unwrap();
        assert_eq!(summary.summary.sale_count, 1);
        assert_eq!(summary.revenue_display, "3 000 FCFA");
        assert_eq!(summary.by_method[0].label, "Espèces");

        let recent = recent_sales(&app.api, &app.pending, Some(5)).await.unwrap();
        assert_eq!(recent.recorded.len(), 1);
        assert!(!recent.offline);
    }
}
