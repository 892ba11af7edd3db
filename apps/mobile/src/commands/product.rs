//! # Product Commands
//!
//! Catalogue search, barcode scanning and catalogue refresh.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Product Search Flow                                  │
//! │                                                                         │
//! │  Cashier types or scans "6001234000024"                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Is query a barcode? (8-13 digits)        │                         │
//! │  │  YES: GET /api/produits/barcode/{code}    │──► Found? Return [1]    │
//! │  │  NO:  GET /api/produits?module=&q=        │                         │
//! │  └───────────────────────────────────────────┘                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Results cached in CatalogState, returned as ProductView               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caisse_api::{ClientError, ProductQuery};
use caisse_core::conditionnement::quantity_bounds;
use caisse_core::validation::validate_search_query;
use caisse_core::{ConditionnementKind, ModuleActif, Money, Product, StockAdjustment};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::cart::CartResponse;
use super::require_session;
use crate::error::{CommandError, CommandResult, ErrorCode};
use crate::state::{ApiState, CartState, CatalogState, ConfigState, SessionState};

/// Page size used to fill the catalogue cache.
pub const CATALOG_PAGE_SIZE: usize = 500;

// =============================================================================
// Views
// =============================================================================

/// A packaging as shown on a product card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionnementView {
    pub id: String,
    pub kind: ConditionnementKind,
    pub label: String,
    pub emoji: &'static str,
    pub price: Money,
    pub price_display: String,
    pub units_per_pack: i64,
    /// Price of one base unit, for packagings holding several.
    pub unit_price_display: Option<String>,
    /// `None` when stock is not tracked.
    pub stock: Option<i64>,
    /// Highest quantity the picker allows, 0 when out of stock.
    pub max_quantity: i64,
    pub is_default: bool,
}

/// Product DTO for the shell.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: String,
    pub reference: String,
    pub barcode: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub module: ModuleActif,
    pub in_stock: bool,
    pub default_conditionnement_id: Option<String>,
    pub conditionnements: Vec<ConditionnementView>,
}

impl ProductView {
    pub fn new(product: &Product, config: &ConfigState) -> Self {
        let default_id = product.default_conditionnement().map(|c| c.id.clone());
        let tracked = product.tracks_stock();

        let conditionnements = product
            .conditionnements
            .iter()
            .map(|c| {
                let bounds = quantity_bounds(product, c);
                ConditionnementView {
                    id: c.id.clone(),
                    kind: c.kind,
                    label: c.display_label().to_string(),
                    emoji: c.kind.emoji(),
                    price: c.price,
                    price_display: config.format_money(c.price),
                    units_per_pack: c.units_per_pack,
                    unit_price_display: (c.units_per_pack > 1)
                        .then(|| config.format_money(c.unit_price())),
                    stock: if tracked { c.available() } else { None },
                    max_quantity: if bounds.is_empty() { 0 } else { bounds.max },
                    is_default: default_id.as_deref() == Some(c.id.as_str()),
                }
            })
            .collect();

        ProductView {
            id: product.id.clone(),
            reference: product.reference.clone(),
            barcode: product.barcode.clone(),
            name: product.name.clone(),
            category: product.category.clone(),
            module: product.module,
            in_stock: product.in_stock(),
            default_conditionnement_id: default_id,
            conditionnements,
        }
    }
}

/// Result of a barcode scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub product: ProductView,
    /// The packaging the scanned code designates.
    pub conditionnement_id: String,
    /// Cart after adding one packaging, when requested.
    pub cart: Option<CartResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub module: ModuleActif,
    pub product_count: usize,
    /// Changes made to the cart, to show the cashier.
    pub adjustments: Vec<StockAdjustment>,
    pub cart: CartResponse,
}

// =============================================================================
// Helpers
// =============================================================================

/// Checks if a query looks like a barcode (EAN-8, UPC-A, EAN-13).
fn is_barcode_query(query: &str) -> bool {
    let len = query.len();
    (8..=13).contains(&len) && query.chars().all(|c| c.is_ascii_digit())
}

/// Rejects products of another module than the active one.
pub(crate) fn ensure_module(product: &Product, module: ModuleActif) -> CommandResult<()> {
    if product.module != module {
        return Err(CommandError::new(
            ErrorCode::WrongModule,
            format!(
                "{} appartient au module {}",
                product.name,
                product.module.theme().title
            ),
        ));
    }
    Ok(())
}

/// A product from the cache, fetched and cached when missing.
pub(crate) async fn resolve_product(
    api: &ApiState,
    catalog: &CatalogState,
    id: &str,
) -> CommandResult<Product> {
    if let Some(product) = catalog.get(id) {
        return Ok(product);
    }
    let product = api.client().products().get(id).await.map_err(|e| match e {
        ClientError::NotFound(_) => CommandError::not_found("Produit", id),
        other => other.into(),
    })?;
    catalog.upsert([product.clone()]);
    Ok(product)
}

// =============================================================================
// Commands
// =============================================================================

/// Searches the catalogue of the module actif.
///
/// An empty query lists the module's catalogue.
pub async fn search_products(
    api: &ApiState,
    session: &SessionState,
    catalog: &CatalogState,
    config: &ConfigState,
    query: Option<&str>,
    limit: Option<usize>,
) -> CommandResult<Vec<ProductView>> {
    let start = Instant::now();
    let module = require_session(session)?.module;
    let query = match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(q) => Some(validate_search_query(q)?),
        None => None,
    };
    debug!(module = %module, query = ?query, "search_products command");

    if let Some(code) = query.as_deref().filter(|q| is_barcode_query(q)) {
        if let Some(product) = api.client().products().find_by_barcode(code).await? {
            if product.module == module {
                catalog.upsert([product.clone()]);
                return Ok(vec![ProductView::new(&product, config)]);
            }
        }
    }

    let mut request = ProductQuery::for_module(module);
    if let Some(q) = query {
        request = request.search(q);
    }
    if let Some(limit) = limit {
        request = request.limit(limit);
    }
    let page = api.client().products().list(&request).await?;

    let views = page
        .items
        .iter()
        .map(|p| ProductView::new(p, config))
        .collect();
    catalog.upsert(page.items);

    info!(
        module = %module,
        total = page.total,
        duration_ms = start.elapsed().as_millis() as u64,
        "Products searched"
    );
    Ok(views)
}

/// Fetches one product, served from the cache when the backend is unreachable.
pub async fn get_product(
    api: &ApiState,
    catalog: &CatalogState,
    config: &ConfigState,
    id: &str,
) -> CommandResult<ProductView> {
    debug!(product_id = %id, "get_product command");

    match api.client().products().get(id).await {
        Ok(product) => {
            let view = ProductView::new(&product, config);
            catalog.upsert([product]);
            Ok(view)
        }
        Err(ClientError::NotFound(_)) => Err(CommandError::not_found("Produit", id)),
        Err(e) if e.is_retryable() => match catalog.get(id) {
            Some(cached) => {
                warn!(product_id = %id, error = %e, "Backend unreachable, using cached product");
                Ok(ProductView::new(&cached, config))
            }
            None => Err(e.into()),
        },
        Err(e) => Err(e.into()),
    }
}

/// Looks a scanned code up and picks the packaging it designates.
///
/// With `add`, one packaging goes straight into the cart.
pub async fn scan_barcode(
    api: &ApiState,
    session: &SessionState,
    catalog: &CatalogState,
    cart: &CartState,
    config: &ConfigState,
    code: &str,
    add: bool,
) -> CommandResult<ScanResult> {
    let module = require_session(session)?.module;
    let code = code.trim();
    debug!(code = %code, add, "scan_barcode command");

    if code.is_empty() {
        return Err(CommandError::validation("Code-barres vide"));
    }

    let product = api
        .client()
        .products()
        .find_by_barcode(code)
        .await?
        .ok_or_else(|| CommandError::not_found("Code-barres", code))?;
    ensure_module(&product, module)?;

    let conditionnement_id = product
        .find_by_barcode(code)
        .or_else(|| product.default_conditionnement())
        .map(|c| c.id.clone())
        .ok_or_else(|| CommandError::cart(format!("{} n'a aucun conditionnement", product.name)))?;

    catalog.upsert([product.clone()]);

    let cart_response = if add {
        let response = cart.with_cart_mut(|c| {
            c.add(&product, &conditionnement_id, 1)?;
            Ok::<_, CommandError>(CartResponse::build(c, config))
        })?;
        info!(product_id = %product.id, conditionnement_id = %conditionnement_id, "Scanned into cart");
        Some(response)
    } else {
        None
    };

    Ok(ScanResult {
        product: ProductView::new(&product, config),
        conditionnement_id,
        cart: cart_response,
    })
}

/// Reloads the module's catalogue and reconciles the cart against it.
///
/// Cart products outside the first page are fetched one by one so they are
/// not mistaken for deleted products.
pub async fn refresh_catalog(
    api: &ApiState,
    session: &SessionState,
    catalog: &CatalogState,
    cart: &CartState,
    config: &ConfigState,
) -> CommandResult<RefreshResponse> {
    let module = require_session(session)?.module;
    debug!(module = %module, "refresh_catalog command");

    let page = api
        .client()
        .products()
        .list(&ProductQuery::for_module(module).limit(CATALOG_PAGE_SIZE))
        .await?;
    let mut products = page.items;

    let missing: Vec<String> = cart
        .product_ids()
        .into_iter()
        .filter(|id| !products.iter().any(|p| &p.id == id))
        .collect();
    if !missing.is_empty() {
        products.extend(api.client().products().get_many(&missing).await?);
    }

    let (adjustments, cart_response) = cart.with_cart_mut(|c| {
        let adjustments = c.reconcile_stock(&products);
        (adjustments, CartResponse::build(c, config))
    });
    if !adjustments.is_empty() {
        info!(count = adjustments.len(), "Cart adjusted to fresh stock");
    }

    let product_count = products.len();
    catalog.replace(module, products);

    Ok(RefreshResponse {
        module,
        product_count,
        adjustments,
        cart: cart_response,
    })
}
