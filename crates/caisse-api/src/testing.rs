//! # Fake Backend
//!
//! An `axum` server on a random local port that speaks the backend contract,
//! with a small catalogue and switches to inject failures. Used by the tests
//! of this crate and, through the `testing` feature, by the app's tests.
//!
//! ## Accounts
//! | username | password | role    | modules              |
//! |----------|----------|---------|----------------------|
//! | awa      | 1234     | cashier | pharmacie, boutique  |
//! | admin    | admin    | admin   | all                  |

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use caisse_core::checkout::{build_vente, compute_change, VenteContext};
use caisse_core::{
    Cart, Conditionnement, ConditionnementKind, DailySummary, MethodTotal, ModuleActif, Money,
    PaymentMethod, Product, Role, User, Vente, VenteStatus,
};
use chrono::{NaiveDate, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::client::{BackendClient, ListResponse};
use crate::config::ClientConfig;
use crate::ventes::IDEMPOTENCY_HEADER;

const JWT_SECRET: &[u8] = b"fake-backend-secret";
const TOKEN_TTL_SECS: i64 = 3600;

// =============================================================================
// Shared State
// =============================================================================

/// What the fake backend holds, plus counters the tests assert on.
pub struct FakeState {
    logins: AtomicUsize,
    logouts: AtomicUsize,
    token_generation: AtomicU64,
    failures: AtomicUsize,
    dropped_responses: AtomicUsize,
    products: Mutex<Vec<Product>>,
    ventes: Mutex<Vec<Vente>>,
}

impl FakeState {
    fn new() -> Self {
        Self {
            logins: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            token_generation: AtomicU64::new(0),
            failures: AtomicUsize::new(0),
            dropped_responses: AtomicUsize::new(0),
            products: Mutex::new(sample_products()),
            ventes: Mutex::new(Vec::new()),
        }
    }

    /// Successful logins so far.
    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    /// Makes every token issued so far answer 401.
    pub fn revoke_tokens(&self) {
        self.token_generation.fetch_add(1, Ordering::SeqCst);
    }

    /// The next `n` catalogue and vente requests answer 503 without effect.
    pub fn fail_next_requests(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// The next `n` vente submissions are stored, then answer 503.
    pub fn drop_next_responses(&self, n: usize) {
        self.dropped_responses.store(n, Ordering::SeqCst);
    }

    pub async fn recorded_ventes(&self) -> usize {
        self.ventes.lock().await.len()
    }

    /// Overwrites the stock of one packaging.
    pub async fn set_stock(&self, product_id: &str, conditionnement_id: &str, stock: i64) {
        let mut products = self.products.lock().await;
        if let Some(c) = find_mut(&mut products, product_id, conditionnement_id) {
            c.stock = Some(stock);
        }
    }

    /// Overwrites the price of one packaging.
    pub async fn set_price(&self, product_id: &str, conditionnement_id: &str, price: Money) {
        let mut products = self.products.lock().await;
        if let Some(c) = find_mut(&mut products, product_id, conditionnement_id) {
            c.price = price;
        }
    }

    /// Removes a product from the catalogue.
    pub async fn remove_product(&self, product_id: &str) {
        self.products.lock().await.retain(|p| p.id != product_id);
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn find_mut<'a>(
    products: &'a mut [Product],
    product_id: &str,
    conditionnement_id: &str,
) -> Option<&'a mut Conditionnement> {
    products
        .iter_mut()
        .find(|p| p.id == product_id)?
        .conditionnements
        .iter_mut()
        .find(|c| c.id == conditionnement_id)
}

// =============================================================================
// Sample Data
// =============================================================================

fn conditionnement(
    id: &str,
    kind: ConditionnementKind,
    price: i64,
    stock: Option<i64>,
    units_per_pack: i64,
    barcode: Option<&str>,
) -> Conditionnement {
    Conditionnement {
        id: id.to_string(),
        kind,
        label: None,
        price: Money::from_minor(price),
        stock,
        units_per_pack,
        barcode: barcode.map(str::to_string),
        is_default: false,
    }
}

fn product(
    id: &str,
    reference: &str,
    name: &str,
    module: ModuleActif,
    barcode: Option<&str>,
    conditionnements: Vec<Conditionnement>,
) -> Product {
    Product {
        id: id.to_string(),
        reference: reference.to_string(),
        barcode: barcode.map(str::to_string),
        name: name.to_string(),
        category: None,
        module,
        conditionnements,
        track_stock: true,
        is_active: true,
        updated_at: Utc::now(),
    }
}

/// The fake catalogue, one or two products per module.
pub fn sample_products() -> Vec<Product> {
    use ConditionnementKind::*;
    vec![
        product(
            "doliprane",
            "DOLI-500",
            "Doliprane 500mg",
            ModuleActif::Pharmacie,
            Some("3400930000014"),
            vec![
                conditionnement("plaquette", Plaquette, 800, Some(40), 1, None),
                conditionnement("boite", Boite, 1_500, Some(5), 2, Some("3400930000021")),
            ],
        ),
        product(
            "biere",
            "BIERE-65",
            "Bière 65cl",
            ModuleActif::Depot,
            Some("6001234000017"),
            vec![
                conditionnement("bouteille", Bouteille, 650, Some(48), 1, None),
                conditionnement("casier", Casier, 7_200, Some(3), 12, Some("6001234000024")),
            ],
        ),
        product(
            "savon",
            "SAV-MARS",
            "Savon de Marseille",
            ModuleActif::Boutique,
            Some("3020000000015"),
            vec![
                conditionnement("unite", Unite, 500, Some(30), 1, None),
                conditionnement("carton", Carton, 5_400, Some(2), 12, None),
            ],
        ),
        product(
            "thieb",
            "PLAT-01",
            "Thiéboudienne",
            ModuleActif::Restaurant,
            None,
            vec![conditionnement("portion", Portion, 2_500, None, 1, None)],
        ),
    ]
}

fn sample_users() -> Vec<(User, &'static str)> {
    vec![
        (
            User {
                id: "u-awa".to_string(),
                username: "awa".to_string(),
                full_name: Some("Awa Diop".to_string()),
                role: Role::Cashier,
                modules: vec![ModuleActif::Pharmacie, ModuleActif::Boutique],
            },
            "1234",
        ),
        (
            User {
                id: "u-admin".to_string(),
                username: "admin".to_string(),
                full_name: None,
                role: Role::Admin,
                modules: vec![],
            },
            "admin",
        ),
    ]
}

/// A cash vente of two plaquettes of Doliprane, built the way a terminal does.
pub fn sample_vente(device_id: &str) -> Vente {
    let products = sample_products();
    let mut cart = Cart::new();
    cart.add(&products[0], "plaquette", 2)
        .expect("sample product has stock");
    let payment = compute_change(cart.total(), PaymentMethod::Cash, Some(Money::from_minor(2_000)))
        .expect("tendered covers the total");
    let ctx = VenteContext {
        module: ModuleActif::Pharmacie,
        cashier_id: "u-awa".to_string(),
        device_id: device_id.to_string(),
        customer_name: None,
        sequence: 1,
        now: Utc::now(),
    };
    build_vente(&cart, payment, &ctx).expect("non-empty cart")
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    generation: u64,
    exp: i64,
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

fn error(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({ "code": code, "message": message })),
    )
        .into_response()
}

/// Bearer check, then failure injection.
fn guard(state: &FakeState, headers: &HeaderMap) -> Result<(), Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "missing bearer token"))?;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET),
        &Validation::default(),
    )
    .map_err(|_| error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "invalid token"))?
    .claims;

    if claims.generation != state.token_generation.load(Ordering::SeqCst) {
        return Err(error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "token revoked"));
    }

    if FakeState::take_one(&state.failures) {
        return Err(error(
            StatusCode::SERVICE_UNAVAILABLE,
            "UNAVAILABLE",
            "maintenance",
        ));
    }

    Ok(())
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<LoginBody>) -> Response {
    let Some((user, _)) = sample_users()
        .into_iter()
        .find(|(u, pw)| u.username == body.username && *pw == body.password)
    else {
        return error(StatusCode::UNAUTHORIZED, "BAD_CREDENTIALS", "invalid credentials");
    };

    let claims = Claims {
        sub: user.id.clone(),
        generation: state.token_generation.load(Ordering::SeqCst),
        exp: Utc::now().timestamp() + TOKEN_TTL_SECS,
    };
    let token = match encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET)) {
        Ok(token) => token,
        Err(e) => return error(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", &e.to_string()),
    };

    state.logins.fetch_add(1, Ordering::SeqCst);
    Json(serde_json::json!({ "access_token": token, "user": user })).into_response()
}

async fn logout(State(state): State<Arc<FakeState>>) -> StatusCode {
    state.logouts.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

#[derive(Deserialize)]
struct ProductParams {
    module: Option<ModuleActif>,
    q: Option<String>,
    limit: Option<usize>,
}

async fn list_products(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<ProductParams>,
) -> Response {
    if let Err(resp) = guard(&state, &headers) {
        return resp;
    }

    let needle = params.q.map(|q| q.to_lowercase());
    let matching: Vec<Product> = state
        .products
        .lock()
        .await
        .iter()
        .filter(|p| params.module.map_or(true, |m| p.module == m))
        .filter(|p| {
            needle.as_deref().map_or(true, |q| {
                p.name.to_lowercase().contains(q)
                    || p.reference.to_lowercase().contains(q)
                    || p.barcode.as_deref() == Some(q)
            })
        })
        .cloned()
        .collect();

    let total = matching.len();
    let items = matching
        .into_iter()
        .take(params.limit.unwrap_or(50))
        .collect();
    Json(ListResponse { items, total }).into_response()
}

async fn get_product(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(resp) = guard(&state, &headers) {
        return resp;
    }
    match state.products.lock().await.iter().find(|p| p.id == id) {
        Some(p) => Json(p.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "NOT_FOUND", "product not found"),
    }
}

async fn product_by_barcode(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(code): Path<String>,
) -> Response {
    if let Err(resp) = guard(&state, &headers) {
        return resp;
    }
    let products = state.products.lock().await;
    match products.iter().find(|p| p.find_by_barcode(&code).is_some()) {
        Some(p) => Json(p.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "NOT_FOUND", "unknown barcode"),
    }
}

async fn record_vente(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Json(mut vente): Json<Vente>,
) -> Response {
    if let Err(resp) = guard(&state, &headers) {
        return resp;
    }

    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if key != vente.id {
        return error(
            StatusCode::BAD_REQUEST,
            "IDEMPOTENCY_KEY",
            "Idempotency-Key must equal the vente id",
        );
    }

    let mut ventes = state.ventes.lock().await;
    if let Some(existing) = ventes.iter().find(|v| v.id == vente.id) {
        return Json(existing.clone()).into_response();
    }

    {
        let mut products = state.products.lock().await;
        for line in &vente.lines {
            let Some(product) = products.iter().find(|p| p.id == line.product_id) else {
                continue;
            };
            let available = product
                .conditionnement(&line.conditionnement_id)
                .and_then(|c| c.stock);
            if product.tracks_stock() && available.map_or(false, |stock| stock < line.quantity) {
                return error(
                    StatusCode::CONFLICT,
                    "STOCK_CONFLICT",
                    &format!("stock insuffisant pour {}", line.name),
                );
            }
        }
        for line in &vente.lines {
            let Some(product) = products.iter_mut().find(|p| p.id == line.product_id) else {
                continue;
            };
            if !product.tracks_stock() {
                continue;
            }
            if let Some(stock) = product
                .conditionnements
                .iter_mut()
                .find(|c| c.id == line.conditionnement_id)
                .and_then(|c| c.stock.as_mut())
            {
                *stock -= line.quantity;
            }
        }
    }

    vente.status = VenteStatus::Recorded;
    ventes.push(vente.clone());
    drop(ventes);

    if FakeState::take_one(&state.dropped_responses) {
        return error(StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", "gateway lost the response");
    }
    (StatusCode::CREATED, Json(vente)).into_response()
}

#[derive(Deserialize)]
struct VenteParams {
    limit: Option<usize>,
}

async fn list_ventes(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<VenteParams>,
) -> Response {
    if let Err(resp) = guard(&state, &headers) {
        return resp;
    }
    let ventes = state.ventes.lock().await;
    let items = ventes
        .iter()
        .rev()
        .take(params.limit.unwrap_or(50))
        .cloned()
        .collect();
    Json(ListResponse {
        items,
        total: ventes.len(),
    })
    .into_response()
}

#[derive(Deserialize)]
struct SummaryParams {
    date: NaiveDate,
}

async fn daily_summary(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(params): Query<SummaryParams>,
) -> Response {
    if let Err(resp) = guard(&state, &headers) {
        return resp;
    }

    let ventes = state.ventes.lock().await;
    let day: Vec<&Vente> = ventes
        .iter()
        .filter(|v| v.status != VenteStatus::Voided && v.created_at.date_naive() == params.date)
        .collect();

    let mut per_method: HashMap<PaymentMethod, (i64, Money)> = HashMap::new();
    for v in &day {
        let entry = per_method.entry(v.payment.method).or_default();
        entry.0 += 1;
        entry.1 += v.total;
    }
    let by_method = [PaymentMethod::Cash, PaymentMethod::MobileMoney, PaymentMethod::Card]
        .into_iter()
        .filter_map(|method| {
            per_method.get(&method).map(|(count, amount)| MethodTotal {
                method,
                count: *count,
                amount: *amount,
            })
        })
        .collect();

    Json(DailySummary {
        date: params.date,
        sale_count: day.len() as i64,
        revenue: day.iter().map(|v| v.total).sum(),
        by_method,
    })
    .into_response()
}

// =============================================================================
// Server
// =============================================================================

/// A running fake backend.
pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

impl FakeBackend {
    /// Binds a random local port and serves the fake backend on it.
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::new());

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/logout", post(logout))
            .route("/api/produits", get(list_products))
            .route("/api/produits/barcode/{code}", get(product_by_barcode))
            .route("/api/produits/{id}", get(get_product))
            .route("/api/ventes", get(list_ventes).post(record_vente))
            .route("/api/ventes/resume", get(daily_summary))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend server");
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Client config pointing here, with millisecond backoff.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::with_base_url(self.base_url.clone());
        config.device.id = "test-device".to_string();
        config.retry.max_retries = 3;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_ms = 5;
        config
    }

    pub fn client(&self) -> BackendClient {
        BackendClient::new(self.config()).expect("fake backend config is valid")
    }

    /// A client already logged in as `awa`.
    pub async fn logged_in_client(&self) -> BackendClient {
        let client = self.client();
        client
            .auth()
            .login("awa", "1234")
            .await
            .expect("fake backend login");
        client
    }
}
