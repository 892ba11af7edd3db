//! # caisse-api: Remote Backend Client for Caisse POS
//!
//! The backend owns inventory, users and sales records. This crate is the
//! only place the terminal talks to it.
//!
//! ## Request Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Backend Access                                 │
//! │                                                                         │
//! │   apps/mobile commands                                                  │
//! │          │                                                              │
//! │          ▼                                                              │
//! │   ┌──────────────────────────────────────────────────────────────┐     │
//! │   │ BackendClient                                                │     │
//! │   │   products() ──► ProductsApi   GET  /api/produits...        │     │
//! │   │   ventes()   ──► VentesApi     POST /api/ventes             │     │
//! │   │                                GET  /api/ventes[/resume]    │     │
//! │   │   auth()     ──► Auth          POST /api/auth/{login,logout}│     │
//! │   └──────────────────────────┬───────────────────────────────────┘     │
//! │                              │ bearer token, x-device-id               │
//! │                              │ retry with backoff on 5xx/429/network   │
//! │                              ▼                                         │
//! │                       Remote backend                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use caisse_api::{BackendClient, ClientConfig, ProductQuery};
//! use caisse_core::ModuleActif;
//!
//! # async fn run() -> caisse_api::ClientResult<()> {
//! let client = BackendClient::new(ClientConfig::load(None)?)?;
//! client.auth().login("awa", "1234").await?;
//!
//! let page = client
//!     .products()
//!     .list(&ProductQuery::for_module(ModuleActif::Pharmacie).search("doli"))
//!     .await?;
//! println!("{} produits", page.total);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod products;
pub mod ventes;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use auth::{Auth, TokenInfo};
pub use client::{BackendClient, ListResponse};
pub use config::{ClientConfig, DeviceConfig, RetrySettings, ServerSettings};
pub use error::{ClientError, ClientResult};
pub use products::ProductQuery;
