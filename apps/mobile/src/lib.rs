//! # Caisse Mobile Library
//!
//! State and command layer of the Caisse POS mobile app. The mobile shell
//! (or the `caisse` CLI) owns an [`App`] and calls the functions under
//! [`commands`] with the state each one needs.
//!
//! ## Module Organization
//! ```text
//! caisse_mobile/
//! ├── lib.rs          ◄─── You are here (App, tracing setup)
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── api.rs      ◄─── Backend client wrapper
//! │   ├── cart.rs     ◄─── Cart being rung up
//! │   ├── catalog.rs  ◄─── Cached products of the module actif
//! │   ├── config.rs   ◄─── Store and currency settings
//! │   ├── pending.rs  ◄─── Ventes awaiting the backend
//! │   └── session.rs  ◄─── User and module actif
//! ├── commands/       ◄─── auth, config, product, cart, sale
//! ├── receipt.rs      ◄─── Text receipts
//! └── error.rs        ◄─── CommandError for the shell
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. init_tracing()            RUST_LOG, default info,caisse=debug       │
//! │  2. ClientConfig::load_or_default   TOML → CAISSE_* env → defaults      │
//! │  3. ConfigState::from_env     store name, currency, receipt width       │
//! │  4. App::new                  empty session, cart, catalogue, queue     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod receipt;
pub mod state;

use std::path::PathBuf;

use caisse_api::{ClientConfig, ClientResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

use state::{ApiState, CartState, CatalogState, ConfigState, PendingState, SessionState};

/// Every piece of state the commands draw from.
///
/// The fields are independent so a shell can register each one on its own.
pub struct App {
    pub config: ConfigState,
    pub session: SessionState,
    pub cart: CartState,
    pub catalog: CatalogState,
    pub pending: PendingState,
    pub api: ApiState,
}

impl App {
    pub fn new(config: ConfigState, client: ClientConfig) -> ClientResult<Self> {
        let api = ApiState::from_config(client)?;
        Ok(App {
            config,
            session: SessionState::new(),
            cart: CartState::new(),
            catalog: CatalogState::new(),
            pending: PendingState::new(),
            api,
        })
    }

    /// Loads the client config file (or defaults) and store settings from
    /// the environment.
    pub fn from_env(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let client = ClientConfig::load_or_default(config_path);
        let mut config = ConfigState::from_env();
        if std::env::var("CAISSE_MODULE").is_err() {
            config.default_module = client.device.default_module;
        }
        info!(
            server = %client.server.base_url,
            device_id = %client.device_id(),
            module = %config.default_module,
            "Caisse app initialized"
        );
        Self::new(config, client)
    }

    #[cfg(test)]
    pub(crate) fn for_backend(backend: &caisse_api::testing::FakeBackend) -> Self {
        App {
            config: ConfigState::default(),
            session: SessionState::new(),
            cart: CartState::new(),
            catalog: CatalogState::new(),
            pending: PendingState::new(),
            api: ApiState::new(backend.client()),
        }
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=caisse=trace` - Show trace for caisse crates only
/// - Default: `info,caisse=debug`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caisse=debug"));

    // A second call (tests, embedding shells) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
