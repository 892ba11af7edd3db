//! # Commands Module
//!
//! All commands exposed to the mobile shell and the `caisse` CLI.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports, session guard)
//! ├── auth.rs     ◄─── Login, logout, module switching
//! ├── config.rs   ◄─── Configuration and theme retrieval
//! ├── product.rs  ◄─── Search, barcode scan, catalogue refresh
//! ├── cart.rs     ◄─── Cart manipulation
//! └── sale.rs     ◄─── Change, checkout, pending ventes, reports
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  Mobile shell                                                           │
//! │  ────────────                                                           │
//! │  const cart = await invoke('add_to_cart', {                             │
//! │    productId: 'biere', conditionnementId: 'casier', quantity: 2         │
//! │  });                                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Rust layer                                                             │
//! │  ──────────                                                             │
//! │  async fn add_to_cart(                                                  │
//! │      api: &ApiState,          ◄── only the state it needs              │
//! │      session: &SessionState,                                            │
//! │      catalog: &CatalogState,                                            │
//! │      cart: &CartState,                                                  │
//! │      config: &ConfigState,                                              │
//! │      request: AddToCartRequest,                                         │
//! │  ) -> CommandResult<CartResponse>                                       │
//! │         │                                                               │
//! │         │ (JSON serialization)                                          │
//! │         ▼                                                               │
//! │  Shell receives: CartResponse                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod cart;
pub mod config;
pub mod product;
pub mod sale;

use crate::error::{CommandError, CommandResult};
use crate::state::{Session, SessionState};

/// The current session, or `NOT_AUTHENTICATED`.
pub(crate) fn require_session(session: &SessionState) -> CommandResult<Session> {
    session.current().ok_or_else(CommandError::not_authenticated)
}
