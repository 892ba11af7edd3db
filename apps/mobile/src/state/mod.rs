//! # State Module
//!
//! Application state held between commands.
//!
//! ## One State Type per Concern
//! Commands declare exactly the state they need, and independent states
//! don't block each other.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                  │
//! │  │ ConfigState  │  │ SessionState │  │  CartState   │                  │
//! │  │              │  │              │  │              │                  │
//! │  │ store name   │  │ user         │  │ Arc<Mutex<   │                  │
//! │  │ currency     │  │ module actif │  │   Cart       │                  │
//! │  │ receipt width│  │  (RwLock)    │  │ >>           │                  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘                  │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐                  │
//! │  │ CatalogState │  │ PendingState │  │   ApiState   │                  │
//! │  │              │  │              │  │              │                  │
//! │  │ products by  │  │ unsent ventes│  │ BackendClient│                  │
//! │  │ id (RwLock)  │  │ receipt seq  │  │ (shared pool)│                  │
//! │  └──────────────┘  └──────────────┘  └──────────────┘                  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • ConfigState: Read-only after initialization                         │
//! │  • Session/Catalog: RwLock, many readers                               │
//! │  • Cart/Pending: Mutex for exclusive access                            │
//! │  • ApiState: BackendClient is internally synchronized                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod api;
mod cart;
mod catalog;
mod config;
mod pending;
mod session;

pub use api::ApiState;
pub use cart::CartState;
pub use catalog::CatalogState;
pub use config::{ConfigState, SymbolPosition};
pub use pending::PendingState;
pub use session::{Session, SessionState};
