//! # Session State
//!
//! Who is logged in on this terminal and which module actif they work in.
//! The token itself stays in [`caisse_api::Auth`].

use std::sync::RwLock;

use caisse_core::{CoreError, CoreResult, ModuleActif, User};
use serde::Serialize;
use tracing::info;

/// The logged-in cashier and their module actif.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: User,
    pub module: ModuleActif,
}

#[derive(Debug, Default)]
pub struct SessionState {
    current: RwLock<Option<Session>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a session in `preferred` when the user may use it, otherwise
    /// in the first module they have access to.
    pub fn start(&self, user: User, preferred: ModuleActif) -> Session {
        let module = if user.can_use(preferred) {
            preferred
        } else {
            ModuleActif::ALL
                .into_iter()
                .find(|m| user.can_use(*m))
                .unwrap_or(preferred)
        };

        info!(user = %user.username, module = %module, "Session started");
        let session = Session { user, module };
        *self.write() = Some(session.clone());
        session
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    pub fn module(&self) -> Option<ModuleActif> {
        self.read().as_ref().map(|s| s.module)
    }

    pub fn user(&self) -> Option<User> {
        self.read().as_ref().map(|s| s.user.clone())
    }

    /// Changes the module actif.
    ///
    /// ## Errors
    /// - `ModuleNotAllowed` when the user has no access to `module`
    /// - `None` is returned when nobody is logged in
    pub fn switch_module(&self, module: ModuleActif) -> Option<CoreResult<Session>> {
        let mut guard = self.write();
        let session = guard.as_mut()?;

        if !session.user.can_use(module) {
            return Some(Err(CoreError::ModuleNotAllowed(module.code().to_string())));
        }

        info!(from = %session.module, to = %module, "Module switched");
        session.module = module;
        Some(Ok(session.clone()))
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.current.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.current.write().unwrap_or_else(|e| e.into_inner())
    }
}
