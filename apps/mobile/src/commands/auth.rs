//! # Auth Commands
//!
//! ## Session Lifecycle
//! ```text
//! ┌──────────┐  login   ┌──────────────┐  switch_module  ┌──────────────┐
//! │ Logged   │─────────►│ Module actif │────────────────►│ Other module │
//! │ out      │          │ (default)    │◄────────────────│ (if allowed) │
//! └──────────┘          └──────┬───────┘                 └──────┬───────┘
//!      ▲                       │ logout                         │
//!      └───────────────────────┴────────────────────────────────┘
//!          cart and catalogue cleared, pending ventes kept
//! ```

use caisse_core::validation::{validate_password, validate_username};
use caisse_core::{ModuleActif, Theme, User, Vocabulary};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CommandError, CommandResult};
use crate::state::{ApiState, CartState, CatalogState, ConfigState, Session, SessionState};

/// What the shell needs after login or a module switch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub user: User,
    pub display_name: String,
    pub module: ModuleActif,
    /// Modules the user may switch to.
    pub modules: Vec<ModuleActif>,
    pub theme: Theme,
    pub vocabulary: Vocabulary,
    /// Seconds until the token must be renewed, when known.
    pub expires_in_secs: Option<i64>,
}

impl SessionInfo {
    fn new(session: Session, expires_in_secs: Option<i64>) -> Self {
        let modules = ModuleActif::ALL
            .into_iter()
            .filter(|m| session.user.can_use(*m))
            .collect();
        SessionInfo {
            display_name: session.user.display_name().to_string(),
            modules,
            theme: session.module.theme(),
            vocabulary: session.module.vocabulary(),
            module: session.module,
            user: session.user,
            expires_in_secs,
        }
    }
}

/// Logs the cashier in and opens a session in the configured module.
pub async fn login(
    api: &ApiState,
    session: &SessionState,
    config: &ConfigState,
    username: &str,
    password: &str,
) -> CommandResult<SessionInfo> {
    let username = validate_username(username)?;
    validate_password(password)?;
    debug!(user = %username, "login command");

    let user = api.client().auth().login(&username, password).await?;
    let started = session.start(user, config.default_module);

    let expires = api
        .client()
        .auth()
        .current_token()
        .await
        .and_then(|t| t.remaining_secs());
    Ok(SessionInfo::new(started, expires))
}

/// Logs out and forgets the cart and the catalogue cache.
///
/// Pending ventes stay queued for the next cashier.
pub async fn logout(
    api: &ApiState,
    session: &SessionState,
    cart: &CartState,
    catalog: &CatalogState,
) -> CommandResult<()> {
    debug!("logout command");
    api.client().auth().logout().await?;
    session.clear();
    cart.with_cart_mut(|c| c.clear());
    catalog.clear();
    info!("Session closed");
    Ok(())
}

/// The open session, `None` when logged out or the token expired.
pub async fn current_session(
    api: &ApiState,
    session: &SessionState,
) -> CommandResult<Option<SessionInfo>> {
    let Some(current) = session.current() else {
        return Ok(None);
    };
    let auth = api.client().auth();
    if !auth.is_authenticated().await && !auth.can_renew().await {
        return Ok(None);
    }
    let expires = auth.current_token().await.and_then(|t| t.remaining_secs());
    Ok(Some(SessionInfo::new(current, expires)))
}

/// Switches the module actif.
///
/// ## Errors
/// - `MODULE_NOT_ALLOWED` when the user has no access to `module`
/// - `CART_ERROR` when the cart still holds lines of the current module
pub async fn switch_module(
    api: &ApiState,
    session: &SessionState,
    cart: &CartState,
    catalog: &CatalogState,
    module: ModuleActif,
) -> CommandResult<SessionInfo> {
    debug!(module = %module, "switch_module command");

    let current = super::require_session(session)?;
    if current.module != module && !cart.with_cart(|c| c.is_empty()) {
        return Err(CommandError::cart(format!(
            "Terminez ou videz le {} avant de changer de module",
            current.module.vocabulary().cart_title.to_lowercase()
        )));
    }

    let switched = session
        .switch_module(module)
        .ok_or_else(CommandError::not_authenticated)??;
    if catalog.module() != Some(module) {
        catalog.clear();
    }

    let expires = api
        .client()
        .auth()
        .current_token()
        .await
        .and_then(|t| t.remaining_secs());
    Ok(SessionInfo::new(switched, expires))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::App;
    use caisse_api::testing::FakeBackend;

    #[tokio::test]
    async fn test_login_opens_session_in_allowed_module() {
        let backend = FakeBackend::start().await;
        let app = App::for_backend(&backend);

        let info = login(&app.api, &app.session, &app.config, "awa", "1234")
            .await
            .unwrap();
        // Default module is boutique, which awa may use.
        assert_eq!(info.module, ModuleActif::Boutique);
        assert_eq!(info.modules, vec![ModuleActif::Pharmacie, ModuleActif::Boutique]);
        assert_eq!(info.display_name, "Awa Diop");
        assert_eq!(info.vocabulary.cart_title, "Panier");
        assert!(info.expires_in_secs.is_some());
    }

    #[tokio::test]
    async fn test_login_validation_and_bad_credentials() {
        let backend = FakeBackend::start().await;
        let app = App::for_backend(&backend);

        let err = login(&app.api, &app.session, &app.config, " ", "1234")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = login(&app.api, &app.session, &app.config, "awa", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert!(app.session.current().is_none());
        assert_eq!(backend.state.logins(), 0);
    }

    #[tokio::test]
    async fn test_switch_module() {
        let backend = FakeBackend::start().await;
        let app = App::for_backend(&backend);
        login(&app.api, &app.session, &app.config, "awa", "1234")
            .await
            .unwrap();

        let err = switch_module(&app.api, &app.session, &app.cart, &app.catalog, ModuleActif::Depot)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ModuleNotAllowed);

        let info = switch_module(
            &app.api,
            &app.session,
            &app.cart,
            &app.catalog,
            ModuleActif::Pharmacie,
        )
        .await
        .unwrap();
        assert_eq!(info.theme.title, "Pharmacie");
        assert_eq!(info.vocabulary.sale_label, "Délivrance");
    }

    #[tokio::test]
    async fn test_logout_clears_state() {
        let backend = FakeBackend::start().await;
        let app = App::for_backend(&backend);
        login(&app.api, &app.session, &app.config, "awa", "1234")
            .await
            .unwrap();

        logout(&app.api, &app.session, &app.cart, &app.catalog)
            .await
            .unwrap();
        assert!(current_session(&app.api, &app.session).await.unwrap().is_none());
        assert_eq!(backend.state.logouts(), 1);
    }
}
