//! # Command Error Type
//!
//! Unified error type for the commands the mobile shell calls.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Caisse POS                             │
//! │                                                                         │
//! │  Shell                       Rust layer                                 │
//! │  ─────                       ──────────                                 │
//! │                                                                         │
//! │  invoke('add_to_cart')                                                  │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, CommandError>                                         │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Backend Error? ─── ClientError::Conflict("...") ───┐           │  │
//! │  │         │                                           │           │  │
//! │  │         ▼                                           ▼           │  │
//! │  │  Cart Rule? ─── CoreError::InsufficientStock ── CommandError ──►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  catch (e) {                                                            │
//! │    // e.code = "INSUFFICIENT_STOCK"                                     │
//! │    // e.message = "Stock insuffisant pour Bière 65cl (Casier): 3 ..."   │
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use caisse_api::ClientError;
use caisse_core::{CoreError, ValidationError};
use serde::Serialize;
use thiserror::Error;

/// Error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Stock insuffisant pour Bière 65cl (Casier): 3 disponible(s), 5 demandé(s)"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct CommandError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Message shown to the cashier
    pub message: String,
}

/// Error codes for command responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    ValidationError,
    InsufficientStock,
    CartError,
    PaymentError,

    /// The user has no access to the module.
    ModuleNotAllowed,
    /// The product belongs to another module than the active one.
    WrongModule,

    /// No session, or the session could not be renewed.
    NotAuthenticated,
    Forbidden,

    /// The backend refused the change (e.g. stock sold elsewhere).
    Conflict,
    /// Backend unreachable or failing; the action can be retried.
    Offline,
    /// Backend answered something unexpected.
    BackendError,

    ConfigError,
    Internal,
}

pub type CommandResult<T> = Result<T, CommandError>;

impl CommandError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        CommandError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        CommandError::new(ErrorCode::NotFound, format!("{} introuvable : {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CommandError::new(ErrorCode::ValidationError, message)
    }

    pub fn cart(message: impl Into<String>) -> Self {
        CommandError::new(ErrorCode::CartError, message)
    }

    pub fn not_authenticated() -> Self {
        CommandError::new(ErrorCode::NotAuthenticated, "Veuillez vous connecter")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CommandError::new(ErrorCode::Internal, message)
    }
}

/// Converts cart and checkout rule violations.
impl From<CoreError> for CommandError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => CommandError::not_found("Produit", &id),
            CoreError::ConditionnementNotFound {
                product_id,
                conditionnement_id,
            } => CommandError::new(
                ErrorCode::NotFound,
                format!(
                    "Conditionnement {} introuvable pour {}",
                    conditionnement_id, product_id
                ),
            ),
            CoreError::ProductInactive(name) => CommandError::new(
                ErrorCode::CartError,
                format!("{} n'est plus en vente", name),
            ),
            CoreError::InsufficientStock {
                product,
                conditionnement,
                available,
                requested,
            } => CommandError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Stock insuffisant pour {} ({}): {} disponible(s), {} demandé(s)",
                    product, conditionnement, available, requested
                ),
            ),
            CoreError::LineNotInCart(key) => {
                CommandError::cart(format!("Ligne absente du panier : {}", key))
            }
            CoreError::CartTooLarge { max } => {
                CommandError::cart(format!("Le panier est limité à {} lignes", max))
            }
            CoreError::QuantityTooLarge { requested, max } => CommandError::validation(format!(
                "Quantité {} supérieure au maximum autorisé ({})",
                requested, max
            )),
            CoreError::EmptyCart => CommandError::cart("Le panier est vide"),
            CoreError::InsufficientPayment { total, tendered } => CommandError::new(
                ErrorCode::PaymentError,
                format!("Montant reçu insuffisant : {} pour un total de {}", tendered, total),
            ),
            CoreError::ModuleNotAllowed(module) => CommandError::new(
                ErrorCode::ModuleNotAllowed,
                format!("Module {} non autorisé pour cet utilisateur", module),
            ),
            CoreError::Validation(e) => CommandError::from(e),
        }
    }
}

impl From<ValidationError> for CommandError {
    fn from(err: ValidationError) -> Self {
        CommandError::validation(err.to_string())
    }
}

/// Converts backend call failures.
impl From<ClientError> for CommandError {
    fn from(err: ClientError) -> Self {
        if err.is_auth_error() {
            return CommandError::new(ErrorCode::NotAuthenticated, err.to_string());
        }
        if err.is_retryable() {
            tracing::warn!(error = %err, "Backend unavailable");
            return CommandError::new(ErrorCode::Offline, "Serveur injoignable, réessayez");
        }
        if err.is_config_error() {
            return CommandError::new(ErrorCode::ConfigError, err.to_string());
        }

        match err {
            ClientError::NotFound(message) => CommandError::new(ErrorCode::NotFound, message),
            ClientError::Forbidden(message) => CommandError::new(ErrorCode::Forbidden, message),
            ClientError::Conflict(message) => CommandError::new(ErrorCode::Conflict, message),
            ClientError::Rejected { message, .. } => CommandError::validation(message),
            ClientError::InvalidRequest(message) => CommandError::validation(message),
            other => {
                tracing::error!(error = %other, "Unexpected backend response");
                CommandError::new(ErrorCode::BackendError, other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_core::Money;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err = CommandError::from(CoreError::InsufficientStock {
            product: "Bière 65cl".into(),
            conditionnement: "Casier".into(),
            available: 3,
            requested: 5,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("3 disponible"));

        let err = CommandError::from(CoreError::InsufficientPayment {
            total: Money::from_minor(3_750),
            tendered: Money::from_minor(2_000),
        });
        assert_eq!(err.code, ErrorCode::PaymentError);

        assert_eq!(CommandError::from(CoreError::EmptyCart).code, ErrorCode::CartError);
    }

    #[test]
    fn test_client_errors_map_to_codes() {
        assert_eq!(
            CommandError::from(ClientError::Timeout).code,
            ErrorCode::Offline
        );
        assert_eq!(
            CommandError::from(ClientError::SessionExpired).code,
            ErrorCode::NotAuthenticated
        );
        assert_eq!(
            CommandError::from(ClientError::from_status(409, "stock")).code,
            ErrorCode::Conflict
        );
        assert_eq!(
            CommandError::from(ClientError::from_status(422, "bad")).code,
            ErrorCode::ValidationError
        );
        assert_eq!(
            CommandError::from(ClientError::InvalidRequest("id".into())).code,
            ErrorCode::ValidationError
        );
    }

    #[test]
    fn test_serialized_shape() {
        let err = CommandError::cart("Le panier est vide");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "CART_ERROR");
        assert_eq!(json["message"], "Le panier est vide");
    }
}
