//! # Client Error Types
//!
//! Error types for calls to the remote backend.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     HTTP status         │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Connection     │  │  401 Unauthorized       │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  403 Forbidden          │ │
//! │  │  ConfigLoad/Save│  │  Decode         │  │  404 NotFound           │ │
//! │  └─────────────────┘  └─────────────────┘  │  409 Conflict           │ │
//! │                                            │  429 RateLimited        │ │
//! │  ┌─────────────────┐                       │  4xx Rejected           │ │
//! │  │    Session      │                       │  5xx Server             │ │
//! │  │                 │                       └─────────────────────────┘ │
//! │  │  NotAuthenticated                                                   │
//! │  │  SessionExpired │                                                   │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for backend calls.
pub type ClientResult<T> = Result<T, ClientError>;

/// Every way a backend call can fail.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// No login happened yet.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The token expired and no credentials are kept to log in again.
    #[error("Session expired, please log in again")]
    SessionExpired,

    // =========================================================================
    // Transport Errors
    // =========================================================================
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Invalid response: {0}")]
    Decode(String),

    /// Refused before sending: the payload fails a local check.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // =========================================================================
    // HTTP Status Errors
    // =========================================================================
    /// 401: bad credentials or rejected token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403: the user lacks a permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// 409: e.g. stock sold on another terminal in the meantime.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 429
    #[error("Too many requests: {0}")]
    RateLimited(String),

    /// Any other 4xx.
    #[error("Request rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// 5xx
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidUrl(err.to_string())
        } else {
            ClientError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<caisse_core::ValidationError> for ClientError {
    fn from(err: caisse_core::ValidationError) -> Self {
        ClientError::InvalidRequest(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

/// Error body returned by the backend: `{"code": "...", "message": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ClientError {
    /// Maps a non-success HTTP status and its body to an error.
    ///
    /// The body is used as the message; a JSON `message` (or `error`) field
    /// wins when present.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or_else(|| body.trim().to_string());

        match status {
            401 => ClientError::Unauthorized(message),
            403 => ClientError::Forbidden(message),
            404 => ClientError::NotFound(message),
            409 => ClientError::Conflict(message),
            429 => ClientError::RateLimited(message),
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Rejected { status, message },
        }
    }

    // =========================================================================
    // Error Categorization (for retry logic)
    // =========================================================================

    /// Returns true if the same request may succeed when sent again.
    ///
    /// ## Retryable Errors
    /// - Connection failures and timeouts (network issues)
    /// - 5xx server errors
    /// - 429 rate limiting
    ///
    /// ## Non-Retryable Errors
    /// - Configuration errors
    /// - Any other 4xx (the request itself is wrong)
    /// - Decoding failures
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::Connection(_)
                | ClientError::Timeout
                | ClientError::Server { .. }
                | ClientError::RateLimited(_)
        )
    }

    /// Returns true if the user has to log in (again).
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            ClientError::NotAuthenticated
                | ClientError::SessionExpired
                | ClientError::Unauthorized(_)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            ClientError::from_status(401, "bad token"),
            ClientError::Unauthorized(m) if m == "bad token"
        ));
        assert!(matches!(ClientError::from_status(404, ""), ClientError::NotFound(_)));
        assert!(matches!(ClientError::from_status(409, ""), ClientError::Conflict(_)));
        assert!(matches!(
            ClientError::from_status(503, "maintenance"),
            ClientError::Server { status: 503, .. }
        ));
        assert!(matches!(
            ClientError::from_status(422, ""),
            ClientError::Rejected { status: 422, .. }
        ));
    }

    #[test]
    fn test_json_message_is_extracted() {
        let err = ClientError::from_status(409, r#"{"code":"STOCK","message":"Stock épuisé"}"#);
        assert_eq!(err.to_string(), "Conflict: Stock épuisé");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ClientError::Connection("refused".into()).is_retryable());
        assert!(ClientError::Timeout.is_retryable());
        assert!(ClientError::from_status(502, "").is_retryable());
        assert!(ClientError::from_status(429, "").is_retryable());

        assert!(!ClientError::from_status(400, "").is_retryable());
        assert!(!ClientError::from_status(401, "").is_retryable());
        assert!(!ClientError::from_status(409, "").is_retryable());
        assert!(!ClientError::InvalidConfig("x".into()).is_retryable());
    }

    #[test]
    fn test_auth_errors() {
        assert!(ClientError::NotAuthenticated.is_auth_error());
        assert!(ClientError::SessionExpired.is_auth_error());
        assert!(ClientError::from_status(401, "").is_auth_error());
        assert!(!ClientError::from_status(403, "").is_auth_error());
        assert!(ClientError::InvalidUrl("x".into()).is_config_error());
    }

    #[test]
    fn test_invalid_request_is_final() {
        let err = ClientError::from(caisse_core::validation::validate_uuid("123").unwrap_err());
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert!(!err.is_retryable());
        assert!(!err.is_auth_error());
        assert!(!err.is_config_error());
    }
}
