//! # Session Authentication
//!
//! Logs the cashier in against the backend and keeps the bearer token in
//! memory until it expires or the cashier logs out.
//!
//! ## Authentication Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Authentication Flow                        │
//! │                                                                         │
//! │  ┌────────────────┐                       ┌─────────────────┐          │
//! │  │  Terminal      │                       │  Backend        │          │
//! │  └───────┬────────┘                       └────────┬────────┘          │
//! │          │  1. POST /api/auth/login                 │                   │
//! │          │     {username, password}                 │                   │
//! │          │─────────────────────────────────────────►│                   │
//! │          │  2. {access_token, expires_in?, user}    │                   │
//! │          │◄─────────────────────────────────────────│                   │
//! │          │                                          │                   │
//! │          │  expiry = expires_in, else JWT `exp`     │                   │
//! │          │                                          │                   │
//! │          │  [Later: token within refresh margin]    │                   │
//! │          │                                          │                   │
//! │          │  3. POST /api/auth/login (kept creds)    │                   │
//! │          │─────────────────────────────────────────►│                   │
//! │          │                                          │                   │
//! │          │  4. POST /api/auth/logout                │                   │
//! │          │─────────────────────────────────────────►│                   │
//! │          │     token + credentials dropped          │                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The token's signature is never checked here: only the backend holds the
//! key. The `exp` claim is read to know when to renew.

use caisse_core::User;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Token Info
// =============================================================================

/// Token information stored after login.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// The bearer token.
    pub access_token: String,
    /// When the token expires. `None` when neither `expires_in` nor a
    /// JWT `exp` claim was available.
    pub expires_at: Option<DateTime<Utc>>,
    /// The logged-in user.
    pub user: User,
}

impl TokenInfo {
    /// Check if the token expires within `margin`.
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => {
                let margin = ChronoDuration::from_std(margin).unwrap_or_else(|_| ChronoDuration::zero());
                Utc::now() + margin >= expires_at
            }
            None => false,
        }
    }

    /// Check if the token is completely expired (no grace period).
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Get remaining valid time in seconds, if known.
    pub fn remaining_secs(&self) -> Option<i64> {
        self.expires_at
            .map(|at| (at - Utc::now()).num_seconds().max(0))
    }
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Clone, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Body of a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct ExpClaim {
    exp: i64,
}

/// Reads the `exp` claim of a JWT without verifying its signature.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpClaim>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    Utc.timestamp_opt(data.claims.exp, 0).single()
}

/// Expiry from `expires_in` when given, otherwise from the token itself.
fn resolve_expiry(response: &LoginResponse) -> Option<DateTime<Utc>> {
    match response.expires_in {
        Some(secs) => Some(Utc::now() + ChronoDuration::seconds(secs as i64)),
        None => jwt_expiry(&response.access_token),
    }
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

// =============================================================================
// Auth
// =============================================================================

/// Session manager shared by every backend call.
pub struct Auth {
    http: reqwest::Client,
    base_url: Url,
    refresh_margin: Duration,
    token: RwLock<Option<TokenInfo>>,
    /// Kept in memory only, to renew the session without prompting.
    credentials: RwLock<Option<Credentials>>,
}

impl Auth {
    pub fn new(http: reqwest::Client, base_url: Url, refresh_margin: Duration) -> Self {
        Self {
            http,
            base_url,
            refresh_margin,
            token: RwLock::new(None),
            credentials: RwLock::new(None),
        }
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        crate::client::join_path(&self.base_url, &["api", "auth", path])
    }

    /// Logs in and caches the token.
    ///
    /// ## Errors
    /// - `Unauthorized` on wrong credentials
    /// - transport errors as usual
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<User> {
        let token = self.do_login(username, password).await?;
        let user = token.user.clone();

        info!(
            user = %user.username,
            expires_in_secs = ?token.remaining_secs(),
            "Logged in"
        );

        *self.token.write().await = Some(token);
        *self.credentials.write().await = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });

        Ok(user)
    }

    /// Returns a valid bearer token, logging in again if it is about to expire.
    ///
    /// ## Flow
    /// 1. Cached token outside the refresh margin: use it
    /// 2. Otherwise, log in again with the kept credentials
    /// 3. No credentials: `NotAuthenticated` or `SessionExpired`
    pub async fn token(&self) -> ClientResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if !token.needs_refresh(self.refresh_margin) {
                    debug!(remaining_secs = ?token.remaining_secs(), "Using cached token");
                    return Ok(token.access_token.clone());
                }
            }
        }

        let mut guard = self.token.write().await;

        // Double-check after acquiring write lock
        let had_token = match guard.as_ref() {
            Some(token) if !token.needs_refresh(self.refresh_margin) => {
                return Ok(token.access_token.clone());
            }
            Some(_) => true,
            None => false,
        };

        let credentials = self.credentials.read().await.clone();
        let Some(credentials) = credentials else {
            return Err(if had_token {
                ClientError::SessionExpired
            } else {
                ClientError::NotAuthenticated
            });
        };

        let fresh = self
            .do_login(&credentials.username, &credentials.password)
            .await?;
        info!(user = %fresh.user.username, "Session renewed");
        let access_token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(access_token)
    }

    /// Drops the cached token after the backend rejected it.
    ///
    /// Credentials are kept, so the next call logs in again.
    pub async fn invalidate(&self) {
        debug!("Invalidating cached token");
        *self.token.write().await = None;
    }

    /// Logs out on the backend (best effort) and forgets the session.
    pub async fn logout(&self) -> ClientResult<()> {
        let token = self
            .token
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone());

        if let Some(access_token) = token {
            if let Err(e) = self.do_logout(&access_token).await {
                warn!(error = %e, "Failed to log out on server");
            }
        }

        *self.token.write().await = None;
        *self.credentials.write().await = None;
        info!("Logged out");

        Ok(())
    }

    /// The logged-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.token.read().await.as_ref().map(|t| t.user.clone())
    }

    /// Get current token info (without triggering renewal).
    pub async fn current_token(&self) -> Option<TokenInfo> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_expired())
    }

    /// Whether a rejected token can be replaced without the cashier.
    pub async fn can_renew(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    async fn do_login(&self, username: &str, password: &str) -> ClientResult<TokenInfo> {
        let url = self.endpoint("login")?;
        debug!(%url, user = %username, "Logging in");

        let resp = self
            .http
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), &body));
        }

        let login: LoginResponse = resp
            .json()
            .await
            .map_err(|e| ClientError::Decode(format!("login response: {}", e)))?;

        let expires_at = resolve_expiry(&login);
        if expires_at.is_none() {
            warn!("Login response carries no expiry, token kept until rejected");
        }

        Ok(TokenInfo {
            access_token: login.access_token,
            expires_at,
            user: login.user,
        })
    }

    async fn do_logout(&self, access_token: &str) -> ClientResult<()> {
        let resp = self
            .http
            .post(self.endpoint("logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status.as_u16(), &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caisse_core::Role;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn user() -> User {
        User {
            id: "u1".to_string(),
            username: "awa".to_string(),
            full_name: None,
            role: Role::Cashier,
            modules: vec![],
        }
    }

    fn token_expiring_in(secs: i64) -> TokenInfo {
        TokenInfo {
            access_token: "t".to_string(),
            expires_at: Some(Utc::now() + ChronoDuration::seconds(secs)),
            user: user(),
        }
    }

    #[test]
    fn test_token_needs_refresh() {
        let token = token_expiring_in(30);
        assert!(token.needs_refresh(Duration::from_secs(60)));
        assert!(!token.is_expired());
    }

    #[test]
    fn test_token_no_refresh_needed() {
        let token = token_expiring_in(3600);
        assert!(!token.needs_refresh(Duration::from_secs(60)));
        assert!(token.remaining_secs().unwrap() > 3500);
    }

    #[test]
    fn test_token_without_expiry_never_refreshes() {
        let token = TokenInfo {
            access_token: "t".to_string(),
            expires_at: None,
            user: user(),
        };
        assert!(!token.needs_refresh(Duration::from_secs(60)));
        assert!(!token.is_expired());
        assert!(token.remaining_secs().is_none());
    }

    #[test]
    fn test_jwt_expiry_ignores_signature() {
        #[derive(Serialize)]
        struct Claims {
            sub: String,
            exp: i64,
        }
        let exp = Utc::now().timestamp() + 900;
        let jwt = encode(
            &Header::default(),
            &Claims {
                sub: "u1".to_string(),
                exp,
            },
            &EncodingKey::from_secret(b"backend-only-secret"),
        )
        .unwrap();

        assert_eq!(jwt_expiry(&jwt).unwrap().timestamp(), exp);
        assert!(jwt_expiry("opaque-token").is_none());
    }

    #[test]
    fn test_expires_in_wins_over_jwt() {
        let response = LoginResponse {
            access_token: "opaque-token".to_string(),
            expires_in: Some(600),
            user: user(),
        };
        let at = resolve_expiry(&response).unwrap();
        let remaining = (at - Utc::now()).num_seconds();
        assert!((595..=600).contains(&remaining));
    }
}
