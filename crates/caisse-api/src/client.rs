//! # Backend Client
//!
//! One `reqwest` client shared by every call, with the bearer token added
//! by [`Auth`] and transient failures retried with exponential backoff.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Request Lifecycle                                │
//! │                                                                         │
//! │  build request ──► auth.token() ──► send ──► status?                   │
//! │                                               │                         │
//! │                        2xx ◄──────────────────┤                         │
//! │                         │                     │ 401, credentials kept   │
//! │                      decode                   ├──► invalidate, resend   │
//! │                                               │    (once)               │
//! │                                               │ 5xx / 429 / network     │
//! │                                               ├──► backoff, resend      │
//! │                                               │    (max_retries)        │
//! │                                               │ other 4xx               │
//! │                                               └──► error                │
//! │                                                                         │
//! │  BACKOFF STRATEGY (Exponential with Jitter)                            │
//! │  300ms → 600ms → 1.2s → ... capped at max_backoff_ms                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Auth;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::products::ProductsApi;
use crate::ventes::VentesApi;

/// Header carrying the terminal id on every request.
pub const DEVICE_HEADER: &str = "x-device-id";

// =============================================================================
// List Response
// =============================================================================

/// Paged list returned by collection endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Appends percent-encoded path segments to `base`.
pub(crate) fn join_path(base: &Url, segments: &[&str]) -> ClientResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

// =============================================================================
// Backend Client
// =============================================================================

/// Client for the remote backend.
///
/// Cheap to clone; clones share the connection pool and the session.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: Url,
    config: Arc<ClientConfig>,
    auth: Arc<Auth>,
}

impl BackendClient {
    /// Creates a client from a validated configuration.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let base_url = config.base_url()?;

        let mut headers = HeaderMap::new();
        let device = HeaderValue::from_str(config.device_id())
            .map_err(|_| ClientError::InvalidConfig("device id is not a valid header value".into()))?;
        headers.insert(DEVICE_HEADER, device);

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(concat!("caisse/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        let auth = Arc::new(Auth::new(
            http.clone(),
            base_url.clone(),
            config.refresh_margin(),
        ));

        debug!(base_url = %base_url, device_id = %config.device_id(), "Backend client created");

        Ok(Self {
            http,
            base_url,
            config: Arc::new(config),
            auth,
        })
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Product catalogue endpoints.
    pub fn products(&self) -> ProductsApi<'_> {
        ProductsApi::new(self)
    }

    /// Vente endpoints.
    pub fn ventes(&self) -> VentesApi<'_> {
        VentesApi::new(self)
    }

    /// URL for `/api/{segments...}`.
    pub(crate) fn api_url(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push("api");
        all.extend_from_slice(segments);
        join_path(&self.base_url, &all)
    }

    /// Sends an authenticated request built by `build` and decodes the JSON body.
    pub(crate) async fn send_json<T, F>(&self, build: F) -> ClientResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let resp = self.execute(build).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Decode(format!("response body: {}", e)))
    }

    /// Sends an authenticated request, retrying what can be retried.
    ///
    /// Returns the response only when its status is a success.
    pub(crate) async fn execute<F>(&self, build: F) -> ClientResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let max_retries = self.config.retry.max_retries;
        let mut backoff = self.create_backoff();
        let mut attempt: u32 = 0;
        let mut renewed = false;

        loop {
            match self.send_once(&build).await {
                Ok(resp) => return Ok(resp),
                Err(ClientError::Unauthorized(msg)) => {
                    if renewed || !self.auth.can_renew().await {
                        return Err(ClientError::Unauthorized(msg));
                    }
                    debug!("Token rejected, renewing session");
                    self.auth.invalidate().await;
                    renewed = true;
                }
                Err(e) if e.is_retryable() && attempt < max_retries => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e);
                    };
                    attempt += 1;
                    warn!(
                        error = %e,
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Backend call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<F>(&self, build: &F) -> ClientResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.auth.token().await?;
        let resp = build(&self.http).bearer_auth(token).send().await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), body = %body, "Backend returned an error");
        Err(ClientError::from_status(status.as_u16(), &body))
    }

    /// Creates the exponential backoff configuration.
    fn create_backoff(&self) -> ExponentialBackoff {
        let retry = &self.config.retry;
        ExponentialBackoff {
            initial_interval: Duration::from_millis(retry.initial_backoff_ms),
            max_interval: Duration::from_millis(retry.max_backoff_ms),
            multiplier: 2.0,
            max_elapsed_time: None, // Bounded by max_retries instead
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[test]
    fn test_join_path_encodes_segments() {
        let base = Url::parse("https://pos.example.com/caisse/").unwrap();
        let url = join_path(&base, &["api", "produits", "barcode", "60 01/2"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://pos.example.com/caisse/api/produits/barcode/60%2001%2F2"
        );

        let base = Url::parse("http://localhost:8080").unwrap();
        let url = join_path(&base, &["api", "ventes"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/ventes");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = ClientConfig::with_base_url("ws://pos.example.com");
        assert!(BackendClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_calls_before_login_are_rejected() {
        let backend = FakeBackend::start().await;
        let client = backend.client();

        let err = client.products().get("doliprane").await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_login_and_logout() {
        let backend = FakeBackend::start().await;
        let client = backend.client();

        let user = client.auth().login("awa", "1234").await.unwrap();
        assert_eq!(user.username, "awa");
        assert!(client.auth().is_authenticated().await);

        let token = client.auth().current_token().await.unwrap();
        assert!(token.expires_at.is_some(), "expiry read from the JWT exp claim");

        client.auth().logout().await.unwrap();
        assert!(!client.auth().is_authenticated().await);
        assert_eq!(backend.state.logouts(), 1);
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let backend = FakeBackend::start().await;
        let client = backend.client();

        let err = client.auth().login("awa", "nope").await.unwrap_err();
        assert!(err.is_auth_error());
        assert!(client.auth().current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_is_renewed_once() {
        let backend = FakeBackend::start().await;
        let client = backend.client();
        client.auth().login("awa", "1234").await.unwrap();

        backend.state.revoke_tokens();
        let product = client.products().get("doliprane").await.unwrap();
        assert_eq!(product.id, "doliprane");
        assert_eq!(backend.state.logins(), 2);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let backend = FakeBackend::start().await;
        let client = backend.client();
        client.auth().login("awa", "1234").await.unwrap();

        backend.state.fail_next_requests(2);
        let product = client.products().get("doliprane").await.unwrap();
        assert_eq!(product.id, "doliprane");
    }

    #[tokio::test]
    async fn test_retries_give_up_after_max_retries() {
        let backend = FakeBackend::start().await;
        let client = backend.client();
        client.auth().login("awa", "1234").await.unwrap();

        backend.state.fail_next_requests(10);
        let err = client.products().get("doliprane").await.unwrap_err();
        assert!(matches!(err, ClientError::Server { status: 503, .. }));
        assert!(err.is_retryable());
    }
}
