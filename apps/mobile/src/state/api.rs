//! # Backend State
//!
//! Wraps the shared [`BackendClient`]. The client is internally
//! reference-counted and thread-safe, so no extra locking is needed.

use caisse_api::{BackendClient, ClientConfig, ClientResult};

pub struct ApiState {
    client: BackendClient,
}

impl ApiState {
    pub fn new(client: BackendClient) -> Self {
        ApiState { client }
    }

    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self::new(BackendClient::new(config)?))
    }

    /// Returns a reference to the backend client.
    pub fn client(&self) -> &BackendClient {
        &self.client
    }

    /// Identifier printed on every vente from this terminal.
    pub fn device_id(&self) -> &str {
        self.client.config().device_id()
    }
}
