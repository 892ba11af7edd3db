//! # Vente Endpoints
//!
//! ```text
//! POST /api/ventes                     Idempotency-Key: {vente.id}  → Vente
//! GET  /api/ventes?limit=              → {items, total}
//! GET  /api/ventes/resume?date=        → DailySummary
//! ```
//!
//! The vente id is generated on the terminal before the first attempt, so a
//! vente sent twice after a lost response is recorded once.

use caisse_core::validation::validate_uuid;
use caisse_core::{DailySummary, Vente};
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::client::{BackendClient, ListResponse};
use crate::error::ClientResult;

/// Header the backend deduplicates vente submissions on.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Vente endpoints, see [`BackendClient::ventes`].
pub struct VentesApi<'a> {
    client: &'a BackendClient,
}

impl<'a> VentesApi<'a> {
    pub(crate) fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Records a vente. Returns the vente as stored by the backend.
    ///
    /// The vente id doubles as the idempotency key and must be a UUID.
    pub async fn record(&self, vente: &Vente) -> ClientResult<Vente> {
        validate_uuid(&vente.id)?;
        let url = self.client.api_url(&["ventes"])?;
        debug!(
            vente_id = %vente.id,
            receipt = %vente.receipt_number,
            total = %vente.total,
            lines = vente.lines.len(),
            "Recording vente"
        );

        let stored: Vente = self
            .client
            .send_json(|http| {
                http.post(url.clone())
                    .header(IDEMPOTENCY_HEADER, vente.id.as_str())
                    .json(vente)
            })
            .await?;

        info!(vente_id = %stored.id, status = ?stored.status, "Vente recorded");
        Ok(stored)
    }

    /// Most recent ventes first.
    pub async fn recent(&self, limit: usize) -> ClientResult<ListResponse<Vente>> {
        let url = self.client.api_url(&["ventes"])?;
        let limit = limit.to_string();
        self.client
            .send_json(|http| http.get(url.clone()).query(&[("limit", limit.as_str())]))
            .await
    }

    /// Totals for one day.
    pub async fn daily_summary(&self, date: NaiveDate) -> ClientResult<DailySummary> {
        let url = self.client.api_url(&["ventes", "resume"])?;
        let date = date.format("%Y-%m-%d").to_string();
        self.client
            .send_json(|http| http.get(url.clone()).query(&[("date", date.as_str())]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::{sample_vente, FakeBackend};
    use caisse_core::{PaymentMethod, VenteStatus};
    use chrono::Utc;

    #[tokio::test]
    async fn test_record_vente() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let vente = sample_vente("tab-01");
        let stored = client.ventes().record(&vente).await.unwrap();
        assert_eq!(stored.id, vente.id);
        assert_eq!(stored.status, VenteStatus::Recorded);
        assert_eq!(backend.state.recorded_ventes().await, 1);
    }

    #[tokio::test]
    async fn test_record_is_idempotent_across_retries() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;
        let vente = sample_vente("tab-01");

        // First submission is stored but its response is lost.
        backend.state.drop_next_responses(1);
        let stored = client.ventes().record(&vente).await.unwrap();
        assert_eq!(stored.id, vente.id);

        // Manual resubmission of the same vente.
        client.ventes().record(&vente).await.unwrap();
        assert_eq!(backend.state.recorded_ventes().await, 1);
    }

    #[tokio::test]
    async fn test_record_refuses_non_uuid_id() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let mut vente = sample_vente("tab-01");
        vente.id = "vente-42".to_string();
        let err = client.ventes().record(&vente).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidRequest(_)));
        assert_eq!(backend.state.recorded_ventes().await, 0);
    }

    #[tokio::test]
    async fn test_record_conflicts_when_stock_sold_elsewhere() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;
        backend.state.set_stock("doliprane", "plaquette", 1).await;

        let err = client.ventes().record(&sample_vente("tab-01")).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict(_)));
        assert!(!err.is_retryable());
        assert_eq!(backend.state.recorded_ventes().await, 0);
    }

    #[tokio::test]
    async fn test_recent_newest_first() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let first = sample_vente("tab-01");
        let second = sample_vente("tab-01");
        client.ventes().record(&first).await.unwrap();
        client.ventes().record(&second).await.unwrap();

        let page = client.ventes().recent(1).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, second.id);
    }

    #[tokio::test]
    async fn test_daily_summary() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let vente = sample_vente("tab-01");
        client.ventes().record(&vente).await.unwrap();

        let summary = client
            .ventes()
            .daily_summary(Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.revenue, vente.total);
        assert_eq!(summary.by_method.len(), 1);
        assert_eq!(summary.by_method[0].method, PaymentMethod::Cash);

        let empty = client
            .ventes()
            .daily_summary(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(empty.sale_count, 0);
    }
}
