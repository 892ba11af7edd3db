//! # Product Catalogue Endpoints
//!
//! ```text
//! GET /api/produits?module=&q=&limit=   → {items, total}
//! GET /api/produits/{id}                → Product
//! GET /api/produits/barcode/{code}      → Product
//! ```

use caisse_core::{ModuleActif, Product};
use tracing::{debug, warn};

use crate::client::{BackendClient, ListResponse};
use crate::error::{ClientError, ClientResult};

/// Default page size for catalogue listings.
pub const DEFAULT_PRODUCT_LIMIT: usize = 50;

/// Filters for a catalogue listing.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
    pub module: Option<ModuleActif>,
    /// Free text matched by the backend on name, reference and barcode.
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl ProductQuery {
    pub fn for_module(module: ModuleActif) -> Self {
        Self {
            module: Some(module),
            ..Default::default()
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = if text.trim().is_empty() {
            None
        } else {
            Some(text)
        };
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(module) = self.module {
            params.push(("module", module.code().to_string()));
        }
        if let Some(q) = &self.search {
            params.push(("q", q.clone()));
        }
        params.push((
            "limit",
            self.limit.unwrap_or(DEFAULT_PRODUCT_LIMIT).to_string(),
        ));
        params
    }
}

/// Catalogue endpoints, see [`BackendClient::products`].
pub struct ProductsApi<'a> {
    client: &'a BackendClient,
}

impl<'a> ProductsApi<'a> {
    pub(crate) fn new(client: &'a BackendClient) -> Self {
        Self { client }
    }

    /// Lists products matching `query`.
    pub async fn list(&self, query: &ProductQuery) -> ClientResult<ListResponse<Product>> {
        let url = self.client.api_url(&["produits"])?;
        let params = query.params();
        debug!(?params, "Listing products");

        let page: ListResponse<Product> = self
            .client
            .send_json(|http| http.get(url.clone()).query(&params))
            .await?;

        debug!(count = page.items.len(), total = page.total, "Products listed");
        Ok(page)
    }

    /// Fetches one product.
    pub async fn get(&self, id: &str) -> ClientResult<Product> {
        let url = self.client.api_url(&["produits", id])?;
        self.client.send_json(|http| http.get(url.clone())).await
    }

    /// Looks a scanned code up. `None` when no product carries it.
    pub async fn find_by_barcode(&self, code: &str) -> ClientResult<Option<Product>> {
        let url = self.client.api_url(&["produits", "barcode", code.trim()])?;
        match self.client.send_json(|http| http.get(url.clone())).await {
            Ok(product) => Ok(Some(product)),
            Err(ClientError::NotFound(_)) => {
                debug!(code = %code, "No product for barcode");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches several products by id, skipping those the backend no longer has.
    ///
    /// Used to refresh the products of the cart lines before reconciliation.
    pub async fn get_many(&self, ids: &[String]) -> ClientResult<Vec<Product>> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(id).await {
                Ok(product) => products.push(product),
                Err(ClientError::NotFound(_)) => {
                    warn!(product_id = %id, "Product no longer exists on the backend");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;

    #[test]
    fn test_query_params() {
        let params = ProductQuery::for_module(ModuleActif::Depot)
            .search("bière")
            .limit(10)
            .params();
        assert_eq!(
            params,
            vec![
                ("module", "depot".to_string()),
                ("q", "bière".to_string()),
                ("limit", "10".to_string()),
            ]
        );

        let params = ProductQuery::default().search("  ").params();
        assert_eq!(params, vec![("limit", DEFAULT_PRODUCT_LIMIT.to_string())]);
    }

    #[tokio::test]
    async fn test_list_filters_by_module_and_text() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let page = client
            .products()
            .list(&ProductQuery::for_module(ModuleActif::Pharmacie))
            .await
            .unwrap();
        assert!(!page.items.is_empty());
        assert!(page.items.iter().all(|p| p.module == ModuleActif::Pharmacie));

        let page = client
            .products()
            .list(&ProductQuery::default().search("bière"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "biere");
    }

    #[tokio::test]
    async fn test_get_missing_product_is_not_found() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let err = client.products().get("ghost").await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_barcode() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let product = client
            .products()
            .find_by_barcode("6001234000024")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.id, "biere");

        assert!(client
            .products()
            .find_by_barcode("0000000000000")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_many_skips_missing() {
        let backend = FakeBackend::start().await;
        let client = backend.logged_in_client().await;

        let ids = vec!["biere".to_string(), "ghost".to_string(), "doliprane".to_string()];
        let products = client.products().get_many(&ids).await.unwrap();
        let found: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(found, vec!["biere", "doliprane"]);
    }
}
