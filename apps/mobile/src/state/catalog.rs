//! # Catalog State
//!
//! Products fetched for the module actif, cached by id so cart commands
//! do not go to the backend for every tap.

use std::collections::HashMap;
use std::sync::RwLock;

use caisse_core::{ModuleActif, Product};
use tracing::debug;

#[derive(Debug, Default)]
struct Catalog {
    module: Option<ModuleActif>,
    products: HashMap<String, Product>,
}

#[derive(Debug, Default)]
pub struct CatalogState {
    inner: RwLock<Catalog>,
}

impl CatalogState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole cache with a fresh listing of `module`.
    pub fn replace(&self, module: ModuleActif, products: Vec<Product>) {
        let mut catalog = self.inner.write().unwrap_or_else(|e| e.into_inner());
        catalog.module = Some(module);
        catalog.products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
        debug!(module = %module, count = catalog.products.len(), "Catalog replaced");
    }

    /// Adds or refreshes products without dropping the others.
    pub fn upsert(&self, products: impl IntoIterator<Item = Product>) {
        let mut catalog = self.inner.write().unwrap_or_else(|e| e.into_inner());
        for product in products {
            catalog.products.insert(product.id.clone(), product);
        }
    }

    pub fn get(&self, id: &str) -> Option<Product> {
        self.read(|c| c.products.get(id).cloned())
    }

    /// The cached products among `ids`, in the order of `ids`.
    pub fn get_many(&self, ids: &[String]) -> Vec<Product> {
        self.read(|c| ids.iter().filter_map(|id| c.products.get(id).cloned()).collect())
    }

    /// Module the cache was last filled for.
    pub fn module(&self) -> Option<ModuleActif> {
        self.read(|c| c.module)
    }

    pub fn len(&self) -> usize {
        self.read(|c| c.products.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut catalog = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *catalog = Catalog::default();
    }

    fn read<R>(&self, f: impl FnOnce(&Catalog) -> R) -> R {
        let catalog = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&catalog)
    }
}
