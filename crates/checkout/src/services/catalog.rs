use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// Product data as the catalog sees it, including its (possibly stale)
/// view of available stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductInfo {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock_quantity: i64,
}

#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up a product; `Ok(None)` when it does not exist.
    async fn get_product(&self, id: &ProductId) -> Result<Option<ProductInfo>>;
}

#[derive(Debug, Default)]
struct CatalogState {
    products: HashMap<ProductId, ProductInfo>,
    fail_on_get: bool,
    delay: Option<Duration>,
}

/// In-memory catalog with failure and latency injection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: ProductInfo) {
        self.state
            .write()
            .unwrap()
            .products
            .insert(product.id.clone(), product);
    }

    /// When set, every lookup fails with an internal error.
    pub fn set_fail_on_get(&self, fail: bool) {
        self.state.write().unwrap().fail_on_get = fail;
    }

    /// When set, every lookup sleeps first. Lets tests drive the
    /// orchestrator's call timeout.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state.write().unwrap().delay = delay;
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_product(&self, id: &ProductId) -> Result<Option<ProductInfo>> {
        let (product, fail, delay) = {
            let state = self.state.read().unwrap();
            (
                state.products.get(id).cloned(),
                state.fail_on_get,
                state.delay,
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(CheckoutError::Internal("product catalog unavailable".into()));
        }
        Ok(product)
    }
}
