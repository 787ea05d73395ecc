use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, UserId};

use crate::error::{CheckoutError, Result};
use crate::order::Order;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn insert(&self, order: Order) -> Result<()>;

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Orders for a user, newest first.
    async fn for_user(&self, user_id: &UserId) -> Result<Vec<Order>>;
}

#[derive(Debug, Default)]
struct OrderStoreState {
    orders: Vec<Order>,
    fail_on_insert: bool,
}

/// In-memory order store with an insert-failure toggle so tests can
/// force the persistence step of checkout to fail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    state: Arc<RwLock<OrderStoreState>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_insert(&self, fail: bool) {
        self.state.write().unwrap().fail_on_insert = fail;
    }

    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_insert {
            return Err(CheckoutError::Internal("order store unavailable".into()));
        }
        state.orders.push(order);
        Ok(())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.order_id == order_id)
            .cloned())
    }

    async fn for_user(&self, user_id: &UserId) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .state
            .read()
            .unwrap()
            .orders
            .iter()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
