use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{ProductId, UserId};

use crate::cart::{Cart, CartLine};
use crate::error::{CheckoutError, Result};

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Fetches a user's cart; `Ok(None)` when they have none yet.
    async fn get_cart(&self, user_id: &UserId) -> Result<Option<Cart>>;

    /// Adds a line to the cart (creating the cart on first use), merging
    /// quantities when the product is already present. Returns the
    /// updated cart.
    async fn upsert_item(&self, user_id: &UserId, line: CartLine) -> Result<Cart>;

    /// Sets a line's quantity; zero removes the line.
    async fn update_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart>;

    /// Removes a line from the cart.
    async fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart>;

    /// Empties the cart. Succeeds even when the cart does not exist.
    async fn clear_cart(&self, user_id: &UserId) -> Result<()>;
}

#[derive(Debug, Default)]
struct CartStoreState {
    carts: HashMap<UserId, Cart>,
    fail_on_clear: bool,
}

/// In-memory cart store with a clear-failure toggle for orchestrator tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCartStore {
    state: Arc<RwLock<CartStoreState>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_clear(&self, fail: bool) {
        self.state.write().unwrap().fail_on_clear = fail;
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn get_cart(&self, user_id: &UserId) -> Result<Option<Cart>> {
        Ok(self.state.read().unwrap().carts.get(user_id).cloned())
    }

    async fn upsert_item(&self, user_id: &UserId, line: CartLine) -> Result<Cart> {
        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .entry(*user_id)
            .or_insert_with(|| Cart::new(*user_id));
        cart.upsert(line);
        Ok(cart.clone())
    }

    async fn update_quantity(
        &self,
        user_id: &UserId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .get_mut(user_id)
            .ok_or(CheckoutError::CartNotFound)?;
        if !cart.set_quantity(product_id, quantity) {
            return Err(CheckoutError::ItemNotFound(product_id.clone()));
        }
        Ok(cart.clone())
    }

    async fn remove_item(&self, user_id: &UserId, product_id: &ProductId) -> Result<Cart> {
        let mut state = self.state.write().unwrap();
        let cart = state
            .carts
            .get_mut(user_id)
            .ok_or(CheckoutError::CartNotFound)?;
        if !cart.remove(product_id) {
            return Err(CheckoutError::ItemNotFound(product_id.clone()));
        }
        Ok(cart.clone())
    }

    async fn clear_cart(&self, user_id: &UserId) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_clear {
            return Err(CheckoutError::Internal("cart store unavailable".into()));
        }
        if let Some(cart) = state.carts.get_mut(user_id) {
            cart.items.clear();
        }
        Ok(())
    }
}
