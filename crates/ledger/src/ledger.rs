use std::pin::Pin;

use async_trait::async_trait;
use common::{MovementId, OrderId, ProductId};
use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::{MovementType, Result, StockMovement};

/// Current stock position of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Units currently available to sell. Never negative.
    pub quantity: i64,

    /// Quantity at or below which the product counts as low on stock.
    pub low_stock_threshold: i64,
}

impl StockLevel {
    /// Creates a new stock level.
    pub fn new(quantity: i64, low_stock_threshold: i64) -> Self {
        Self {
            quantity,
            low_stock_threshold,
        }
    }

    /// Returns true if at least one unit is available.
    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Returns true if the quantity is at or below the low-stock threshold.
    pub fn is_low(&self) -> bool {
        self.quantity <= self.low_stock_threshold
    }
}

/// A stream of stock movements.
pub type MovementStream = Pin<Box<dyn Stream<Item = Result<StockMovement>> + Send>>;

/// Core trait for stock ledger implementations.
///
/// The ledger is the single source of truth for how many units of a
/// product are available to sell. All implementations must be
/// thread-safe (Send + Sync).
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Creates or resets the stock record for a product.
    ///
    /// Registration establishes the initial quantity against which the
    /// movement log reconciles; it does not itself append a movement.
    async fn register(
        &self,
        product_id: ProductId,
        initial_quantity: i64,
        low_stock_threshold: i64,
    ) -> Result<()>;

    /// Returns the current stock level of a product.
    ///
    /// Fails with `ProductNotFound` if the product has no stock record.
    async fn get_stock(&self, product_id: &ProductId) -> Result<StockLevel>;

    /// Applies a signed quantity change and appends a movement record as
    /// one indivisible unit — both happen or neither does.
    ///
    /// Fails with `InsufficientStock` if a negative delta would drive the
    /// quantity below zero, and with `ProductNotFound` for unknown
    /// products. A zero delta is rejected with `InvalidDelta`.
    async fn apply_movement(
        &self,
        product_id: &ProductId,
        delta: i64,
        movement_type: MovementType,
        reference_id: Option<OrderId>,
        note: Option<String>,
    ) -> Result<MovementId>;

    /// Returns all movements for a product, oldest first.
    async fn movements_for_product(&self, product_id: &ProductId) -> Result<Vec<StockMovement>>;

    /// Returns all movements correlated to an order, oldest first.
    async fn movements_for_reference(&self, reference_id: OrderId) -> Result<Vec<StockMovement>>;

    /// Streams every movement in the ledger in insertion order.
    async fn stream_movements(&self) -> Result<MovementStream>;
}

/// Extension trait providing convenience methods for stock ledgers.
#[async_trait]
pub trait StockLedgerExt: StockLedger {
    /// Sums the movement deltas recorded for a product.
    ///
    /// By the ledger invariant this equals the current quantity minus the
    /// quantity the product was registered with.
    async fn recorded_delta(&self, product_id: &ProductId) -> Result<i64> {
        let movements = self.movements_for_product(product_id).await?;
        Ok(movements.iter().map(|m| m.delta).sum())
    }

    /// Returns true if a `Release` movement already exists for the given
    /// order/product pair.
    ///
    /// Used to make compensating releases idempotent.
    async fn has_release_for(&self, product_id: &ProductId, reference_id: OrderId) -> Result<bool> {
        let movements = self.movements_for_reference(reference_id).await?;
        Ok(movements.iter().any(|m| {
            m.movement_type == MovementType::Release && &m.product_id == product_id
        }))
    }
}

// Blanket implementation for all StockLedger implementations
impl<T: StockLedger + ?Sized> StockLedgerExt for T {}
