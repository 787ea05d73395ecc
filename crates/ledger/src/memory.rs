use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{MovementId, OrderId, ProductId};
use tokio::sync::RwLock;

use crate::{
    LedgerError, MovementType, Result, StockMovement,
    ledger::{MovementStream, StockLedger, StockLevel},
};

#[derive(Default)]
struct LedgerState {
    levels: HashMap<ProductId, StockLevel>,
    movements: Vec<StockMovement>,
}

/// In-memory stock ledger implementation.
///
/// Holds levels and the movement log behind a single `RwLock`; the write
/// lock spans check, decrement, and log append, so `apply_movement` is
/// atomic with respect to all other callers. Provides the same interface
/// as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryStockLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryStockLedger {
    /// Creates a new empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of movements recorded.
    pub async fn movement_count(&self) -> usize {
        self.state.read().await.movements.len()
    }

    /// Clears all levels and movements.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.levels.clear();
        state.movements.clear();
    }
}

#[async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn register(
        &self,
        product_id: ProductId,
        initial_quantity: i64,
        low_stock_threshold: i64,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .levels
            .insert(product_id, StockLevel::new(initial_quantity, low_stock_threshold));
        Ok(())
    }

    async fn get_stock(&self, product_id: &ProductId) -> Result<StockLevel> {
        let state = self.state.read().await;
        state
            .levels
            .get(product_id)
            .copied()
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))
    }

    async fn apply_movement(
        &self,
        product_id: &ProductId,
        delta: i64,
        movement_type: MovementType,
        reference_id: Option<OrderId>,
        note: Option<String>,
    ) -> Result<MovementId> {
        if delta == 0 {
            return Err(LedgerError::InvalidDelta(delta));
        }

        let mut state = self.state.write().await;

        let level = state
            .levels
            .get(product_id)
            .copied()
            .ok_or_else(|| LedgerError::ProductNotFound(product_id.clone()))?;

        let new_quantity = level.quantity + delta;
        if new_quantity < 0 {
            metrics::counter!("ledger_movements_rejected_total").increment(1);
            return Err(LedgerError::InsufficientStock {
                product_id: product_id.clone(),
                requested: -delta,
                available: level.quantity,
            });
        }

        let movement =
            StockMovement::new(product_id.clone(), delta, movement_type, reference_id, note);
        let movement_id = movement.movement_id;

        // Both writes happen under the same guard; neither is visible alone.
        state.levels.insert(
            product_id.clone(),
            StockLevel::new(new_quantity, level.low_stock_threshold),
        );
        state.movements.push(movement);

        metrics::counter!("ledger_movements_total").increment(1);
        Ok(movement_id)
    }

    async fn movements_for_product(&self, product_id: &ProductId) -> Result<Vec<StockMovement>> {
        let state = self.state.read().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| &m.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn movements_for_reference(&self, reference_id: OrderId) -> Result<Vec<StockMovement>> {
        let state = self.state.read().await;
        Ok(state
            .movements
            .iter()
            .filter(|m| m.reference_id == Some(reference_id))
            .cloned()
            .collect())
    }

    async fn stream_movements(&self) -> Result<MovementStream> {
        use futures_util::stream;

        let state = self.state.read().await;
        let movements = state.movements.clone();
        let stream = stream::iter(movements.into_iter().map(Ok));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::StockLedgerExt;

    #[tokio::test]
    async fn register_and_get_stock() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");

        ledger.register(product.clone(), 10, 3).await.unwrap();

        let level = ledger.get_stock(&product).await.unwrap();
        assert_eq!(level.quantity, 10);
        assert_eq!(level.low_stock_threshold, 3);
        assert!(level.in_stock());
        assert!(!level.is_low());
    }

    #[tokio::test]
    async fn get_stock_unknown_product() {
        let ledger = InMemoryStockLedger::new();
        let result = ledger.get_stock(&ProductId::new("SKU-404")).await;
        assert!(matches!(result, Err(LedgerError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn apply_movement_decrements_and_logs() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        let order = OrderId::new();
        ledger.register(product.clone(), 10, 0).await.unwrap();

        ledger
            .apply_movement(
                &product,
                -3,
                MovementType::Sale,
                Some(order),
                Some("Reserved for order".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(ledger.get_stock(&product).await.unwrap().quantity, 7);

        let movements = ledger.movements_for_product(&product).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].delta, -3);
        assert_eq!(movements[0].movement_type, MovementType::Sale);
        assert_eq!(movements[0].reference_id, Some(order));
    }

    #[tokio::test]
    async fn apply_movement_rejects_oversell() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        ledger.register(product.clone(), 2, 0).await.unwrap();

        let result = ledger
            .apply_movement(&product, -3, MovementType::Sale, None, None)
            .await;

        match result {
            Err(LedgerError::InsufficientStock {
                requested,
                available,
                ..
            }) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Neither the level nor the log changed.
        assert_eq!(ledger.get_stock(&product).await.unwrap().quantity, 2);
        assert_eq!(ledger.movement_count().await, 0);
    }

    #[tokio::test]
    async fn apply_movement_rejects_unknown_product() {
        let ledger = InMemoryStockLedger::new();
        let result = ledger
            .apply_movement(&ProductId::new("SKU-404"), -1, MovementType::Sale, None, None)
            .await;
        assert!(matches!(result, Err(LedgerError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn apply_movement_rejects_zero_delta() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        ledger.register(product.clone(), 5, 0).await.unwrap();

        let result = ledger
            .apply_movement(&product, 0, MovementType::Adjustment, None, None)
            .await;
        assert!(matches!(result, Err(LedgerError::InvalidDelta(0))));
    }

    #[tokio::test]
    async fn deltas_reconcile_with_quantity() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        ledger.register(product.clone(), 10, 0).await.unwrap();

        ledger
            .apply_movement(&product, -4, MovementType::Sale, None, None)
            .await
            .unwrap();
        ledger
            .apply_movement(&product, 4, MovementType::Release, None, None)
            .await
            .unwrap();
        ledger
            .apply_movement(&product, -2, MovementType::Sale, None, None)
            .await
            .unwrap();
        ledger
            .apply_movement(&product, 5, MovementType::Restock, None, None)
            .await
            .unwrap();

        let level = ledger.get_stock(&product).await.unwrap();
        let recorded = ledger.recorded_delta(&product).await.unwrap();
        assert_eq!(level.quantity, 10 + recorded);
        assert_eq!(level.quantity, 13);
    }

    #[tokio::test]
    async fn movements_for_reference_filters_by_order() {
        let ledger = InMemoryStockLedger::new();
        let p1 = ProductId::new("SKU-001");
        let p2 = ProductId::new("SKU-002");
        let order = OrderId::new();
        ledger.register(p1.clone(), 5, 0).await.unwrap();
        ledger.register(p2.clone(), 5, 0).await.unwrap();

        ledger
            .apply_movement(&p1, -1, MovementType::Sale, Some(order), None)
            .await
            .unwrap();
        ledger
            .apply_movement(&p2, -2, MovementType::Sale, Some(order), None)
            .await
            .unwrap();
        ledger
            .apply_movement(&p1, -1, MovementType::Sale, Some(OrderId::new()), None)
            .await
            .unwrap();

        let movements = ledger.movements_for_reference(order).await.unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn has_release_for_detects_prior_release() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        let order = OrderId::new();
        ledger.register(product.clone(), 5, 0).await.unwrap();

        assert!(!ledger.has_release_for(&product, order).await.unwrap());

        ledger
            .apply_movement(&product, -2, MovementType::Sale, Some(order), None)
            .await
            .unwrap();
        assert!(!ledger.has_release_for(&product, order).await.unwrap());

        ledger
            .apply_movement(&product, 2, MovementType::Release, Some(order), None)
            .await
            .unwrap();
        assert!(ledger.has_release_for(&product, order).await.unwrap());
    }

    #[tokio::test]
    async fn stream_movements_in_insertion_order() {
        use futures_util::StreamExt;

        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        ledger.register(product.clone(), 10, 0).await.unwrap();

        ledger
            .apply_movement(&product, -1, MovementType::Sale, None, None)
            .await
            .unwrap();
        ledger
            .apply_movement(&product, 1, MovementType::Release, None, None)
            .await
            .unwrap();

        let stream = ledger.stream_movements().await.unwrap();
        let movements: Vec<_> = stream.collect().await;
        assert_eq!(movements.len(), 2);
        assert_eq!(movements[0].as_ref().unwrap().delta, -1);
        assert_eq!(movements[1].as_ref().unwrap().delta, 1);
    }

    #[tokio::test]
    async fn concurrent_movements_never_oversell() {
        let ledger = InMemoryStockLedger::new();
        let product = ProductId::new("SKU-001");
        ledger.register(product.clone(), 5, 0).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let ledger = ledger.clone();
            let product = product.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .apply_movement(&product, -1, MovementType::Sale, None, None)
                    .await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, 5);
        assert_eq!(ledger.get_stock(&product).await.unwrap().quantity, 0);
    }
}
