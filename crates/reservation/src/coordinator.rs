//! Per-product serialization of reserve and release.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use common::{MovementId, OrderId, ProductId};
use stock_ledger::{MovementType, StockLedger, StockLedgerExt};
use tokio::sync::Mutex;

use crate::error::{ReservationError, Result};

/// A granted stock reservation, reversible via [`ReservationCoordinator::release`].
#[derive(Debug, Clone)]
pub struct Reservation {
    /// The ledger movement that recorded the decrement.
    pub movement_id: MovementId,
    /// The product reserved.
    pub product_id: ProductId,
    /// Units reserved.
    pub quantity: u32,
    /// The order the reservation belongs to.
    pub order_id: OrderId,
}

/// Serializes concurrent reservation requests against the stock ledger.
///
/// Each product gets its own async mutex; the critical section spans the
/// ledger's check-then-decrement (and, for release, the idempotency
/// lookup), which is the only ordering guarantee the system needs. Two
/// orders touching disjoint products never contend.
#[derive(Clone)]
pub struct ReservationCoordinator<L: StockLedger> {
    ledger: L,
    locks: Arc<StdMutex<HashMap<ProductId, Arc<Mutex<()>>>>>,
}

impl<L: StockLedger> ReservationCoordinator<L> {
    /// Creates a new coordinator over the given ledger.
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            locks: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns the mutex guarding a product, creating it on first use.
    fn lock_for(&self, product_id: &ProductId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks
            .entry(product_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reserves `quantity` units of a product for an order.
    ///
    /// Serializable per product: of two concurrent calls on the same
    /// product, one observes the other's decrement, so in aggregate no
    /// more than the available stock is ever granted.
    #[tracing::instrument(skip(self), fields(product = %product_id, %order_id))]
    pub async fn reserve(
        &self,
        product_id: &ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<Reservation> {
        if quantity == 0 {
            return Err(ReservationError::InvalidQuantity(quantity));
        }

        let lock = self.lock_for(product_id);
        let _guard = lock.lock().await;

        let movement_id = self
            .ledger
            .apply_movement(
                product_id,
                -(quantity as i64),
                MovementType::Sale,
                Some(order_id),
                Some(format!("Reserved for order {order_id}")),
            )
            .await
            .inspect_err(|_| {
                metrics::counter!("reservations_rejected_total").increment(1);
            })?;

        metrics::counter!("reservations_granted_total").increment(1);
        tracing::debug!(%movement_id, quantity, "reservation granted");

        Ok(Reservation {
            movement_id,
            product_id: product_id.clone(),
            quantity,
            order_id,
        })
    }

    /// Credits a reservation back after a failed checkout.
    ///
    /// Idempotent per `(order_id, product_id)`: the movement log is
    /// consulted under the product lock, and a second release for the
    /// same pair is a no-op rather than a double credit.
    #[tracing::instrument(skip(self), fields(product = %product_id, %order_id))]
    pub async fn release(
        &self,
        product_id: &ProductId,
        quantity: u32,
        order_id: OrderId,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(ReservationError::InvalidQuantity(quantity));
        }

        let lock = self.lock_for(product_id);
        let _guard = lock.lock().await;

        if self.ledger.has_release_for(product_id, order_id).await? {
            tracing::debug!("duplicate release ignored");
            return Ok(());
        }

        self.ledger
            .apply_movement(
                product_id,
                quantity as i64,
                MovementType::Release,
                Some(order_id),
                Some(format!("Released for order {order_id}")),
            )
            .await?;

        metrics::counter!("reservations_released_total").increment(1);
        Ok(())
    }
}
