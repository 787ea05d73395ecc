//! The checkout flow.
//!
//! Five steps: validate the request, pre-check price and stock against
//! the catalog, reserve each line through the reservation coordinator,
//! persist the order, clear the cart. A failure after any reservation
//! has been granted triggers compensation: every granted reservation is
//! released, in reverse order, before the error is returned.
//!
//! The pre-check is an early-exit optimization only. Stock can change
//! between the pre-check and the reservation step; correctness comes
//! from the reservation coordinator re-validating under the per-product
//! lock, never from the pre-check.

use std::future::Future;
use std::time::{Duration, Instant};

use common::{Money, OrderId};
use reservation::ReservationCoordinator;
use serde::Serialize;
use stock_ledger::StockLedger;

use crate::error::{CheckoutError, Result};
use crate::order::{Order, OrderLine, OrderStatus, ShippingAddress};
use crate::services::auth::Claims;
use crate::services::cart_store::CartStore;
use crate::services::catalog::{ProductCatalog, ProductInfo};
use crate::services::order_store::OrderStore;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// What the caller gets back from a committed checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub items: Vec<OrderLine>,
    pub total_amount: Money,
    pub status: OrderStatus,
}

/// Drives a cart through reservation and persistence into an order.
#[derive(Clone)]
pub struct CheckoutOrchestrator<L, C, K, O>
where
    L: StockLedger + Clone,
    C: ProductCatalog + Clone,
    K: CartStore + Clone,
    O: OrderStore + Clone,
{
    reservations: ReservationCoordinator<L>,
    catalog: C,
    carts: K,
    orders: O,
    call_timeout: Duration,
}

impl<L, C, K, O> CheckoutOrchestrator<L, C, K, O>
where
    L: StockLedger + Clone,
    C: ProductCatalog + Clone,
    K: CartStore + Clone,
    O: OrderStore + Clone,
{
    pub fn new(
        reservations: ReservationCoordinator<L>,
        catalog: C,
        carts: K,
        orders: O,
    ) -> Self {
        Self {
            reservations,
            catalog,
            carts,
            orders,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Overrides the per-call timeout applied to collaborator and
    /// reservation calls.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn reservations(&self) -> &ReservationCoordinator<L> {
        &self.reservations
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn carts(&self) -> &K {
        &self.carts
    }

    pub fn orders(&self) -> &O {
        &self.orders
    }

    /// Runs the full checkout flow for the authenticated user.
    #[tracing::instrument(skip_all, fields(user = %claims.user_id))]
    pub async fn checkout(
        &self,
        claims: &Claims,
        shipping_address: ShippingAddress,
    ) -> Result<CheckoutReceipt> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let start = Instant::now();

        let result = self.run(claims, shipping_address).await;
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_committed_total").increment(1);
                tracing::info!(order_id = %receipt.order_id, total = %receipt.total_amount, "checkout committed");
            }
            Err(err) => {
                metrics::counter!("checkout_aborted_total").increment(1);
                tracing::warn!(error = %err, "checkout aborted");
            }
        }
        result
    }

    async fn run(
        &self,
        claims: &Claims,
        shipping_address: ShippingAddress,
    ) -> Result<CheckoutReceipt> {
        // Step 1: validate.
        shipping_address.validate()?;

        let cart = self
            .timed(self.carts.get_cart(&claims.user_id), "cart store")
            .await?
            .unwrap_or_else(|| crate::cart::Cart::new(claims.user_id));
        if cart.is_empty() {
            return Err(CheckoutError::InvalidRequest("cart is empty".into()));
        }

        // Step 2: pre-check every line against the catalog and freeze
        // the order lines at current catalog prices.
        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = self
                .timed(self.catalog.get_product(&item.product_id), "product catalog")
                .await?
                .ok_or_else(|| CheckoutError::ProductNotFound(item.product_id.clone()))?;
            check_line_stock(&product, item.quantity)?;
            lines.push(OrderLine::new(
                product.id,
                product.name,
                item.quantity,
                product.price,
            ));
        }

        // Step 3: reserve each line. The order id exists before the
        // order row does, so the ledger movements can reference it.
        let order_id = OrderId::new();
        let mut reserved: Vec<(common::ProductId, u32)> = Vec::new();
        for item in &cart.items {
            let attempt = self
                .timed(
                    self.reservations
                        .reserve(&item.product_id, item.quantity, order_id),
                    "reservation",
                )
                .await;
            match attempt {
                Ok(_) => reserved.push((item.product_id.clone(), item.quantity)),
                Err(err) => {
                    self.compensate(&reserved, order_id).await;
                    return Err(err);
                }
            }
        }

        // Step 4: persist the order.
        let total_amount: Money = lines.iter().map(|l| l.subtotal).sum();
        let order = Order {
            order_id,
            user_id: claims.user_id,
            user_email: claims.email.clone(),
            items: lines.clone(),
            total_amount,
            shipping_address,
            status: OrderStatus::Pending,
            created_at: chrono::Utc::now(),
        };
        if let Err(err) = self.timed(self.orders.insert(order), "order store").await {
            self.compensate(&reserved, order_id).await;
            return Err(err);
        }

        // Step 5: the order is committed; clear the cart.
        self.timed(self.carts.clear_cart(&claims.user_id), "cart store")
            .await?;

        Ok(CheckoutReceipt {
            order_id,
            items: lines,
            total_amount,
            status: OrderStatus::Pending,
        })
    }

    /// Releases every granted reservation, newest first. A failed
    /// release is logged and the remaining releases still run; release
    /// idempotency makes retrying this safe.
    async fn compensate(&self, reserved: &[(common::ProductId, u32)], order_id: OrderId) {
        if reserved.is_empty() {
            return;
        }
        metrics::counter!("checkout_compensations_total").increment(1);
        tracing::warn!(%order_id, reservations = reserved.len(), "compensating failed checkout");

        for (product_id, quantity) in reserved.iter().rev() {
            let release = self
                .timed(
                    self.reservations.release(product_id, *quantity, order_id),
                    "reservation release",
                )
                .await;
            if let Err(err) = release {
                tracing::error!(%order_id, product = %product_id, error = %err, "release failed during compensation");
            }
        }
    }

    async fn timed<T, E>(
        &self,
        fut: impl Future<Output = std::result::Result<T, E>>,
        what: &str,
    ) -> Result<T>
    where
        CheckoutError: From<E>,
    {
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(result) => result.map_err(CheckoutError::from),
            Err(_) => Err(CheckoutError::Timeout(what.to_string())),
        }
    }
}

fn check_line_stock(product: &ProductInfo, quantity: u32) -> Result<()> {
    if product.stock_quantity < quantity as i64 {
        return Err(CheckoutError::InsufficientStock {
            product_id: product.id.clone(),
            requested: quantity as i64,
            available: product.stock_quantity,
        });
    }
    Ok(())
}
