//! Checkout orchestration: turns a cart into a committed order, or fails
//! cleanly with no side effects visible to the caller.
//!
//! The [`CheckoutOrchestrator`] drives the multi-step flow — validate,
//! price/stock pre-check, per-line reservation, order persistence, cart
//! clearing — and compensates every already-granted reservation when a
//! later step fails. External collaborators (product catalog, cart store,
//! order store, token verification) sit behind traits in [`services`],
//! each with a failure-injectable in-memory implementation.

mod cart;
mod error;
mod order;
mod orchestrator;
pub mod services;

pub use cart::{Cart, CartLine};
pub use error::{CheckoutError, Result};
pub use order::{Order, OrderLine, OrderStatus, ShippingAddress};
pub use orchestrator::{CheckoutOrchestrator, CheckoutReceipt};
pub use services::auth::{Claims, InMemoryTokenVerifier, Role, TokenVerifier};
pub use services::cart_store::{CartStore, InMemoryCartStore};
pub use services::catalog::{InMemoryProductCatalog, ProductCatalog, ProductInfo};
pub use services::order_store::{InMemoryOrderStore, OrderStore};
