//! Stock ledger: the single source of truth for sellable quantity per
//! product, backed by an append-only log of stock movements.
//!
//! Two interchangeable backends implement the [`StockLedger`] trait:
//! [`InMemoryStockLedger`] for tests and single-process deployments, and
//! [`PostgresStockLedger`] which serializes check-then-decrement with a
//! row-level `FOR UPDATE` lock inside a transaction.
//!
//! The ledger invariant: a product's quantity never goes negative, and
//! the sum of all movement deltas equals the current quantity minus the
//! quantity it was registered with.

mod error;
mod ledger;
mod memory;
mod movement;
mod postgres;

pub use common::{Money, MovementId, OrderId, ProductId};
pub use error::{LedgerError, Result};
pub use ledger::{MovementStream, StockLedger, StockLedgerExt, StockLevel};
pub use memory::InMemoryStockLedger;
pub use movement::{MovementType, StockMovement};
pub use postgres::PostgresStockLedger;
