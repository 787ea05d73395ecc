//! Reservation error types.

use stock_ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur during reservation operations.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// The requested quantity is not usable (zero).
    #[error("Invalid reservation quantity: {0}")]
    InvalidQuantity(u32),

    /// Ledger error (insufficient stock, unknown product, storage failure).
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ReservationError {
    /// Returns true if the error is an insufficient-stock rejection.
    pub fn is_insufficient_stock(&self) -> bool {
        matches!(self, ReservationError::Ledger(LedgerError::InsufficientStock { .. }))
    }

    /// Returns true if the error is an unknown-product rejection.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ReservationError::Ledger(LedgerError::ProductNotFound(_)))
    }
}

/// Result type for reservation operations.
pub type Result<T> = std::result::Result<T, ReservationError>;
