use common::ProductId;
use reservation::ReservationError;
use stock_ledger::LedgerError;

pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Errors surfaced by the checkout flow and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("cart not found")]
    CartNotFound,

    #[error("item not in cart: {0}")]
    ItemNotFound(ProductId),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::ProductNotFound(product_id) => Self::ProductNotFound(product_id),
            LedgerError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::InsufficientStock {
                product_id,
                requested,
                available,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ReservationError> for CheckoutError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InvalidQuantity(q) => {
                Self::InvalidRequest(format!("invalid quantity: {q}"))
            }
            ReservationError::Ledger(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_errors_map_to_checkout_taxonomy() {
        let err: CheckoutError = ReservationError::Ledger(LedgerError::InsufficientStock {
            product_id: ProductId::new("SKU-001"),
            requested: 5,
            available: 2,
        })
        .into();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                requested: 5,
                available: 2,
                ..
            }
        ));

        let err: CheckoutError =
            ReservationError::Ledger(LedgerError::ProductNotFound(ProductId::new("SKU-404")))
                .into();
        assert!(matches!(err, CheckoutError::ProductNotFound(_)));
    }
}
