use common::ProductId;
use thiserror::Error;

/// Errors that can occur when interacting with the stock ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The product has no stock record.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Applying the movement would drive the stock quantity below zero.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The movement delta is not usable (e.g. zero).
    #[error("Invalid movement delta: {0}")]
    InvalidDelta(i64),

    /// A stored movement type could not be parsed.
    #[error("Unknown movement type: {0}")]
    UnknownMovementType(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
