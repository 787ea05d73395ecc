use chrono::{DateTime, Utc};
use common::{MovementId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// The cause of a stock quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock reserved for an order (negative delta).
    Sale,
    /// A reservation credited back after a failed checkout (positive delta).
    Release,
    /// New stock received (positive delta).
    Restock,
    /// Manual correction (either sign).
    Adjustment,
}

impl MovementType {
    /// Returns the movement type as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Sale => "sale",
            MovementType::Release => "release",
            MovementType::Restock => "restock",
            MovementType::Adjustment => "adjustment",
        }
    }

    /// Parses a movement type from its stored string form.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "sale" => Ok(MovementType::Sale),
            "release" => Ok(MovementType::Release),
            "restock" => Ok(MovementType::Restock),
            "adjustment" => Ok(MovementType::Adjustment),
            other => Err(LedgerError::UnknownMovementType(other.to_string())),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable ledger entry recording a stock quantity change and its cause.
///
/// Movements are append-only: once written they are never updated or
/// deleted, so the log can always be replayed to reconcile the current
/// quantity of a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    /// Unique identifier for this log entry.
    pub movement_id: MovementId,

    /// The product whose quantity changed.
    pub product_id: ProductId,

    /// Signed quantity change; negative for reservations, positive for
    /// releases and restocks.
    pub delta: i64,

    /// Why the quantity changed.
    pub movement_type: MovementType,

    /// The order this movement correlates to, if any.
    pub reference_id: Option<OrderId>,

    /// Free-form annotation.
    pub note: Option<String>,

    /// When the movement was recorded.
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Creates a new movement record with a fresh ID and the current time.
    pub fn new(
        product_id: ProductId,
        delta: i64,
        movement_type: MovementType,
        reference_id: Option<OrderId>,
        note: Option<String>,
    ) -> Self {
        Self {
            movement_id: MovementId::new(),
            product_id,
            delta,
            movement_type,
            reference_id,
            note,
            created_at: Utc::now(),
        }
    }
}
