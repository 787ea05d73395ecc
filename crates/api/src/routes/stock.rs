//! Stock level and movement history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;
use stock_ledger::{StockLedger, StockMovement};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StockResponse {
    pub product_id: String,
    pub quantity: i64,
    pub low_stock_threshold: i64,
    pub in_stock: bool,
    pub low_stock: bool,
}

#[derive(Serialize)]
pub struct MovementResponse {
    pub id: String,
    pub product_id: String,
    pub delta: i64,
    pub movement_type: String,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<StockMovement> for MovementResponse {
    fn from(m: StockMovement) -> Self {
        Self {
            id: m.movement_id.to_string(),
            product_id: m.product_id.to_string(),
            delta: m.delta,
            movement_type: m.movement_type.to_string(),
            reference_id: m.reference_id.map(|id| id.to_string()),
            note: m.note,
            created_at: m.created_at,
        }
    }
}

/// GET /products/:id/stock — current stock level for a product.
#[tracing::instrument(skip(state))]
pub async fn get<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Path(product_id): Path<String>,
) -> Result<Json<StockResponse>, ApiError> {
    let product_id = common::ProductId::new(product_id);
    let level = state
        .orchestrator
        .reservations()
        .ledger()
        .get_stock(&product_id)
        .await?;

    Ok(Json(StockResponse {
        product_id: product_id.to_string(),
        quantity: level.quantity,
        low_stock_threshold: level.low_stock_threshold,
        in_stock: level.in_stock(),
        low_stock: level.is_low(),
    }))
}

/// GET /products/:id/movements — the product's movement log, oldest first.
#[tracing::instrument(skip(state))]
pub async fn movements<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<MovementResponse>>, ApiError> {
    let product_id = common::ProductId::new(product_id);
    let ledger = state.orchestrator.reservations().ledger();

    // 404 for unknown products rather than an empty log.
    ledger.get_stock(&product_id).await?;

    let movements = ledger.movements_for_product(&product_id).await?;
    Ok(Json(
        movements.into_iter().map(MovementResponse::from).collect(),
    ))
}
