//! Checkout and order endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use checkout::{Claims, Order, OrderLine, OrderStore, ShippingAddress};
use common::OrderId;
use serde::{Deserialize, Serialize};
use stock_ledger::StockLedger;

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub shipping_address: ShippingAddress,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub status: String,
    pub items: Vec<OrderLineResponse>,
    pub total_cents: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.to_string(),
            status: order.status.to_string(),
            items: order.items.iter().map(OrderLineResponse::from).collect(),
            total_cents: order.total_amount.cents(),
            created_at: order.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    pub status: String,
    pub items: Vec<OrderLineResponse>,
    pub total_cents: i64,
}

// -- Handlers --

/// POST /orders — run checkout on the authenticated user's cart.
#[tracing::instrument(skip(state, claims, req), fields(user = %claims.user_id))]
pub async fn create<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CheckoutRequest>,
) -> Result<(axum::http::StatusCode, Json<CheckoutResponse>), ApiError> {
    let receipt = state
        .orchestrator
        .checkout(&claims, req.shipping_address)
        .await?;

    let response = CheckoutResponse {
        order_id: receipt.order_id.to_string(),
        status: receipt.status.to_string(),
        items: receipt.items.iter().map(OrderLineResponse::from).collect(),
        total_cents: receipt.total_amount.cents(),
    };
    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /orders — the authenticated user's orders, newest first.
#[tracing::instrument(skip(state, claims), fields(user = %claims.user_id))]
pub async fn list<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orchestrator.orders().for_user(&claims.user_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id — a single order. Admins can read any order; other
/// users only their own.
#[tracing::instrument(skip(state, claims), fields(user = %claims.user_id))]
pub async fn get<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = id
        .parse::<uuid::Uuid>()
        .map(OrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))?;

    let order = state
        .orchestrator
        .orders()
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    if order.user_id != claims.user_id && !claims.is_admin() {
        return Err(ApiError::Forbidden("Access denied".into()));
    }

    Ok(Json(OrderResponse::from(&order)))
}
