//! Cart endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Extension, Json};
use checkout::{Cart, CartLine, CartStore, CheckoutError, Claims, ProductCatalog};
use serde::{Deserialize, Serialize};
use stock_ledger::StockLedger;

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartItemResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub total_cents: i64,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        let total_cents = cart.total_amount().cents();
        let items = cart
            .items
            .into_iter()
            .map(|line| CartItemResponse {
                product_id: line.product_id.to_string(),
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price_cents: line.price_at_add.cents(),
                line_total_cents: line.line_total().cents(),
            })
            .collect();
        Self { items, total_cents }
    }
}

// -- Handlers --

/// GET /cart — the authenticated user's cart; empty if they have none.
#[tracing::instrument(skip(state, claims), fields(user = %claims.user_id))]
pub async fn get<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .orchestrator
        .carts()
        .get_cart(&claims.user_id)
        .await?
        .unwrap_or_else(|| Cart::new(claims.user_id));
    Ok(Json(cart.into()))
}

/// POST /cart/items — add a product to the cart, merging quantities.
#[tracing::instrument(skip(state, claims, req), fields(user = %claims.user_id))]
pub async fn add_item<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddItemRequest>,
) -> Result<(axum::http::StatusCode, Json<CartResponse>), ApiError> {
    if req.quantity == 0 {
        return Err(ApiError::BadRequest("Quantity must be positive".into()));
    }

    let product_id = common::ProductId::new(req.product_id);
    let product = state
        .orchestrator
        .catalog()
        .get_product(&product_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Product {product_id} not found")))?;

    // Advisory check against live stock; checkout re-validates anyway.
    let level = state
        .orchestrator
        .reservations()
        .ledger()
        .get_stock(&product_id)
        .await?;
    if level.quantity < req.quantity as i64 {
        return Err(CheckoutError::InsufficientStock {
            product_id,
            requested: req.quantity as i64,
            available: level.quantity,
        }
        .into());
    }

    let cart = state
        .orchestrator
        .carts()
        .upsert_item(
            &claims.user_id,
            CartLine::new(product.id, product.name, req.quantity, product.price),
        )
        .await?;

    Ok((axum::http::StatusCode::CREATED, Json(cart.into())))
}

/// PUT /cart/items/:product_id — set a line's quantity (0 removes it).
#[tracing::instrument(skip(state, claims, req), fields(user = %claims.user_id))]
pub async fn update_item<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id = common::ProductId::new(product_id);

    if req.quantity > 0 {
        let level = state
            .orchestrator
            .reservations()
            .ledger()
            .get_stock(&product_id)
            .await?;
        if level.quantity < req.quantity as i64 {
            return Err(CheckoutError::InsufficientStock {
                product_id,
                requested: req.quantity as i64,
                available: level.quantity,
            }
            .into());
        }
    }

    let cart = state
        .orchestrator
        .carts()
        .update_quantity(&claims.user_id, &product_id, req.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// DELETE /cart/items/:product_id — remove a line from the cart.
#[tracing::instrument(skip(state, claims), fields(user = %claims.user_id))]
pub async fn remove_item<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    Extension(claims): Extension<Claims>,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart = state
        .orchestrator
        .carts()
        .remove_item(&claims.user_id, &common::ProductId::new(product_id))
        .await?;
    Ok(Json(cart.into()))
}
