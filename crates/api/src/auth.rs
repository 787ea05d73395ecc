//! Bearer-token authentication middleware.
//!
//! A missing `Authorization` header is a 401; a header whose token does
//! not verify is a 403. Verified [`Claims`] are attached as a request
//! extension for the handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use checkout::{Claims, TokenVerifier};
use stock_ledger::StockLedger;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn require_auth<L: StockLedger + Clone>(
    State(state): State<Arc<AppState<L>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(&request).ok_or_else(|| {
        metrics::counter!("auth_rejected_total", "reason" => "missing").increment(1);
        ApiError::Unauthorized
    })?;

    let claims: Claims = state.verifier.verify(token).await.ok_or_else(|| {
        metrics::counter!("auth_rejected_total", "reason" => "invalid").increment(1);
        ApiError::Forbidden("Invalid or expired token".to_string())
    })?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
