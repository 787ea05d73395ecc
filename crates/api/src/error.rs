//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Missing credentials.
    Unauthorized,
    /// Credentials present but rejected, or access to someone else's resource.
    Forbidden(String),
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Checkout flow error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": "Missing authorization token" }),
            ),
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, serde_json::json!({ "error": msg }))
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg }))
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": msg }),
                )
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, serde_json::Value) {
    match &err {
        CheckoutError::InvalidRequest(_) => {
            (StatusCode::BAD_REQUEST, serde_json::json!({ "error": err.to_string() }))
        }
        CheckoutError::CartNotFound
        | CheckoutError::ItemNotFound(_)
        | CheckoutError::ProductNotFound(_) => {
            (StatusCode::NOT_FOUND, serde_json::json!({ "error": err.to_string() }))
        }
        // Enough detail for the client to adjust the cart without a
        // second round trip.
        CheckoutError::InsufficientStock {
            product_id,
            requested,
            available,
        } => (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": err.to_string(),
                "product_id": product_id.as_str(),
                "requested": requested,
                "available": available,
            }),
        ),
        CheckoutError::Timeout(_) => {
            (StatusCode::GATEWAY_TIMEOUT, serde_json::json!({ "error": err.to_string() }))
        }
        CheckoutError::Internal(msg) => {
            tracing::error!(error = %msg, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": err.to_string() }),
            )
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<stock_ledger::LedgerError> for ApiError {
    fn from(err: stock_ledger::LedgerError) -> Self {
        match err {
            stock_ledger::LedgerError::ProductNotFound(id) => {
                ApiError::NotFound(format!("Product {id} not found"))
            }
            other => ApiError::Checkout(other.into()),
        }
    }
}
