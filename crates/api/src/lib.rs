//! HTTP API server for the stock and checkout system.
//!
//! Exposes cart management, checkout, order lookup and stock inspection
//! endpoints over axum, with structured logging (tracing) and Prometheus
//! metrics. Cart and order routes require a bearer token; stock and
//! health routes are public.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use checkout::{CheckoutOrchestrator, InMemoryCartStore, InMemoryOrderStore, InMemoryProductCatalog, InMemoryTokenVerifier};
use metrics_exporter_prometheus::PrometheusHandle;
use reservation::ReservationCoordinator;
use stock_ledger::StockLedger;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use state::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: StockLedger + Clone + 'static>(
    state: Arc<AppState<L>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let protected = Router::new()
        .route("/cart", get(routes::cart::get::<L>))
        .route("/cart/items", post(routes::cart::add_item::<L>))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update_item::<L>).delete(routes::cart::remove_item::<L>),
        )
        .route(
            "/orders",
            post(routes::orders::create::<L>).get(routes::orders::list::<L>),
        )
        .route("/orders/{id}", get(routes::orders::get::<L>))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth::<L>,
        ));

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products/{id}/stock", get(routes::stock::get::<L>))
        .route(
            "/products/{id}/movements",
            get(routes::stock::movements::<L>),
        )
        .merge(protected)
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state: the given ledger backend plus
/// in-memory catalog, cart store, order store and token verifier.
pub fn create_default_state<L: StockLedger + Clone + 'static>(ledger: L) -> Arc<AppState<L>> {
    let orchestrator = CheckoutOrchestrator::new(
        ReservationCoordinator::new(ledger),
        InMemoryProductCatalog::new(),
        InMemoryCartStore::new(),
        InMemoryOrderStore::new(),
    );

    Arc::new(AppState {
        orchestrator,
        verifier: InMemoryTokenVerifier::new(),
    })
}
