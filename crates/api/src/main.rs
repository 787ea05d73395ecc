//! API server entry point.

use std::sync::Arc;

use api::config::Config;
use api::state::AppState;
use checkout::{Claims, ProductInfo, Role};
use common::{Money, ProductId, UserId};
use stock_ledger::{InMemoryStockLedger, PostgresStockLedger, StockLedger};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Registers a few demo products and two demo identities, logging the
/// tokens so the API can be exercised immediately.
async fn seed_demo_data<L: StockLedger + Clone>(state: &Arc<AppState<L>>) {
    let ledger = state.orchestrator.reservations().ledger();
    let catalog = state.orchestrator.catalog();

    for (sku, name, cents, stock, threshold) in [
        ("SKU-001", "Mechanical Keyboard", 8999, 25, 5),
        ("SKU-002", "Wireless Mouse", 2999, 40, 10),
        ("SKU-003", "USB-C Dock", 14999, 8, 3),
    ] {
        let product_id = ProductId::new(sku);
        if let Err(e) = ledger.register(product_id.clone(), stock, threshold).await {
            tracing::warn!(product = sku, error = %e, "failed to seed stock");
            continue;
        }
        catalog.insert(ProductInfo {
            id: product_id,
            name: name.to_string(),
            price: Money::from_cents(cents),
            stock_quantity: stock,
        });
    }

    let customer_token = state.verifier.issue(Claims {
        user_id: UserId::new(),
        email: "customer@example.com".to_string(),
        role: Role::Customer,
    });
    let admin_token = state.verifier.issue(Claims {
        user_id: UserId::new(),
        email: "admin@example.com".to_string(),
        role: Role::Admin,
    });
    tracing::info!(%customer_token, %admin_token, "demo tokens issued");
}

async fn serve(app: axum::Router, addr: &str) {
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the ledger backend, build state, serve
    let addr = config.addr();
    match &config.database_url {
        Some(url) => {
            let ledger = PostgresStockLedger::connect(url)
                .await
                .expect("failed to connect to database");
            ledger
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL stock ledger");

            let state = api::create_default_state(ledger);
            seed_demo_data(&state).await;
            serve(api::create_app(state, metrics_handle), &addr).await;
        }
        None => {
            tracing::info!("using in-memory stock ledger");

            let state = api::create_default_state(InMemoryStockLedger::new());
            seed_demo_data(&state).await;
            serve(api::create_app(state, metrics_handle), &addr).await;
        }
    }
}
