//! End-to-end checkout scenarios over the in-memory stack.

use std::time::Duration;

use checkout::{
    CartLine, CartStore, CheckoutError, CheckoutOrchestrator, Claims, InMemoryCartStore,
    InMemoryOrderStore, InMemoryProductCatalog, OrderStore, ProductCatalog, ProductInfo, Role,
    ShippingAddress,
};
use common::{Money, ProductId, UserId};
use reservation::ReservationCoordinator;
use stock_ledger::{InMemoryStockLedger, StockLedger, StockLedgerExt};

type Orchestrator = CheckoutOrchestrator<
    InMemoryStockLedger,
    InMemoryProductCatalog,
    InMemoryCartStore,
    InMemoryOrderStore,
>;

fn claims() -> Claims {
    Claims {
        user_id: UserId::new(),
        email: "jo@example.com".into(),
        role: Role::Customer,
    }
}

fn address() -> ShippingAddress {
    ShippingAddress {
        street: "1 Main St".into(),
        city: "Springfield".into(),
        postal_code: None,
        country: None,
    }
}

async fn setup(products: &[(&str, i64, i64)]) -> Orchestrator {
    let ledger = InMemoryStockLedger::new();
    let catalog = InMemoryProductCatalog::new();
    for (sku, stock, cents) in products {
        let product_id = ProductId::new(*sku);
        ledger.register(product_id.clone(), *stock, 0).await.unwrap();
        catalog.insert(ProductInfo {
            id: product_id,
            name: (*sku).to_string(),
            price: Money::from_cents(*cents),
            stock_quantity: *stock,
        });
    }
    CheckoutOrchestrator::new(
        ReservationCoordinator::new(ledger),
        catalog,
        InMemoryCartStore::new(),
        InMemoryOrderStore::new(),
    )
}

async fn add_to_cart(orchestrator: &Orchestrator, user_id: &UserId, sku: &str, quantity: u32) {
    let product = orchestrator
        .catalog()
        .get_product(&ProductId::new(sku))
        .await
        .unwrap()
        .unwrap();
    orchestrator
        .carts()
        .upsert_item(
            user_id,
            CartLine::new(product.id, product.name, quantity, product.price),
        )
        .await
        .unwrap();
}

async fn stock_of(orchestrator: &Orchestrator, sku: &str) -> i64 {
    orchestrator
        .reservations()
        .ledger()
        .get_stock(&ProductId::new(sku))
        .await
        .unwrap()
        .quantity
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_for_the_last_units_admit_exactly_one() {
    // Stock 5, two buyers each want 3 units of the same product.
    let orchestrator = setup(&[("SKU-001", 5, 1000)]).await;
    let buyer_a = claims();
    let buyer_b = claims();
    add_to_cart(&orchestrator, &buyer_a.user_id, "SKU-001", 3).await;
    add_to_cart(&orchestrator, &buyer_b.user_id, "SKU-001", 3).await;

    let o1 = orchestrator.clone();
    let o2 = orchestrator.clone();
    let (a, b) = tokio::join!(
        tokio::spawn(async move { o1.checkout(&buyer_a, address()).await }),
        tokio::spawn(async move { o2.checkout(&buyer_b, address()).await }),
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(
        a.is_ok() as u32 + b.is_ok() as u32,
        1,
        "exactly one buyer gets the last units"
    );
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(
        loser.unwrap_err(),
        CheckoutError::InsufficientStock { .. }
    ));

    assert_eq!(stock_of(&orchestrator, "SKU-001").await, 2);
    assert_eq!(orchestrator.orders().order_count(), 1);
}

#[tokio::test]
async fn failed_multi_line_checkout_leaves_stock_fully_restored() {
    let orchestrator = setup(&[
        ("SKU-001", 10, 1050),
        ("SKU-002", 10, 399),
        ("SKU-003", 10, 2500),
    ])
    .await;
    let buyer = claims();
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-001", 2).await;
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-002", 4).await;
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-003", 1).await;

    // Drain SKU-003 after the catalog snapshot so the third
    // reservation fails and the first two must be compensated.
    orchestrator
        .reservations()
        .reserve(&ProductId::new("SKU-003"), 10, common::OrderId::new())
        .await
        .unwrap();

    let err = orchestrator.checkout(&buyer, address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));

    assert_eq!(stock_of(&orchestrator, "SKU-001").await, 10);
    assert_eq!(stock_of(&orchestrator, "SKU-002").await, 10);
    assert_eq!(orchestrator.orders().order_count(), 0);

    // Compensation shows up in the movement log as matched
    // sale/release pairs, so the ledger still reconciles.
    for sku in ["SKU-001", "SKU-002"] {
        let product = ProductId::new(sku);
        let level = orchestrator
            .reservations()
            .ledger()
            .get_stock(&product)
            .await
            .unwrap();
        let recorded = orchestrator
            .reservations()
            .ledger()
            .recorded_delta(&product)
            .await
            .unwrap();
        assert_eq!(level.quantity, 10 + recorded);
    }
}

#[tokio::test]
async fn order_total_matches_line_subtotals_exactly() {
    let orchestrator = setup(&[
        ("SKU-001", 10, 1099),
        ("SKU-002", 10, 7),
        ("SKU-003", 10, 333333),
    ])
    .await;
    let buyer = claims();
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-001", 3).await;
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-002", 9).await;
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-003", 2).await;

    let receipt = orchestrator.checkout(&buyer, address()).await.unwrap();

    let expected: Money = receipt.items.iter().map(|l| l.subtotal).sum();
    assert_eq!(receipt.total_amount, expected);
    assert_eq!(receipt.total_amount, Money::from_cents(3 * 1099 + 9 * 7 + 2 * 333333));

    let stored = orchestrator
        .orders()
        .get(receipt.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.total_amount, receipt.total_amount);
}

#[tokio::test]
async fn cart_clear_failure_surfaces_but_order_stands() {
    let orchestrator = setup(&[("SKU-001", 10, 1000)]).await;
    let buyer = claims();
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-001", 1).await;
    orchestrator.carts().set_fail_on_clear(true);

    let err = orchestrator.checkout(&buyer, address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Internal(_)));

    // The order was committed and stock stays decremented; only the
    // cart cleanup failed.
    assert_eq!(orchestrator.orders().order_count(), 1);
    assert_eq!(stock_of(&orchestrator, "SKU-001").await, 9);
}

#[tokio::test]
async fn sequential_checkouts_drain_stock_to_zero_then_reject() {
    let orchestrator = setup(&[("SKU-001", 4, 500)]).await;

    for _ in 0..2 {
        let buyer = claims();
        add_to_cart(&orchestrator, &buyer.user_id, "SKU-001", 2).await;
        orchestrator.checkout(&buyer, address()).await.unwrap();
    }
    assert_eq!(stock_of(&orchestrator, "SKU-001").await, 0);

    let late_buyer = claims();
    add_to_cart(&orchestrator, &late_buyer.user_id, "SKU-001", 1).await;
    let err = orchestrator
        .checkout(&late_buyer, address())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
    assert_eq!(stock_of(&orchestrator, "SKU-001").await, 0);
}

#[tokio::test]
async fn catalog_outage_aborts_without_touching_stock() {
    let orchestrator = setup(&[("SKU-001", 10, 1000)]).await;
    let buyer = claims();
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-001", 2).await;
    orchestrator.catalog().set_fail_on_get(true);

    let err = orchestrator.checkout(&buyer, address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Internal(_)));
    assert_eq!(stock_of(&orchestrator, "SKU-001").await, 10);
}

#[tokio::test]
async fn timeout_is_bounded() {
    let orchestrator = setup(&[("SKU-001", 10, 1000)])
        .await
        .with_call_timeout(Duration::from_millis(20));
    let buyer = claims();
    add_to_cart(&orchestrator, &buyer.user_id, "SKU-001", 2).await;
    orchestrator
        .catalog()
        .set_delay(Some(Duration::from_secs(5)));

    let start = std::time::Instant::now();
    let err = orchestrator.checkout(&buyer, address()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::Timeout(_)));
    assert!(start.elapsed() < Duration::from_secs(1));
}
