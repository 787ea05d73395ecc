//! Oversell-prevention properties under concurrency.

use common::{OrderId, ProductId};
use reservation::ReservationCoordinator;
use stock_ledger::{InMemoryStockLedger, StockLedger, StockLedgerExt};

async fn setup(initial: i64) -> (ReservationCoordinator<InMemoryStockLedger>, ProductId) {
    let ledger = InMemoryStockLedger::new();
    let product = ProductId::new("SKU-001");
    ledger.register(product.clone(), initial, 0).await.unwrap();
    (ReservationCoordinator::new(ledger), product)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn aggregate_grants_never_exceed_available_stock() {
    let (coordinator, product) = setup(5).await;

    // 20 callers each want one unit; only 5 units exist.
    let mut handles = Vec::new();
    for _ in 0..20 {
        let coordinator = coordinator.clone();
        let product = product.clone();
        handles.push(tokio::spawn(async move {
            coordinator.reserve(&product, 1, OrderId::new()).await
        }));
    }

    let mut granted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => granted += 1,
            Err(e) => {
                assert!(e.is_insufficient_stock());
                rejected += 1;
            }
        }
    }

    assert_eq!(granted, 5);
    assert_eq!(rejected, 15);

    let level = coordinator.ledger().get_stock(&product).await.unwrap();
    assert_eq!(level.quantity, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn two_concurrent_requests_for_last_units() {
    // Stock 5, two concurrent requests for 3 units each: exactly one wins.
    let (coordinator, product) = setup(5).await;

    let c1 = coordinator.clone();
    let c2 = coordinator.clone();
    let p1 = product.clone();
    let p2 = product.clone();

    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { c1.reserve(&p1, 3, OrderId::new()).await }),
        tokio::spawn(async move { c2.reserve(&p2, 3, OrderId::new()).await }),
    );
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    assert_eq!(
        r1.is_ok() as u32 + r2.is_ok() as u32,
        1,
        "exactly one of the two requests must win"
    );

    let loser = if r1.is_err() { r1 } else { r2 };
    assert!(loser.unwrap_err().is_insufficient_stock());

    let level = coordinator.ledger().get_stock(&product).await.unwrap();
    assert_eq!(level.quantity, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn disjoint_products_do_not_contend() {
    let ledger = InMemoryStockLedger::new();
    let mut products = Vec::new();
    for i in 0..8 {
        let product = ProductId::new(format!("SKU-{i:03}"));
        ledger.register(product.clone(), 100, 0).await.unwrap();
        products.push(product);
    }
    let coordinator = ReservationCoordinator::new(ledger);

    let mut handles = Vec::new();
    for product in &products {
        for _ in 0..10 {
            let coordinator = coordinator.clone();
            let product = product.clone();
            handles.push(tokio::spawn(async move {
                coordinator.reserve(&product, 1, OrderId::new()).await
            }));
        }
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for product in &products {
        let level = coordinator.ledger().get_stock(product).await.unwrap();
        assert_eq!(level.quantity, 90);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_releases_credit_once() {
    let (coordinator, product) = setup(5).await;
    let order = OrderId::new();

    coordinator.reserve(&product, 3, order).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..4 {
        let coordinator = coordinator.clone();
        let product = product.clone();
        handles.push(tokio::spawn(async move {
            coordinator.release(&product, 3, order).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let level = coordinator.ledger().get_stock(&product).await.unwrap();
    assert_eq!(level.quantity, 5);

    // Exactly one release movement made it into the log.
    let releases = coordinator
        .ledger()
        .movements_for_reference(order)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.delta > 0)
        .count();
    assert_eq!(releases, 1);
}

#[tokio::test]
async fn ledger_reconciles_after_mixed_workload() {
    let (coordinator, product) = setup(50).await;

    for _ in 0..10 {
        let order = OrderId::new();
        coordinator.reserve(&product, 2, order).await.unwrap();
        coordinator.release(&product, 2, order).await.unwrap();
    }
    for _ in 0..5 {
        coordinator
            .reserve(&product, 3, OrderId::new())
            .await
            .unwrap();
    }

    let level = coordinator.ledger().get_stock(&product).await.unwrap();
    let recorded = coordinator
        .ledger()
        .recorded_delta(&product)
        .await
        .unwrap();
    assert_eq!(level.quantity, 50 + recorded);
    assert_eq!(level.quantity, 35);
}
