//! Shared application state.

use checkout::{
    CheckoutOrchestrator, InMemoryCartStore, InMemoryOrderStore, InMemoryProductCatalog,
    InMemoryTokenVerifier,
};
use stock_ledger::StockLedger;

/// State shared by all handlers. Generic over the ledger backend so the
/// same router serves the in-memory and PostgreSQL deployments.
pub struct AppState<L: StockLedger + Clone> {
    pub orchestrator: CheckoutOrchestrator<
        L,
        InMemoryProductCatalog,
        InMemoryCartStore,
        InMemoryOrderStore,
    >,
    pub verifier: InMemoryTokenVerifier,
}
