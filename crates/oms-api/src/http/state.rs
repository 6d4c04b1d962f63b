//! Application state for HTTP handlers.

use std::sync::Arc;

use oms_server::{BulkShipRunner, CheckoutService};
use oms_storage::DataStore;

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `S` - The storage backend implementing [`DataStore`]
#[derive(Clone)]
pub struct AppState<S: DataStore> {
    /// The storage backend.
    pub storage: Arc<S>,
    /// The order-placement workflow.
    pub checkout: Arc<CheckoutService<S>>,
    /// The bulk-shipment job runner.
    pub ship_runner: Arc<BulkShipRunner<S>>,
}

impl<S: DataStore> AppState<S> {
    /// Creates application state over the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        let checkout = Arc::new(CheckoutService::new(Arc::clone(&storage)));
        let ship_runner = Arc::new(BulkShipRunner::new(Arc::clone(&storage)));
        Self {
            storage,
            checkout,
            ship_runner,
        }
    }
}
