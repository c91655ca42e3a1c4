//! API module
//!
//! HTTP endpoints and shared handler state.

pub mod routes;

use std::sync::Arc;

use crate::lock::LockService;
use crate::service::{AccountService, TransactionService};
use crate::store::Store;

pub use routes::create_router;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub transactions: TransactionService,
    pub locks: LockService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, locks: LockService) -> Self {
        Self {
            accounts: AccountService::new(store.clone()),
            transactions: TransactionService::new(store),
            locks,
        }
    }
}
