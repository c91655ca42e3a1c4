//! Domain services
//!
//! Orchestrate lookups, validation and persistence over the store. Balance
//! arithmetic itself lives on the entities in `domain`.

mod account;
mod transaction;

pub use account::AccountService;
pub use transaction::TransactionService;
