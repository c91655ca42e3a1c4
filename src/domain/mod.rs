//! Domain module
//!
//! Core domain types and business logic.

pub mod account;
pub mod error;
pub mod transaction;

pub use account::{Account, AccountStatus, AccountUser};
pub use error::DomainError;
pub use transaction::{new_transaction_id, Transaction, TransactionResultType, TransactionType};
