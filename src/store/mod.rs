//! Persistence gateway
//!
//! The services talk to storage through the [`Store`] trait: simple
//! lookup/save operations with single-row atomicity. "Absent" is an
//! `Option`, never an error. Two backends exist: [`MemoryStore`] for tests
//! and local runs, and [`PgStore`] over Postgres.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Account, AccountUser, Transaction};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Gateway failure (connectivity, constraint violations, corrupt rows).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Lookup/save operations the domain services consume.
///
/// `save_*` inserts when the entity's surrogate id is 0, letting the store
/// assign one, and updates the existing row otherwise. Each save is atomic
/// for the single row written.
#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<AccountUser>, StoreError>;

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError>;

    async fn find_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>, StoreError>;

    async fn count_accounts_by_user(&self, user_id: i64) -> Result<i64, StoreError>;

    async fn find_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, StoreError>;

    /// Next account number from the store's atomic sequence. The first number
    /// issued anywhere is "1000000000"; each subsequent call increments by 1.
    async fn next_account_number(&self) -> Result<String, StoreError>;

    async fn save_user(&self, user: AccountUser) -> Result<AccountUser, StoreError>;

    async fn save_account(&self, account: Account) -> Result<Account, StoreError>;

    async fn save_transaction(&self, transaction: Transaction) -> Result<Transaction, StoreError>;
}
