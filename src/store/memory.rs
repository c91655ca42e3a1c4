//! In-memory store
//!
//! Hash maps behind a single `RwLock`. Backs the test suite and local runs
//! without a database. Lookups clone; the per-save write lock gives the same
//! single-row atomicity the Postgres backend provides (and nothing more:
//! read-modify-write across two calls still races without the account lock).

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{Account, AccountUser, Transaction};

use super::{Store, StoreError};

const FIRST_ACCOUNT_NUMBER: u64 = 1_000_000_000;

#[derive(Default)]
struct Inner {
    users: HashMap<i64, AccountUser>,
    accounts: HashMap<i64, Account>,
    transactions: HashMap<i64, Transaction>,
    next_user_id: i64,
    next_account_id: i64,
    next_transaction_id: i64,
    /// Sequence for account numbers; 0 = nothing issued yet
    next_account_number: u64,
}

/// In-memory [`Store`] implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<AccountUser>, StoreError> {
        Ok(self.inner.read().await.users.get(&user_id).cloned())
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .find(|a| a.account_number == account_number)
            .cloned())
    }

    async fn find_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>, StoreError> {
        let inner = self.inner.read().await;
        let mut accounts: Vec<_> = inner
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        // Insertion order, like a serial primary key scan
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn count_accounts_by_user(&self, user_id: i64) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .count() as i64)
    }

    async fn find_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .transactions
            .values()
            .find(|t| t.transaction_id == transaction_id)
            .cloned())
    }

    async fn next_account_number(&self) -> Result<String, StoreError> {
        let mut inner = self.inner.write().await;
        let next = if inner.next_account_number == 0 {
            FIRST_ACCOUNT_NUMBER
        } else {
            inner.next_account_number
        };
        inner.next_account_number = next + 1;
        Ok(next.to_string())
    }

    async fn save_user(&self, mut user: AccountUser) -> Result<AccountUser, StoreError> {
        let mut inner = self.inner.write().await;
        if user.id == 0 {
            inner.next_user_id += 1;
            user.id = inner.next_user_id;
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save_account(&self, mut account: Account) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().await;
        if account.id == 0 {
            inner.next_account_id += 1;
            account.id = inner.next_account_id;
        }
        inner.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn save_transaction(&self, mut transaction: Transaction) -> Result<Transaction, StoreError> {
        let mut inner = self.inner.write().await;
        if transaction.id == 0 {
            inner.next_transaction_id += 1;
            transaction.id = inner.next_transaction_id;
        }
        inner.transactions.insert(transaction.id, transaction.clone());
        Ok(transaction)
    }
}

impl MemoryStore {
    /// All ledger entries for an account, in insertion order. Not part of the
    /// [`Store`] contract; used by tests to inspect the ledger.
    pub async fn transactions_for_account(&self, account_id: i64) -> Vec<Transaction> {
        let inner = self.inner.read().await;
        let mut entries: Vec<_> = inner
            .transactions
            .values()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect();
        entries.sort_by_key(|t| t.id);
        entries
    }
}
