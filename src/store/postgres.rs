//! Postgres store
//!
//! sqlx-backed [`Store`] implementation. Status and type enums travel as
//! TEXT; timestamps as `timestamptz`. Schema creation is a migration concern
//! outside this crate (`db::check_schema` verifies it at startup); the
//! account number sequence is a Postgres `SEQUENCE` seeded at 1000000000.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{
    Account, AccountStatus, AccountUser, Transaction, TransactionResultType, TransactionType,
};

use super::{Store, StoreError};

type AccountRow = (
    i64,
    String,
    i64,
    String,
    i64,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

type TransactionRow = (i64, String, String, String, i64, i64, i64, DateTime<Utc>);

/// Postgres-backed [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn account_from_row(row: AccountRow) -> Result<Account, StoreError> {
    let (id, account_number, user_id, status, balance, registered_at, unregistered_at) = row;
    let status = AccountStatus::parse(&status)
        .ok_or_else(|| StoreError::CorruptRow(format!("account {id}: status {status:?}")))?;
    Ok(Account {
        id,
        account_number,
        user_id,
        status,
        balance,
        registered_at,
        unregistered_at,
    })
}

fn transaction_from_row(row: TransactionRow) -> Result<Transaction, StoreError> {
    let (id, transaction_id, tx_type, result_type, account_id, amount, balance_snapshot, transacted_at) =
        row;
    let transaction_type = TransactionType::parse(&tx_type)
        .ok_or_else(|| StoreError::CorruptRow(format!("transaction {id}: type {tx_type:?}")))?;
    let result_type = TransactionResultType::parse(&result_type).ok_or_else(|| {
        StoreError::CorruptRow(format!("transaction {id}: result {result_type:?}"))
    })?;
    Ok(Transaction {
        id,
        transaction_id,
        transaction_type,
        result_type,
        account_id,
        amount,
        balance_snapshot,
        transacted_at,
    })
}

const SELECT_ACCOUNT: &str = "SELECT id, account_number, user_id, status, balance, \
     registered_at, unregistered_at FROM accounts";

const SELECT_TRANSACTION: &str = "SELECT id, transaction_id, transaction_type, result_type, \
     account_id, amount, balance_snapshot, transacted_at FROM transactions";

#[async_trait]
impl Store for PgStore {
    async fn find_user_by_id(&self, user_id: i64) -> Result<Option<AccountUser>, StoreError> {
        let row: Option<(i64, String)> =
            sqlx::query_as("SELECT id, name FROM account_users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id, name)| AccountUser { id, name }))
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(account_from_row).transpose()
    }

    async fn find_account_by_number(
        &self,
        account_number: &str,
    ) -> Result<Option<Account>, StoreError> {
        let row: Option<AccountRow> =
            sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE account_number = $1"))
                .bind(account_number)
                .fetch_optional(&self.pool)
                .await?;
        row.map(account_from_row).transpose()
    }

    async fn find_accounts_by_user(&self, user_id: i64) -> Result<Vec<Account>, StoreError> {
        let rows: Vec<AccountRow> =
            sqlx::query_as(&format!("{SELECT_ACCOUNT} WHERE user_id = $1 ORDER BY id"))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(account_from_row).collect()
    }

    async fn count_accounts_by_user(&self, user_id: i64) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{SELECT_TRANSACTION} WHERE transaction_id = $1"))
                .bind(transaction_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(transaction_from_row).transpose()
    }

    async fn next_account_number(&self) -> Result<String, StoreError> {
        let next: i64 = sqlx::query_scalar("SELECT nextval('account_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(next.to_string())
    }

    async fn save_user(&self, mut user: AccountUser) -> Result<AccountUser, StoreError> {
        if user.id == 0 {
            let id: i64 =
                sqlx::query_scalar("INSERT INTO account_users (name) VALUES ($1) RETURNING id")
                    .bind(&user.name)
                    .fetch_one(&self.pool)
                    .await?;
            user.id = id;
        } else {
            sqlx::query("UPDATE account_users SET name = $2 WHERE id = $1")
                .bind(user.id)
                .bind(&user.name)
                .execute(&self.pool)
                .await?;
        }
        Ok(user)
    }

    async fn save_account(&self, mut account: Account) -> Result<Account, StoreError> {
        if account.id == 0 {
            let id: i64 = sqlx::query_scalar(
                "INSERT INTO accounts \
                 (account_number, user_id, status, balance, registered_at, unregistered_at) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(&account.account_number)
            .bind(account.user_id)
            .bind(account.status.as_str())
            .bind(account.balance)
            .bind(account.registered_at)
            .bind(account.unregistered_at)
            .fetch_one(&self.pool)
            .await?;
            account.id = id;
        } else {
            sqlx::query(
                "UPDATE accounts SET status = $2, balance = $3, unregistered_at = $4 \
                 WHERE id = $1",
            )
            .bind(account.id)
            .bind(account.status.as_str())
            .bind(account.balance)
            .bind(account.unregistered_at)
            .execute(&self.pool)
            .await?;
        }
        Ok(account)
    }

    async fn save_transaction(&self, mut transaction: Transaction) -> Result<Transaction, StoreError> {
        // Ledger entries are append-only; an update path is deliberately absent.
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO transactions \
             (transaction_id, transaction_type, result_type, account_id, amount, \
              balance_snapshot, transacted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&transaction.transaction_id)
        .bind(transaction.transaction_type.as_str())
        .bind(transaction.result_type.as_str())
        .bind(transaction.account_id)
        .bind(transaction.amount)
        .bind(transaction.balance_snapshot)
        .bind(transaction.transacted_at)
        .fetch_one(&self.pool)
        .await?;
        transaction.id = id;
        Ok(transaction)
    }
}
