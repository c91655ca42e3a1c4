//! Transaction ledger entries
//!
//! A `Transaction` is an append-only record of one balance-affecting attempt,
//! successful or not. Entries are never mutated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the attempt tried to do to the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Use,
    Cancel,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Use => "USE",
            Self::Cancel => "CANCEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USE" => Some(Self::Use),
            "CANCEL" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Whether the attempt went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionResultType {
    Success,
    Failure,
}

impl TransactionResultType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUCCESS" => Some(Self::Success),
            "FAILURE" => Some(Self::Failure),
            _ => None,
        }
    }
}

/// One ledger entry.
///
/// `transaction_id` is the caller-facing opaque token; `id` is the store's
/// surrogate key. `balance_snapshot` is the account balance after the entry's
/// effect (for failures: the balance at failure time, unchanged).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Surrogate id, assigned by the store (0 = not yet persisted)
    pub id: i64,
    pub transaction_id: String,
    pub transaction_type: TransactionType,
    pub result_type: TransactionResultType,
    /// Surrogate id of the account this entry belongs to
    pub account_id: i64,
    pub amount: i64,
    pub balance_snapshot: i64,
    pub transacted_at: DateTime<Utc>,
}

impl Transaction {
    pub fn record(
        transaction_type: TransactionType,
        result_type: TransactionResultType,
        account_id: i64,
        amount: i64,
        balance_snapshot: i64,
    ) -> Self {
        Self {
            id: 0,
            transaction_id: new_transaction_id(),
            transaction_type,
            result_type,
            account_id,
            amount,
            balance_snapshot,
            transacted_at: Utc::now(),
        }
    }
}

/// Opaque caller-facing transaction token: a v4 UUID without hyphens.
pub fn new_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}
