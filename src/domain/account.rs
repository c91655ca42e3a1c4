//! Account entities
//!
//! `AccountUser` owns accounts; `Account` carries the mutable balance and the
//! registration lifecycle. Balance arithmetic lives on the entity so the
//! services only orchestrate lookups, validation and persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Account holder. Immutable after creation as far as this service is
/// concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    /// Surrogate id, assigned by the store (0 = not yet persisted)
    pub id: i64,
    pub name: String,
}

impl AccountUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }
}

/// Account lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    InUse,
    Unregistered,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InUse => "IN_USE",
            Self::Unregistered => "UNREGISTERED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_USE" => Some(Self::InUse),
            "UNREGISTERED" => Some(Self::Unregistered),
            _ => None,
        }
    }
}

/// A single bank account.
///
/// `account_number` is the externally visible identifier, assigned
/// sequentially from "1000000000" and immutable once set. Deletion is a soft
/// transition to `Unregistered`; rows are never removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Surrogate id, assigned by the store (0 = not yet persisted)
    pub id: i64,
    pub account_number: String,
    /// Owning user's surrogate id. Set at creation, never reassigned.
    pub user_id: i64,
    pub status: AccountStatus,
    pub balance: i64,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Open a new account for `user_id`. The initial balance is taken as
    /// given; a non-negative floor is deliberately not enforced here.
    pub fn open(user_id: i64, account_number: String, initial_balance: i64) -> Self {
        Self {
            id: 0,
            account_number,
            user_id,
            status: AccountStatus::InUse,
            balance: initial_balance,
            registered_at: Utc::now(),
            unregistered_at: None,
        }
    }

    /// Debit `amount` from the balance.
    pub fn use_balance(&mut self, amount: i64) -> Result<(), DomainError> {
        if amount > self.balance {
            return Err(DomainError::AmountExceedsBalance {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    /// Credit `amount` back to the balance. Cancellation amounts were
    /// validated when the original transaction was recorded, so there is no
    /// upper bound check here.
    pub fn cancel_balance(&mut self, amount: i64) {
        self.balance += amount;
    }

    /// One-way transition to `Unregistered`.
    pub fn unregister(&mut self, now: DateTime<Utc>) {
        self.status = AccountStatus::Unregistered;
        self.unregistered_at = Some(now);
    }

    pub fn is_in_use(&self) -> bool {
        self.status == AccountStatus::InUse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_with_balance(balance: i64) -> Account {
        Account::open(1, "1000000000".to_string(), balance)
    }

    #[test]
    fn test_open_account() {
        let account = Account::open(7, "1000000012".to_string(), 500);

        assert_eq!(account.user_id, 7);
        assert_eq!(account.account_number, "1000000012");
        assert_eq!(account.status, AccountStatus::InUse);
        assert_eq!(account.balance, 500);
        assert!(account.unregistered_at.is_none());
    }

    #[test]
    fn test_use_balance_debits() {
        let mut account = account_with_balance(1000);

        account.use_balance(300).unwrap();
        assert_eq!(account.balance, 700);

        account.use_balance(700).unwrap();
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn test_use_balance_rejects_overdraft() {
        let mut account = account_with_balance(100);

        let err = account.use_balance(101).unwrap_err();
        assert_eq!(
            err,
            DomainError::AmountExceedsBalance {
                requested: 101,
                available: 100,
            }
        );
        // Balance must be untouched by a failed debit
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_cancel_balance_credits() {
        let mut account = account_with_balance(0);
        account.cancel_balance(250);
        assert_eq!(account.balance, 250);
    }

    #[test]
    fn test_unregister_is_terminal_state() {
        let mut account = account_with_balance(0);
        let now = Utc::now();

        account.unregister(now);

        assert_eq!(account.status, AccountStatus::Unregistered);
        assert_eq!(account.unregistered_at, Some(now));
        assert!(!account.is_in_use());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!(AccountStatus::parse("IN_USE"), Some(AccountStatus::InUse));
        assert_eq!(
            AccountStatus::parse("UNREGISTERED"),
            Some(AccountStatus::Unregistered)
        );
        assert_eq!(AccountStatus::parse("CLOSED"), None);
        assert_eq!(AccountStatus::InUse.as_str(), "IN_USE");
    }
}
