//! Transaction service
//!
//! Balance debits ("use") and credit-reversals ("cancel"), plus the failure
//! recorders the boundary layer calls when a guarded operation is rejected.
//! Every attempt that reaches a valid account leaves a ledger entry.
//!
//! Callers are expected to run `use_balance`/`cancel_balance` inside
//! `LockService::with_account_lock` for the account involved; the services
//! themselves take no lock.

use std::sync::Arc;

use chrono::{Months, Utc};

use crate::domain::{
    Account, DomainError, Transaction, TransactionResultType, TransactionType,
};
use crate::error::AppResult;
use crate::store::Store;

#[derive(Clone)]
pub struct TransactionService {
    store: Arc<dyn Store>,
}

impl TransactionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Debit `amount` from the account and append a SUCCESS USE entry whose
    /// snapshot is the post-debit balance.
    pub async fn use_balance(
        &self,
        user_id: i64,
        account_number: &str,
        amount: i64,
    ) -> AppResult<Transaction> {
        ensure_positive_amount(amount)?;

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?;

        let mut account = self.get_account(account_number).await?;

        if account.user_id != user.id {
            return Err(DomainError::OwnerMismatch.into());
        }
        if !account.is_in_use() {
            return Err(DomainError::AlreadyUnregistered.into());
        }

        account.use_balance(amount)?;
        let account = self.store.save_account(account).await?;

        self.append_entry(TransactionType::Use, TransactionResultType::Success, &account, amount)
            .await
    }

    /// Record that a use attempt failed, snapshotting the current, unchanged
    /// balance. No debit is re-run here.
    pub async fn save_failed_use_transaction(
        &self,
        account_number: &str,
        amount: i64,
    ) -> AppResult<()> {
        ensure_positive_amount(amount)?;

        let account = self.get_account(account_number).await?;
        self.append_entry(TransactionType::Use, TransactionResultType::Failure, &account, amount)
            .await?;
        Ok(())
    }

    /// Reverse a previous use in full, crediting the amount back and
    /// appending a SUCCESS CANCEL entry.
    ///
    /// The account's status is deliberately not re-checked: a transaction on
    /// a since-unregistered account can still be cancelled.
    pub async fn cancel_balance(
        &self,
        transaction_id: &str,
        account_number: &str,
        amount: i64,
    ) -> AppResult<Transaction> {
        ensure_positive_amount(amount)?;

        let transaction = self
            .store
            .find_transaction_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| DomainError::TransactionNotFound(transaction_id.to_string()))?;

        let mut account = self.get_account(account_number).await?;

        validate_cancel_balance(&transaction, &account, amount)?;

        account.cancel_balance(amount);
        let account = self.store.save_account(account).await?;

        self.append_entry(
            TransactionType::Cancel,
            TransactionResultType::Success,
            &account,
            amount,
        )
        .await
    }

    /// Symmetric to [`Self::save_failed_use_transaction`] for cancels.
    pub async fn save_failed_cancel_transaction(
        &self,
        account_number: &str,
        amount: i64,
    ) -> AppResult<()> {
        ensure_positive_amount(amount)?;

        let account = self.get_account(account_number).await?;
        self.append_entry(
            TransactionType::Cancel,
            TransactionResultType::Failure,
            &account,
            amount,
        )
        .await?;
        Ok(())
    }

    /// Ledger entry lookup by its caller-facing transaction id.
    pub async fn query_transaction(&self, transaction_id: &str) -> AppResult<Transaction> {
        Ok(self
            .store
            .find_transaction_by_transaction_id(transaction_id)
            .await?
            .ok_or_else(|| DomainError::TransactionNotFound(transaction_id.to_string()))?)
    }

    async fn get_account(&self, account_number: &str) -> AppResult<Account> {
        Ok(self
            .store
            .find_account_by_number(account_number)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(account_number.to_string()))?)
    }

    async fn append_entry(
        &self,
        transaction_type: TransactionType,
        result_type: TransactionResultType,
        account: &Account,
        amount: i64,
    ) -> AppResult<Transaction> {
        let entry = Transaction::record(
            transaction_type,
            result_type,
            account.id,
            amount,
            account.balance,
        );
        Ok(self.store.save_transaction(entry).await?)
    }
}

/// Ledger entries carry positive integer amounts only; a zero or negative
/// amount is rejected before any account is touched.
fn ensure_positive_amount(amount: i64) -> Result<(), DomainError> {
    if amount <= 0 {
        return Err(DomainError::InvalidAmount { amount });
    }
    Ok(())
}

fn validate_cancel_balance(
    transaction: &Transaction,
    account: &Account,
    amount: i64,
) -> Result<(), DomainError> {
    if transaction.account_id != account.id {
        return Err(DomainError::TransactionAccountMismatch(
            account.account_number.clone(),
        ));
    }

    // Partial cancellation is not allowed
    if transaction.amount != amount {
        return Err(DomainError::CancelMustBeFull);
    }

    if transaction.transacted_at < Utc::now() - Months::new(12) {
        return Err(DomainError::TooOldToCancel);
    }

    Ok(())
}
