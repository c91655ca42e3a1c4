//! Domain Error Types
//!
//! Pure domain errors that don't depend on infrastructure.

use thiserror::Error;

/// Domain-specific errors
///
/// These errors represent business rule violations and domain invariant
/// failures. They are independent of the web/infrastructure layer, and each
/// kind maps to a stable machine-readable code the boundary layer can rely on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(i64),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Account is not owned by the requesting user
    #[error("Account is not owned by the requesting user")]
    OwnerMismatch,

    /// Account already unregistered (or not in use for a balance operation)
    #[error("Account is already unregistered")]
    AlreadyUnregistered,

    /// Account balance must be zero before deletion
    #[error("Balance is not empty: {balance}")]
    BalanceNotEmpty { balance: i64 },

    /// One user may hold at most 10 accounts
    #[error("User already holds the maximum of 10 accounts")]
    MaxAccountsExceeded,

    /// Requested amount exceeds the account balance
    #[error("Amount exceeds balance: requested {requested}, available {available}")]
    AmountExceedsBalance { requested: i64, available: i64 },

    /// Transaction does not belong to the given account
    #[error("Transaction does not belong to account {0}")]
    TransactionAccountMismatch(String),

    /// Partial cancellation is not allowed
    #[error("Cancel amount must match the transaction amount exactly")]
    CancelMustBeFull,

    /// Transactions older than one year cannot be cancelled
    #[error("Transaction is too old to cancel")]
    TooOldToCancel,

    /// Transaction amounts must be positive integers
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },
}

impl DomainError {
    /// Stable machine-readable code for the boundary layer.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "user_not_found",
            Self::AccountNotFound(_) => "account_not_found",
            Self::TransactionNotFound(_) => "transaction_not_found",
            Self::OwnerMismatch => "owner_mismatch",
            Self::AlreadyUnregistered => "already_unregistered",
            Self::BalanceNotEmpty { .. } => "balance_not_empty",
            Self::MaxAccountsExceeded => "max_accounts_exceeded",
            Self::AmountExceedsBalance { .. } => "amount_exceeds_balance",
            Self::TransactionAccountMismatch(_) => "transaction_account_mismatch",
            Self::CancelMustBeFull => "cancel_must_be_full",
            Self::TooOldToCancel => "too_old_to_cancel",
            Self::InvalidAmount { .. } => "invalid_amount",
        }
    }

    /// Whether a failed use/cancel attempt with this error still gets a
    /// FAILURE transaction appended. Not-found errors record nothing since
    /// there is no valid account to attach the record to, and an invalid
    /// amount cannot be recorded without breaking the ledger's own
    /// positive-amount invariant.
    pub fn records_failure(&self) -> bool {
        !matches!(
            self,
            Self::UserNotFound(_) | Self::AccountNotFound(_) | Self::InvalidAmount { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            DomainError::UserNotFound(1),
            DomainError::AccountNotFound("1000000000".into()),
            DomainError::TransactionNotFound("tx".into()),
            DomainError::OwnerMismatch,
            DomainError::AlreadyUnregistered,
            DomainError::BalanceNotEmpty { balance: 100 },
            DomainError::MaxAccountsExceeded,
            DomainError::AmountExceedsBalance {
                requested: 100,
                available: 50,
            },
            DomainError::TransactionAccountMismatch("1000000000".into()),
            DomainError::CancelMustBeFull,
            DomainError::TooOldToCancel,
            DomainError::InvalidAmount { amount: -500 },
        ];

        let mut codes: Vec<_> = errors.iter().map(|e| e.error_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_not_found_errors_record_nothing() {
        assert!(!DomainError::UserNotFound(1).records_failure());
        assert!(!DomainError::AccountNotFound("1000000000".into()).records_failure());
        assert!(!DomainError::InvalidAmount { amount: -500 }.records_failure());

        assert!(DomainError::OwnerMismatch.records_failure());
        assert!(DomainError::AmountExceedsBalance {
            requested: 100,
            available: 50
        }
        .records_failure());
        assert!(DomainError::TransactionNotFound("tx".into()).records_failure());
    }
}
