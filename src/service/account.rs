//! Account service
//!
//! Account creation, deletion and lookup. Creation enforces the per-user
//! account ceiling; deletion enforces ownership, liveness and an empty
//! balance, then soft-deletes by flipping the status.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{Account, AccountUser, DomainError};
use crate::error::AppResult;
use crate::store::Store;

/// One user may hold at most this many accounts, regardless of status.
const MAX_ACCOUNTS_PER_USER: i64 = 10;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn Store>,
}

impl AccountService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open a new account for `user_id` with the given initial balance.
    ///
    /// The account number comes from the store's atomic sequence, so
    /// concurrent creates never collide. The initial balance is persisted as
    /// given, without a non-negative floor.
    pub async fn create_account(&self, user_id: i64, initial_balance: i64) -> AppResult<Account> {
        let user = self.get_account_user(user_id).await?;

        if self.store.count_accounts_by_user(user.id).await? >= MAX_ACCOUNTS_PER_USER {
            return Err(DomainError::MaxAccountsExceeded.into());
        }

        let account_number = self.store.next_account_number().await?;
        let account = self
            .store
            .save_account(Account::open(user.id, account_number, initial_balance))
            .await?;

        tracing::info!(
            user_id,
            account_number = %account.account_number,
            "account created"
        );
        Ok(account)
    }

    /// Unregister the account. One-way: the status never goes back to
    /// `InUse` and the row is never removed.
    pub async fn delete_account(&self, user_id: i64, account_number: &str) -> AppResult<Account> {
        let user = self.get_account_user(user_id).await?;

        let mut account = self
            .store
            .find_account_by_number(account_number)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(account_number.to_string()))?;

        validate_delete_account(&user, &account)?;

        account.unregister(Utc::now());
        let account = self.store.save_account(account).await?;

        tracing::info!(user_id, account_number, "account unregistered");
        Ok(account)
    }

    /// All accounts owned by the user, any status, in creation order.
    pub async fn get_accounts_by_user(&self, user_id: i64) -> AppResult<Vec<Account>> {
        let user = self.get_account_user(user_id).await?;
        Ok(self.store.find_accounts_by_user(user.id).await?)
    }

    /// Lookup by surrogate id (not the account number).
    pub async fn get_account(&self, id: i64) -> AppResult<Account> {
        Ok(self
            .store
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(id.to_string()))?)
    }

    /// Register a new account holder.
    pub async fn create_user(&self, name: String) -> AppResult<AccountUser> {
        Ok(self.store.save_user(AccountUser::new(name)).await?)
    }

    async fn get_account_user(&self, user_id: i64) -> AppResult<AccountUser> {
        Ok(self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(DomainError::UserNotFound(user_id))?)
    }
}

fn validate_delete_account(user: &AccountUser, account: &Account) -> Result<(), DomainError> {
    if account.user_id != user.id {
        return Err(DomainError::OwnerMismatch);
    }

    if !account.is_in_use() {
        return Err(DomainError::AlreadyUnregistered);
    }

    if account.balance > 0 {
        return Err(DomainError::BalanceNotEmpty {
            balance: account.balance,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AccountStatus;
    use crate::error::AppError;
    use crate::store::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, AccountService, AccountUser) {
        let store = Arc::new(MemoryStore::new());
        let service = AccountService::new(store.clone());
        let user = service.create_user("alice".to_string()).await.unwrap();
        (store, service, user)
    }

    fn domain_err(err: AppError) -> DomainError {
        match err {
            AppError::Domain(e) => e,
            other => panic!("expected domain error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_account_assigns_sequential_numbers() {
        let (_, service, user) = setup().await;

        let first = service.create_account(user.id, 1000).await.unwrap();
        assert_eq!(first.account_number, "1000000000");
        assert_eq!(first.status, AccountStatus::InUse);
        assert_eq!(first.balance, 1000);
        assert!(first.unregistered_at.is_none());

        let second = service.create_account(user.id, 0).await.unwrap();
        assert_eq!(second.account_number, "1000000001");
    }

    #[tokio::test]
    async fn test_create_account_unknown_user() {
        let (_, service, _) = setup().await;

        let err = domain_err(service.create_account(99, 100).await.unwrap_err());
        assert_eq!(err, DomainError::UserNotFound(99));
    }

    #[tokio::test]
    async fn test_create_account_ceiling_is_ten() {
        let (_, service, user) = setup().await;

        for _ in 0..9 {
            service.create_account(user.id, 0).await.unwrap();
        }

        // The 10th account is still allowed
        service.create_account(user.id, 0).await.unwrap();

        // The 11th is not
        let err = domain_err(service.create_account(user.id, 0).await.unwrap_err());
        assert_eq!(err, DomainError::MaxAccountsExceeded);
    }

    #[tokio::test]
    async fn test_unregistered_accounts_count_against_ceiling() {
        let (_, service, user) = setup().await;

        for _ in 0..10 {
            let account = service.create_account(user.id, 0).await.unwrap();
            service
                .delete_account(user.id, &account.account_number)
                .await
                .unwrap();
        }

        let err = domain_err(service.create_account(user.id, 0).await.unwrap_err());
        assert_eq!(err, DomainError::MaxAccountsExceeded);
    }

    #[tokio::test]
    async fn test_delete_account_success() {
        let (_, service, user) = setup().await;
        let account = service.create_account(user.id, 0).await.unwrap();

        let deleted = service
            .delete_account(user.id, &account.account_number)
            .await
            .unwrap();

        assert_eq!(deleted.status, AccountStatus::Unregistered);
        assert!(deleted.unregistered_at.is_some());
        assert_eq!(deleted.account_number, account.account_number);
    }

    #[tokio::test]
    async fn test_delete_account_owner_mismatch() {
        let (_, service, user) = setup().await;
        let other = service.create_user("bob".to_string()).await.unwrap();
        let account = service.create_account(user.id, 0).await.unwrap();

        let err = domain_err(
            service
                .delete_account(other.id, &account.account_number)
                .await
                .unwrap_err(),
        );
        assert_eq!(err, DomainError::OwnerMismatch);
    }

    #[tokio::test]
    async fn test_delete_account_balance_not_empty() {
        let (_, service, user) = setup().await;
        let account = service.create_account(user.id, 1000).await.unwrap();

        let err = domain_err(
            service
                .delete_account(user.id, &account.account_number)
                .await
                .unwrap_err(),
        );
        assert_eq!(err, DomainError::BalanceNotEmpty { balance: 1000 });
    }

    #[tokio::test]
    async fn test_delete_account_is_one_way() {
        let (_, service, user) = setup().await;
        let account = service.create_account(user.id, 0).await.unwrap();
        service
            .delete_account(user.id, &account.account_number)
            .await
            .unwrap();

        let err = domain_err(
            service
                .delete_account(user.id, &account.account_number)
                .await
                .unwrap_err(),
        );
        assert_eq!(err, DomainError::AlreadyUnregistered);
    }

    #[tokio::test]
    async fn test_delete_account_not_found() {
        let (_, service, user) = setup().await;

        let err = domain_err(
            service
                .delete_account(user.id, "1234567890")
                .await
                .unwrap_err(),
        );
        assert_eq!(err, DomainError::AccountNotFound("1234567890".into()));
    }

    #[tokio::test]
    async fn test_get_accounts_by_user_includes_all_statuses() {
        let (_, service, user) = setup().await;
        let first = service.create_account(user.id, 0).await.unwrap();
        let second = service.create_account(user.id, 500).await.unwrap();
        service
            .delete_account(user.id, &first.account_number)
            .await
            .unwrap();

        let accounts = service.get_accounts_by_user(user.id).await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].status, AccountStatus::Unregistered);
        assert_eq!(accounts[1].account_number, second.account_number);

        let err = domain_err(service.get_accounts_by_user(42).await.unwrap_err());
        assert_eq!(err, DomainError::UserNotFound(42));
    }

    #[tokio::test]
    async fn test_get_account_by_surrogate_id() {
        let (_, service, user) = setup().await;
        let account = service.create_account(user.id, 77).await.unwrap();

        let found = service.get_account(account.id).await.unwrap();
        assert_eq!(found, account);

        let err = domain_err(service.get_account(999).await.unwrap_err());
        assert_eq!(err, DomainError::AccountNotFound("999".into()));
    }
}
