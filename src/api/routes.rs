//! API Routes
//!
//! HTTP endpoint definitions. The use/cancel handlers are the guarded
//! invocations: they take the per-account lock around the service call and
//! record a FAILURE transaction when a domain validation rejects the attempt.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    Account, AccountStatus, DomainError, Transaction, TransactionResultType, TransactionType,
};
use crate::error::AppError;

use super::AppState;

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    pub user_id: i64,
    pub initial_balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    pub user_id: i64,
    pub account_number: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteAccountRequest {
    pub user_id: i64,
    pub account_number: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteAccountResponse {
    pub user_id: i64,
    pub account_number: String,
    pub unregistered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account_number: String,
    pub balance: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub account_number: String,
    pub user_id: i64,
    pub status: AccountStatus,
    pub balance: i64,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            account_number: account.account_number,
            user_id: account.user_id,
            status: account.status,
            balance: account.balance,
            registered_at: account.registered_at,
            unregistered_at: account.unregistered_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseBalanceRequest {
    pub user_id: i64,
    pub account_number: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBalanceRequest {
    pub transaction_id: String,
    pub account_number: String,
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub account_number: String,
    pub transaction_result: TransactionResultType,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

impl TransactionResponse {
    fn from_entry(account_number: &str, entry: Transaction) -> Self {
        Self {
            account_number: account_number.to_string(),
            transaction_result: entry.result_type,
            transaction_id: entry.transaction_id,
            amount: entry.amount,
            transacted_at: entry.transacted_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryTransactionResponse {
    pub account_number: String,
    pub transaction_type: TransactionType,
    pub transaction_result: TransactionResultType,
    pub transaction_id: String,
    pub amount: i64,
    pub transacted_at: DateTime<Utc>,
}

// =========================================================================
// Router
// =========================================================================

/// Create the API router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/user", post(create_user))
        .route(
            "/account",
            post(create_account).delete(delete_account).get(get_accounts),
        )
        .route("/account/:id", get(get_account))
        .route("/transaction/use", post(use_balance))
        .route("/transaction/cancel", post(cancel_balance))
        .route("/transaction/:transaction_id", get(query_transaction))
}

// =========================================================================
// Account endpoints
// =========================================================================

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.accounts.create_user(request.name).await?;
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            user_id: user.id,
            name: user.name,
        }),
    ))
}

async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<CreateAccountResponse>), AppError> {
    let account = state
        .accounts
        .create_account(request.user_id, request.initial_balance)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAccountResponse {
            user_id: account.user_id,
            account_number: account.account_number,
            registered_at: account.registered_at,
        }),
    ))
}

async fn delete_account(
    State(state): State<AppState>,
    Json(request): Json<DeleteAccountRequest>,
) -> Result<Json<DeleteAccountResponse>, AppError> {
    let account = state
        .accounts
        .delete_account(request.user_id, &request.account_number)
        .await?;
    Ok(Json(DeleteAccountResponse {
        user_id: account.user_id,
        account_number: account.account_number,
        unregistered_at: account.unregistered_at,
    }))
}

async fn get_accounts(
    State(state): State<AppState>,
    Query(query): Query<AccountsQuery>,
) -> Result<Json<Vec<AccountInfo>>, AppError> {
    let accounts = state.accounts.get_accounts_by_user(query.user_id).await?;
    Ok(Json(
        accounts
            .into_iter()
            .map(|a| AccountInfo {
                account_number: a.account_number,
                balance: a.balance,
            })
            .collect(),
    ))
}

async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<AccountResponse>, AppError> {
    let account = state.accounts.get_account(id).await?;
    Ok(Json(account.into()))
}

// =========================================================================
// Transaction endpoints (guarded invocations)
// =========================================================================

async fn use_balance(
    State(state): State<AppState>,
    Json(request): Json<UseBalanceRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let entry = state
        .locks
        .with_account_lock(&request.account_number, || {
            let state = state.clone();
            let request = request.clone();
            async move {
                match state
                    .transactions
                    .use_balance(request.user_id, &request.account_number, request.amount)
                    .await
                {
                    Ok(entry) => Ok(entry),
                    Err(err) => {
                        record_failure(
                            &state,
                            TransactionType::Use,
                            &request.account_number,
                            request.amount,
                            &err,
                        )
                        .await;
                        Err(err)
                    }
                }
            }
        })
        .await?;

    Ok(Json(TransactionResponse::from_entry(
        &request.account_number,
        entry,
    )))
}

async fn cancel_balance(
    State(state): State<AppState>,
    Json(request): Json<CancelBalanceRequest>,
) -> Result<Json<TransactionResponse>, AppError> {
    let entry = state
        .locks
        .with_account_lock(&request.account_number, || {
            let state = state.clone();
            let request = request.clone();
            async move {
                match state
                    .transactions
                    .cancel_balance(
                        &request.transaction_id,
                        &request.account_number,
                        request.amount,
                    )
                    .await
                {
                    Ok(entry) => Ok(entry),
                    Err(err) => {
                        record_failure(
                            &state,
                            TransactionType::Cancel,
                            &request.account_number,
                            request.amount,
                            &err,
                        )
                        .await;
                        Err(err)
                    }
                }
            }
        })
        .await?;

    Ok(Json(TransactionResponse::from_entry(
        &request.account_number,
        entry,
    )))
}

/// Append a FAILURE transaction for a rejected use/cancel attempt. Runs
/// inside the guarded window, so the snapshot is the balance the rejected
/// attempt actually saw.
///
/// Only domain validation failures are recorded; not-found and
/// invalid-amount errors have nothing valid to record, and lock failures
/// never touched the account. If the recorder itself fails, the original
/// error still propagates.
async fn record_failure(
    state: &AppState,
    transaction_type: TransactionType,
    account_number: &str,
    amount: i64,
    err: &AppError,
) {
    if !err.as_domain().is_some_and(DomainError::records_failure) {
        return;
    }

    tracing::error!(
        account_number,
        kind = transaction_type.as_str(),
        error = %err,
        "recording failed attempt"
    );

    let recorded = match transaction_type {
        TransactionType::Use => {
            state
                .transactions
                .save_failed_use_transaction(account_number, amount)
                .await
        }
        TransactionType::Cancel => {
            state
                .transactions
                .save_failed_cancel_transaction(account_number, amount)
                .await
        }
    };
    if let Err(record_err) = recorded {
        tracing::error!(account_number, error = %record_err, "failed to record failure transaction");
    }
}

async fn query_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<QueryTransactionResponse>, AppError> {
    let entry = state.transactions.query_transaction(&transaction_id).await?;
    let account = state.accounts.get_account(entry.account_id).await?;
    Ok(Json(QueryTransactionResponse {
        account_number: account.account_number,
        transaction_type: entry.transaction_type,
        transaction_result: entry.result_type,
        transaction_id: entry.transaction_id,
        amount: entry.amount,
        transacted_at: entry.transacted_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_balance_request_deserialize() {
        let json = r#"{
            "user_id": 1,
            "account_number": "1000000000",
            "amount": 300
        }"#;

        let request: UseBalanceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.user_id, 1);
        assert_eq!(request.account_number, "1000000000");
        assert_eq!(request.amount, 300);
    }

    #[test]
    fn test_cancel_balance_request_deserialize() {
        let json = r#"{
            "transaction_id": "5d011bb6d73c4dfd9f6fb0a3a6a9f26a",
            "account_number": "1000000000",
            "amount": 300
        }"#;

        let request: CancelBalanceRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.transaction_id, "5d011bb6d73c4dfd9f6fb0a3a6a9f26a");
    }

    #[test]
    fn test_transaction_response_serializes_result_as_text() {
        let response = TransactionResponse {
            account_number: "1000000000".to_string(),
            transaction_result: TransactionResultType::Success,
            transaction_id: "abc".to_string(),
            amount: 10,
            transacted_at: Utc::now(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["transaction_result"], "SUCCESS");
        assert_eq!(json["account_number"], "1000000000");
    }
}
