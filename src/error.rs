//! Error handling module
//!
//! Centralized error types and HTTP response conversion. Every domain and
//! lock error kind maps to a distinct machine-readable code so callers can
//! branch on it without parsing messages.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::lock::LockError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Business rule violations
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Per-account lock failures
    #[error(transparent)]
    Lock(#[from] LockError),

    // Server errors (5xx)
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            AppError::Domain(domain_err) => {
                let status = match domain_err {
                    // 404 Not Found
                    DomainError::UserNotFound(_)
                    | DomainError::AccountNotFound(_)
                    | DomainError::TransactionNotFound(_) => StatusCode::NOT_FOUND,

                    // 403 Forbidden
                    DomainError::OwnerMismatch | DomainError::TransactionAccountMismatch(_) => {
                        StatusCode::FORBIDDEN
                    }

                    // 400 Bad Request
                    DomainError::AlreadyUnregistered
                    | DomainError::BalanceNotEmpty { .. }
                    | DomainError::MaxAccountsExceeded
                    | DomainError::AmountExceedsBalance { .. }
                    | DomainError::CancelMustBeFull
                    | DomainError::TooOldToCancel
                    | DomainError::InvalidAmount { .. } => StatusCode::BAD_REQUEST,
                };
                (status, domain_err.error_code())
            }

            AppError::Lock(lock_err) => {
                let status = match lock_err {
                    // 409 Conflict: the account is busy, retry later
                    LockError::Unavailable { .. } => StatusCode::CONFLICT,
                    // 503: the lock backend itself is down
                    LockError::Backend(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, lock_err.error_code())
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error")
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error")
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl AppError {
    /// The domain error inside, if this is a business rule violation.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_status_mapping() {
        let resp = AppError::Domain(DomainError::AccountNotFound("1000000000".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = AppError::Domain(DomainError::OwnerMismatch).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = AppError::Domain(DomainError::MaxAccountsExceeded).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_lock_error_status_mapping() {
        let resp = AppError::Lock(LockError::Unavailable {
            account_number: "1000000000".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::Lock(LockError::Backend("down".into())).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_as_domain() {
        let err = AppError::Domain(DomainError::CancelMustBeFull);
        assert_eq!(err.as_domain(), Some(&DomainError::CancelMustBeFull));

        let err = AppError::Lock(LockError::Backend("down".into()));
        assert!(err.as_domain().is_none());
    }
}
