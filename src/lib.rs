//! account_ledger Library
//!
//! Re-exports modules for integration testing and external use.

pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod lock;
pub mod service;
pub mod store;

pub use config::Config;
pub use domain::DomainError;
pub use error::{AppError, AppResult};
pub use lock::{LockError, LockService};
