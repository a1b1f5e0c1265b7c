//! The module contains the errors the engine can throw.
//!
//! The ledger-specific ones are:
//!
//! - [`KeyNotFound`] thrown when a transaction, user, currency or payment
//!   method does not exist (or is not visible to the caller).
//! - [`InvalidStateTransition`] thrown when a transaction or KYC status is
//!   already terminal.
//! - [`InsufficientBalance`] thrown when a debit exceeds the available balance.
//! - [`ConcurrentModification`] thrown when an optimistic guard failed because
//!   another writer got there first.
//!
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidStateTransition`]: EngineError::InvalidStateTransition
//!  [`InsufficientBalance`]: EngineError::InsufficientBalance
//!  [`ConcurrentModification`]: EngineError::ConcurrentModification
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidStateTransition(a), Self::InvalidStateTransition(b)) => a == b,
            (Self::InsufficientBalance(a), Self::InsufficientBalance(b)) => a == b,
            (Self::ConcurrentModification(a), Self::ConcurrentModification(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::InvalidCursor(a), Self::InvalidCursor(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::Unauthorized(a), Self::Unauthorized(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::PasswordHash(a), Self::PasswordHash(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

impl From<bcrypt::BcryptError> for EngineError {
    fn from(value: bcrypt::BcryptError) -> Self {
        Self::PasswordHash(value.to_string())
    }
}
