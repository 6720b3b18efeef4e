//! Unified error type for the fee ledger, roster and reminder dispatch.
//!
//! `NothingDue`, `AlreadySent` and `InFlight` are not errors; they are
//! dispatch outcomes and live in [`crate::core::dispatch`].

use thiserror::Error;

/// All errors surfaced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration (environment or `config.toml`)
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// The persistence provider could not be reached or rejected the query
    #[error("Persistence error: {message}")]
    Persistence {
        /// Underlying failure description
        message: String,
    },

    /// No student matches the given id or admission number
    #[error("Student not found: {key}")]
    StudentNotFound {
        /// The id or admission number that was looked up
        key: String,
    },

    /// No fee record has the given id
    #[error("Fee record not found: {id}")]
    FeeRecordNotFound {
        /// The fee record id that was looked up
        id: i64,
    },

    /// Another student already uses this admission number
    #[error("Admission number already in use: {admission_number}")]
    DuplicateAdmissionNumber {
        /// The conflicting admission number
        admission_number: String,
    },

    /// The notification sender did not accept the message
    #[error("Delivery failed: {message}")]
    Delivery {
        /// Transport-specific failure description
        message: String,
    },

    /// Fee amounts must be finite and positive
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Billing month outside 1-12 or year not four digits
    #[error("Invalid billing period: {month}/{year}")]
    InvalidPeriod {
        /// Requested month
        month: u32,
        /// Requested year
        year: i32,
    },

    /// Input failed a field-level check
    #[error("Validation error: {message}")]
    Validation {
        /// Which check failed
        message: String,
    },

    /// Required environment variable missing or not unicode
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::Persistence {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
