//! Error taxonomy for the treasury core.
//!
//! One enum covers every category of failure this crate surfaces
//! (validation, authorization, state, invariant, concurrency,
//! integration) so callers match on a stable `kind` rather than a
//! grab-bag of ad-hoc strings.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    // --- Validation ---
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("value out of domain range: {0}")]
    DomainRangeError(String),

    #[error("donor amounts ({donor_total}) do not reconcile with diezmos ({diezmos})")]
    DonorMismatch { donor_total: i64, diezmos: i64 },

    #[error("derived field '{0}' may not be supplied by the client")]
    DerivedFieldProvidedByClient(String),

    // --- Authorization ---
    #[error("principal is not authenticated")]
    NotAuthenticated,

    #[error("principal is not permitted to perform this action")]
    Forbidden,

    #[error("principal's scope does not cover this target")]
    OutOfScope,

    // --- State ---
    #[error("illegal transition from {from} via {action}")]
    InvalidTransition { from: String, action: String },

    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: String, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("report package already processed")]
    AlreadyProcessed,

    // --- Invariant ---
    #[error("insufficient funds: balance {balance} cannot cover {amount}")]
    InsufficientFunds { balance: i64, amount: i64 },

    #[error("operation would drive fund balance negative")]
    NegativeBalance,

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    // --- Concurrency ---
    #[error("concurrent update conflict, retry")]
    ConcurrentUpdate,

    #[error("operation exceeded its deadline")]
    Deadline,

    // --- Integration ---
    #[error("blob store unavailable: {0}")]
    BlobStoreUnavailable(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Stable machine-readable kind, used when writing `ActivityLog.*.denied`
    /// rows and in the admin CLI's exit-code mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::InvalidEntry(_) => "InvalidEntry",
            CoreError::MissingField(_) => "MissingField",
            CoreError::DomainRangeError(_) => "DomainRangeError",
            CoreError::DonorMismatch { .. } => "DonorMismatch",
            CoreError::DerivedFieldProvidedByClient(_) => "DerivedFieldProvidedByClient",
            CoreError::NotAuthenticated => "NotAuthenticated",
            CoreError::Forbidden => "Forbidden",
            CoreError::OutOfScope => "OutOfScope",
            CoreError::InvalidTransition { .. } => "InvalidTransition",
            CoreError::AlreadyExists { .. } => "AlreadyExists",
            CoreError::NotFound { .. } => "NotFound",
            CoreError::AlreadyProcessed => "AlreadyProcessed",
            CoreError::InsufficientFunds { .. } => "InsufficientFunds",
            CoreError::NegativeBalance => "NegativeBalance",
            CoreError::UniqueViolation(_) => "UniqueViolation",
            CoreError::ConcurrentUpdate => "ConcurrentUpdate",
            CoreError::Deadline => "Deadline",
            CoreError::BlobStoreUnavailable(_) => "BlobStoreUnavailable",
            CoreError::Persistence(_) => "PersistenceError",
            CoreError::FileNotFound(_) => "FileNotFound",
            CoreError::Config(_) => "ConfigError",
        }
    }

    /// Whether the transport layer may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::ConcurrentUpdate)
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // serialization_failure
                Some("40001") => return CoreError::ConcurrentUpdate,
                // unique_violation
                Some("23505") => {
                    return CoreError::UniqueViolation(
                        db_err.constraint().unwrap_or("unknown").to_string(),
                    )
                }
                _ => {}
            }
        }
        CoreError::Persistence(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_for_matching() {
        let err = CoreError::InsufficientFunds {
            balance: 50_000,
            amount: 80_000,
        };
        assert_eq!(err.kind(), "InsufficientFunds");
        assert!(!err.is_retryable());
    }

    #[test]
    fn concurrent_update_is_retryable() {
        assert!(CoreError::ConcurrentUpdate.is_retryable());
    }
}
