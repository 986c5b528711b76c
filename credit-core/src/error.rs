//! Error types for the credit core

use crate::types::Tenor;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type for credit operations
pub type Result<T> = std::result::Result<T, CreditError>;

/// Single rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field name as it appears on the wire
    pub field: String,
    /// Human readable reason
    pub message: String,
}

impl FieldError {
    /// New field error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Errors raised by a persistence backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection, query or serialization failure
    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Unique constraint violated
    #[error("Constraint violation: {0}")]
    Conflict(String),
}

impl StoreError {
    /// Wrap any backend error
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }

    /// Backend error from a plain message
    pub fn message(msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        StoreError::Backend(msg.into())
    }
}

/// Store result alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Credit core errors. Every variant names the operation that raised it.
#[derive(Error, Debug)]
pub enum CreditError {
    /// Loan term outside {1, 2, 3, 6}
    #[error("{operation}: Loan Term Invalid ({loan_term})")]
    InvalidTenor {
        /// Operation name
        operation: &'static str,
        /// Raw loan term from the request
        loan_term: i32,
    },

    /// Remaining capacity below the requested total
    #[error(
        "{operation}: Insufficient Credit Limit for consumer {consumer_id} at {tenor} \
         (requested {requested}, remaining {remaining})"
    )]
    InsufficientCreditLimit {
        /// Operation name
        operation: &'static str,
        /// Consumer id
        consumer_id: String,
        /// Tenor checked
        tenor: Tenor,
        /// Requested total amount
        requested: Decimal,
        /// Remaining capacity at decision time
        remaining: Decimal,
    },

    /// Referenced record does not exist
    #[error("{operation}: {entity} not found: {id}")]
    NotFound {
        /// Operation name
        operation: &'static str,
        /// Record kind
        entity: &'static str,
        /// Record id
        id: String,
    },

    /// Request fields failed validation
    #[error("{operation}: validation failed: {}", join_fields(.errors))]
    Validation {
        /// Operation name
        operation: &'static str,
        /// Offending fields
        errors: Vec<FieldError>,
    },

    /// Uniqueness rule violated
    #[error("{operation}: {message}")]
    Conflict {
        /// Operation name
        operation: &'static str,
        /// Conflict description including the offending identifier
        message: String,
    },

    /// Storage failure during read or write
    #[error("{operation}: persistence failure: {source}")]
    PersistenceFailure {
        /// Operation name
        operation: &'static str,
        /// Underlying store error
        #[source]
        source: StoreError,
    },
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CreditError {
    /// Operation that raised the error
    pub fn operation(&self) -> &'static str {
        match self {
            CreditError::InvalidTenor { operation, .. }
            | CreditError::InsufficientCreditLimit { operation, .. }
            | CreditError::NotFound { operation, .. }
            | CreditError::Validation { operation, .. }
            | CreditError::Conflict { operation, .. }
            | CreditError::PersistenceFailure { operation, .. } => operation,
        }
    }

    /// Short machine readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            CreditError::InvalidTenor { .. } => "invalid_tenor",
            CreditError::InsufficientCreditLimit { .. } => "insufficient_credit_limit",
            CreditError::NotFound { .. } => "not_found",
            CreditError::Validation { .. } => "validation_error",
            CreditError::Conflict { .. } => "conflict",
            CreditError::PersistenceFailure { .. } => "persistence_failure",
        }
    }

    /// Attach an operation name to a store error. Unique violations become
    /// `Conflict`, everything else `PersistenceFailure`.
    pub fn from_store(operation: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Conflict(message) => CreditError::Conflict { operation, message },
            source => CreditError::PersistenceFailure { operation, source },
        }
    }

    pub(crate) fn not_found(
        operation: &'static str,
        entity: &'static str,
        id: impl ToString,
    ) -> Self {
        CreditError::NotFound {
            operation,
            entity,
            id: id.to_string(),
        }
    }
}

/// Maps store results into `CreditError` with the operation name attached
pub(crate) trait StoreResultExt<T> {
    fn during(self, operation: &'static str) -> Result<T>;
}

impl<T> StoreResultExt<T> for StoreResult<T> {
    fn during(self, operation: &'static str) -> Result<T> {
        self.map_err(|err| CreditError::from_store(operation, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err = CreditError::from_store("create_consumer", StoreError::Conflict("nik".into()));
        assert!(matches!(err, CreditError::Conflict { operation: "create_consumer", .. }));
    }

    #[test]
    fn test_backend_error_maps_to_persistence_failure() {
        let err =
            CreditError::from_store("create_transaction", StoreError::message("connection reset"));
        assert_eq!(err.kind(), "persistence_failure");
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = CreditError::Validation {
            operation: "create_consumer",
            errors: vec![
                FieldError::new("nik", "must be 16 digits"),
                FieldError::new("salary", "out of range"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "create_consumer: validation failed: nik: must be 16 digits, salary: out of range"
        );
    }

    #[test]
    fn test_invalid_tenor_message() {
        let err = CreditError::InvalidTenor {
            operation: "create_transaction",
            loan_term: 4,
        };
        assert!(err.to_string().contains("Loan Term Invalid"));
        assert_eq!(err.operation(), "create_transaction");
    }
}
