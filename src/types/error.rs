//! Error types for the remittance settlement engine
//!
//! This module defines every error the engine and its journal pipeline can raise.
//! Errors carry enough context to be reported directly to an operator.
//!
//! # Error Categories
//!
//! - **Lookup**: `NotFound` for missing or tenant-mismatched entities
//! - **State**: `InvalidState` for cancelled or terminal remittances
//! - **Funds**: `InsufficientFunds` when a request exceeds a remaining balance
//! - **Input**: `ValidationError` for non-positive amounts, missing fields, etc.
//! - **Concurrency**: `Conflict` once lock acquisition retries are exhausted
//! - **Storage**: `Internal` for arithmetic overflow and other storage failures
//! - **Journal I/O**: `IoError` and `ParseError`, raised only by the CSV pipeline

use rust_decimal::Decimal;
use thiserror::Error;

use super::remittance::{RemittanceId, TenantId};

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, SettlementError>;

/// Main error type for the settlement engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettlementError {
    /// Entity does not exist, or belongs to a different tenant
    ///
    /// Tenant mismatches are reported as `NotFound` so that one tenant cannot
    /// guess another tenant's identifiers.
    #[error("{entity} {id} not found for tenant {tenant}")]
    NotFound {
        /// Kind of entity that was looked up
        entity: String,
        /// Identifier (or reference) that was looked up
        id: String,
        /// Tenant performing the lookup
        tenant: TenantId,
    },

    /// Operation is not allowed in the entity's current status
    #[error("Cannot {operation} {entity} {id}: status is {status}")]
    InvalidState {
        /// Kind of entity
        entity: String,
        /// Entity identifier
        id: RemittanceId,
        /// Current status of the entity
        status: String,
        /// Operation that was attempted
        operation: String,
    },

    /// Requested amount exceeds what is left to settle
    ///
    /// The request is rejected rather than clamped so the caller learns that
    /// the balance moved underneath it.
    #[error(
        "Insufficient funds to settle outgoing {outgoing} against incoming {incoming}: available {available}, requested {requested}"
    )]
    InsufficientFunds {
        /// Outgoing remittance id
        outgoing: RemittanceId,
        /// Incoming remittance id
        incoming: RemittanceId,
        /// `min(outgoing.remaining, incoming.remaining)` at the time of the attempt
        available: Decimal,
        /// Requested settlement amount
        requested: Decimal,
    },

    /// Input failed validation
    #[error("Validation failed for {field}: {message}")]
    ValidationError {
        /// Field or parameter that failed validation
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// Could not obtain exclusive access after the configured number of attempts
    #[error("Conflict during {operation} on remittance {id} after {attempts} attempt(s)")]
    Conflict {
        /// Operation that gave up
        operation: String,
        /// Remittance whose lock could not be taken
        id: RemittanceId,
        /// Number of attempts made
        attempts: u32,
    },

    /// Storage failure; state is left unchanged
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },

    /// I/O error while reading a journal or writing a report
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// Journal row could not be parsed
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for SettlementError {
    fn from(error: std::io::Error) -> Self {
        SettlementError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for SettlementError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        SettlementError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl SettlementError {
    /// Create a NotFound error
    pub fn not_found(entity: &str, id: impl ToString, tenant: TenantId) -> Self {
        SettlementError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
            tenant,
        }
    }

    /// Create an InvalidState error
    pub fn invalid_state(
        entity: &str,
        id: RemittanceId,
        status: impl ToString,
        operation: &str,
    ) -> Self {
        SettlementError::InvalidState {
            entity: entity.to_string(),
            id,
            status: status.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(
        outgoing: RemittanceId,
        incoming: RemittanceId,
        available: Decimal,
        requested: Decimal,
    ) -> Self {
        SettlementError::InsufficientFunds {
            outgoing,
            incoming,
            available,
            requested,
        }
    }

    /// Create a ValidationError
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        SettlementError::ValidationError {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(operation: &str, id: RemittanceId, attempts: u32) -> Self {
        SettlementError::Conflict {
            operation: operation.to_string(),
            id,
            attempts,
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        SettlementError::Internal {
            message: message.into(),
        }
    }

    /// Create an Internal error for checked arithmetic that overflowed
    pub fn arithmetic_overflow(operation: &str, id: RemittanceId) -> Self {
        SettlementError::Internal {
            message: format!("arithmetic overflow in {} for remittance {}", operation, id),
        }
    }

    /// Whether a retry of the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SettlementError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::not_found(
        SettlementError::not_found("outgoing remittance", 7, 1),
        "outgoing remittance 7 not found for tenant 1"
    )]
    #[case::invalid_state(
        SettlementError::invalid_state("incoming remittance", 3, "CANCELLED", "settle"),
        "Cannot settle incoming remittance 3: status is CANCELLED"
    )]
    #[case::insufficient_funds(
        SettlementError::insufficient_funds(1, 2, Decimal::new(3000, 2), Decimal::new(5000, 2)),
        "Insufficient funds to settle outgoing 1 against incoming 2: available 30.00, requested 50.00"
    )]
    #[case::validation(
        SettlementError::validation("settle_amount", "must be positive"),
        "Validation failed for settle_amount: must be positive"
    )]
    #[case::conflict(
        SettlementError::conflict("settle", 9, 3),
        "Conflict during settle on remittance 9 after 3 attempt(s)"
    )]
    #[case::parse_error_with_line(
        SettlementError::ParseError { line: Some(42), message: "bad field".to_string() },
        "CSV parse error at line 42: bad field"
    )]
    #[case::parse_error_without_line(
        SettlementError::ParseError { line: None, message: "bad field".to_string() },
        "CSV parse error: bad field"
    )]
    fn test_error_display(#[case] error: SettlementError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_only_conflict_is_retryable() {
        assert!(SettlementError::conflict("settle", 1, 1).is_retryable());
        assert!(!SettlementError::insufficient_funds(1, 2, Decimal::ONE, Decimal::TWO)
            .is_retryable());
        assert!(!SettlementError::internal("boom").is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: SettlementError = io_error.into();
        assert!(matches!(error, SettlementError::IoError { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
