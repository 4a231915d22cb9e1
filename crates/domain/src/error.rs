//! Unified error type for the domain layer.

use thiserror::Error;

/// Errors raised by domain types themselves, without any I/O involved.
///
/// Request-level validation is handled by the `validator` derive on
/// `BookingRequest`, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Parse error (for value objects such as slot times)
    #[error("Parse error: {0}")]
    Parse(String),
}
