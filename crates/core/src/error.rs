//! Errors raised by the catalog and request aggregates.

use thiserror::Error;

/// Why an aggregate refused a command.
///
/// These are deterministic: replaying the same command against the same
/// stream gives the same error. Storage and bus failures never show up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Bad input: a blank software name, a duplicate access level, an access
    /// type the software does not offer.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A software, request or user id that is not a UUID.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The command targets a stream with no creation event.
    #[error("not found")]
    NotFound,

    /// A request that already left `Pending`.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A create command against a stream that already has one.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
