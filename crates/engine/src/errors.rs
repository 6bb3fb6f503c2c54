use thiserror::Error;

use accessdesk_auth::AuthzError;
use accessdesk_core::DomainError;
use accessdesk_infra::DispatchError;

/// Failure of an engine operation.
///
/// Every variant is terminal for the call and nothing was persisted. Messages
/// are safe to show to an end user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Storage or bus failure. The detail is logged, not returned.
    #[error("service temporarily unavailable")]
    Unavailable,
}

pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    /// Short machine-readable kind, handy for transports and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AccessError::Validation(_) => "validation_error",
            AccessError::NotFound(_) => "not_found",
            AccessError::Authorization(_) => "authorization_error",
            AccessError::InvalidTransition(_) => "invalid_transition",
            AccessError::Unavailable => "unavailable",
        }
    }
}

impl From<AuthzError> for AccessError {
    fn from(value: AuthzError) -> Self {
        match value {
            AuthzError::MissingIdentity => AccessError::Authorization("missing identity".to_string()),
            other => AccessError::Authorization(other.to_string()),
        }
    }
}

impl From<DomainError> for AccessError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => AccessError::Validation(msg),
            DomainError::NotFound => AccessError::NotFound("resource"),
            DomainError::InvalidTransition(msg) => AccessError::InvalidTransition(msg),
            DomainError::Conflict(msg) => AccessError::Validation(msg),
            DomainError::Unauthorized => AccessError::Authorization("unauthorized".to_string()),
        }
    }
}

impl From<DispatchError> for AccessError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::Validation(msg) | DispatchError::Conflict(msg) => AccessError::Validation(msg),
            DispatchError::InvalidTransition(msg) => AccessError::InvalidTransition(msg),
            DispatchError::NotFound => AccessError::NotFound("resource"),
            DispatchError::Unauthorized => AccessError::Authorization("unauthorized".to_string()),
            // Someone else appended first. Callers that know what the race means
            // (decide) map this before it gets here.
            DispatchError::Concurrency(msg) => {
                tracing::warn!(detail = %msg, "concurrent modification");
                AccessError::InvalidTransition("concurrent modification".to_string())
            }
            other => {
                tracing::error!(error = %other, "infrastructure failure");
                AccessError::Unavailable
            }
        }
    }
}
