use chrono::{DateTime, Utc};

use accessdesk_auth::{IdentityClaims, Principal, TokenValidationError, validate_claims};

/// Identity context for a call into the engine.
///
/// Passed explicitly into every operation. An anonymous context is allowed to
/// exist; every operation rejects it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdentityContext {
    principal: Option<Principal>,
}

impl IdentityContext {
    pub fn new(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    /// Build a context from claims already verified upstream.
    ///
    /// Only the time window is checked here.
    pub fn from_claims(claims: IdentityClaims, now: DateTime<Utc>) -> Result<Self, TokenValidationError> {
        validate_claims(&claims, now)?;
        Ok(Self::new(claims.into_principal()))
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}

impl From<Principal> for IdentityContext {
    fn from(principal: Principal) -> Self {
        Self::new(principal)
    }
}
