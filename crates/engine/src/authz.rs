//! Engine-side authorization guard.
//!
//! Runs before any read or dispatch so a denied call never touches state.

use accessdesk_auth::{Action, AuthzError, PolicyContext, Principal, authorize, explain};
use accessdesk_core::UserId;

use crate::context::IdentityContext;
use crate::errors::AccessError;

/// Check that the caller may perform `action`, optionally on a resource owned
/// by `owner`. Denials are logged with the policy's explanation.
pub fn require<'a>(
    identity: &'a IdentityContext,
    action: Action,
    owner: Option<UserId>,
) -> Result<&'a Principal, AccessError> {
    match authorize(identity.principal(), action, owner) {
        Ok(principal) => Ok(principal),
        Err(AuthzError::MissingIdentity) => {
            tracing::warn!(action = %action, "denied: missing identity");
            Err(AuthzError::MissingIdentity.into())
        }
        Err(err) => {
            if let Some(principal) = identity.principal() {
                let ctx = PolicyContext {
                    actor: principal.user_id,
                    owner,
                };
                let explanation = explain(principal.role, action, &ctx);
                tracing::warn!(
                    actor = %principal.user_id,
                    role = %principal.role,
                    action = %action,
                    reason = %explanation.reason,
                    "denied"
                );
            }
            Err(err.into())
        }
    }
}
