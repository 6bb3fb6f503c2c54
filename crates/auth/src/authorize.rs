use serde::Serialize;
use thiserror::Error;

use accessdesk_core::UserId;

use crate::{Action, Principal, Role};

/// Resource context for a policy decision.
///
/// `owner` is the user a request belongs to (or is being created for). `None`
/// means the action is not about any particular user's requests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PolicyContext {
    pub actor: UserId,
    pub owner: Option<UserId>,
}

impl PolicyContext {
    pub fn unowned(actor: UserId) -> Self {
        Self { actor, owner: None }
    }

    pub fn owned_by(actor: UserId, owner: UserId) -> Self {
        Self {
            actor,
            owner: Some(owner),
        }
    }

    fn acts_for_self(&self) -> bool {
        self.owner.is_none_or(|owner| owner == self.actor)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("no authenticated identity")]
    MissingIdentity,

    #[error("forbidden: role '{role}' may not perform '{action}'")]
    Forbidden { role: Role, action: Action },

    #[error("forbidden: '{action}' is limited to the caller's own requests")]
    NotOwner { action: Action },
}

/// The role gate: which roles may attempt which actions at all.
fn role_grants(role: Role, action: Action) -> bool {
    match action {
        Action::CreateSoftware => role == Role::Admin,
        Action::ReadSoftware => true,
        Action::CreateAccessRequest => role == Role::Employee,
        Action::ReadOwnAccessRequests => true,
        Action::ListPendingAccessRequests => role.is_reviewer(),
        Action::TransitionAccessRequest => role.is_reviewer(),
    }
}

/// The ownership rule layered on top of the role gate.
///
/// A request can only be created naming the caller as requester. An Employee
/// only reads their own requests; reviewers read everyone's.
fn ownership_holds(role: Role, action: Action, ctx: &PolicyContext) -> bool {
    match action {
        Action::CreateAccessRequest => ctx.acts_for_self(),
        Action::ReadOwnAccessRequests => role.is_reviewer() || ctx.acts_for_self(),
        _ => true,
    }
}

/// Pure policy decision.
pub fn can(role: Role, action: Action, ctx: &PolicyContext) -> bool {
    role_grants(role, action) && ownership_holds(role, action, ctx)
}

/// Authorize an (optional) principal for an action.
///
/// - No IO
/// - No panics
/// - Absence of an identity is a denial, never a crash
pub fn authorize<'a>(
    principal: Option<&'a Principal>,
    action: Action,
    owner: Option<UserId>,
) -> Result<&'a Principal, AuthzError> {
    let principal = principal.ok_or(AuthzError::MissingIdentity)?;

    if !role_grants(principal.role, action) {
        return Err(AuthzError::Forbidden {
            role: principal.role,
            action,
        });
    }

    let ctx = PolicyContext {
        actor: principal.user_id,
        owner,
    };
    if !ownership_holds(principal.role, action, &ctx) {
        return Err(AuthzError::NotOwner { action });
    }

    Ok(principal)
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub action: Action,
    pub role: Role,
    pub granted: bool,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Roles that the table grants this action to.
    pub granting_roles: Vec<Role>,
}

/// Explain why an authorization decision was made (or would be made).
pub fn explain(role: Role, action: Action, ctx: &PolicyContext) -> AuthorizationExplanation {
    let granting_roles: Vec<Role> = Role::ALL
        .into_iter()
        .filter(|r| role_grants(*r, action))
        .collect();

    let (granted, reason) = if !role_grants(role, action) {
        (
            false,
            format!("role '{role}' is not granted '{action}' (granted to: {granting_roles:?})"),
        )
    } else if !ownership_holds(role, action, ctx) {
        (
            false,
            format!("'{action}' requires the resource owner to be the caller"),
        )
    } else {
        (true, format!("role '{role}' is granted '{action}'"))
    };

    AuthorizationExplanation {
        action,
        role,
        granted,
        reason,
        granting_roles,
    }
}

/// One cell of the role/action table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyCell {
    pub role: Role,
    pub action: Action,
    pub allowed: bool,
}

/// Every (role, action) cell of the role gate, for audit display.
pub fn policy_table() -> Vec<PolicyCell> {
    Role::ALL
        .into_iter()
        .flat_map(|role| {
            Action::ALL.into_iter().map(move |action| PolicyCell {
                role,
                action,
                allowed: role_grants(role, action),
            })
        })
        .collect()
}
