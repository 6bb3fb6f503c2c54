//! `accessdesk-auth`: the authorization boundary.
//!
//! Authentication is somebody else's job: this crate consumes an already
//! authenticated identity (user id + role) and decides what it may do. It is
//! decoupled from transport and storage.

pub mod authorize;
pub mod claims;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{
    AuthorizationExplanation, AuthzError, PolicyCell, PolicyContext, authorize, can, explain,
    policy_table,
};
pub use claims::{IdentityClaims, TokenValidationError, validate_claims};
pub use permissions::Action;
pub use principal::{Principal, User};
pub use roles::Role;
