//! `accessdesk-engine`: the Access Request Engine.
//!
//! Exposes the catalog and access-request operations over an explicit
//! identity context. Transport (HTTP, RPC) is expected to map 1:1 onto the
//! methods of [`AccessDesk`].

pub mod authz;
pub mod context;
pub mod dto;
pub mod errors;
pub mod services;

pub use context::IdentityContext;
pub use dto::{
    AccessRequestView, MyRequests, NewAccessRequest, NewSoftware, Page, PendingRequestView,
    SoftwareView,
};
pub use errors::{AccessError, AccessResult};
pub use services::AccessDesk;
