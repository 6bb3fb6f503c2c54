//! Software catalog domain module (event-sourced).
//!
//! The catalog is the set of internal tools employees can request access to.
//! Entries are created by an Admin and are immutable afterwards; the request
//! engine reads them to validate a request's target and access level.

pub mod access_level;
pub mod software;

pub use access_level::{AccessLevel, AccessLevels};
pub use software::{
    CreateSoftware, SOFTWARE_AGGREGATE_TYPE, Software, SoftwareCommand, SoftwareCreated,
    SoftwareEvent,
};
