//! Access request domain module (event-sourced).
//!
//! An access request is an employee's ask for one access level on one
//! software entry. It starts `Pending` and is decided exactly once by a
//! reviewer; decided requests are kept forever as history.

pub mod request;
pub mod status;

pub use request::{
    ACCESS_REQUEST_AGGREGATE_TYPE, AccessRequest, AccessRequestCommand, AccessRequestEvent,
    DecideRequest, RequestDecided, RequestSubmitted, SubmitRequest,
};
pub use status::{Decision, RequestStatus};
