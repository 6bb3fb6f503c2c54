//! `accessdesk-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod error;
pub mod id;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::DomainError;
pub use id::{AccessRequestId, AggregateId, SoftwareId, UserId};
pub use value_object::ValueObject;
