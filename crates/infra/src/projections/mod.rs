//! Projection implementations (read model builders).
//!
//! Projections consume committed events and build query-optimized read models.
//! All projections are:
//! - **Rebuildable**: can be reconstructed from the event log
//! - **Idempotent**: redelivered events are skipped by sequence number

pub mod access_requests;
pub mod cursor;
pub mod software_catalog;

pub use access_requests::{
    AccessRequestProjectionError, AccessRequestReadModel, AccessRequestsProjection,
};
pub use cursor::{CursorCheck, ProjectionCursors};
pub use software_catalog::{SoftwareCatalogProjection, SoftwareProjectionError, SoftwareReadModel};
