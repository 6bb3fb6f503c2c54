use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accessdesk_auth::User;
use accessdesk_core::{AccessRequestId, SoftwareId, UserId};
use accessdesk_infra::projections::{AccessRequestReadModel, SoftwareReadModel};
use accessdesk_requests::RequestStatus;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NewSoftware {
    pub name: String,
    pub description: String,
    pub access_levels: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAccessRequest {
    pub user_id: UserId,
    pub software_id: SoftwareId,
    pub access_type: String,
    #[serde(default)]
    pub reason: String,
}

/// Offset/limit slice of a listing. `limit: None` means the configured default;
/// an explicit `limit: 0` yields an empty page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    /// Effective limit, capped at `max`.
    pub fn resolve_limit(&self, default: usize, max: usize) -> usize {
        self.limit.unwrap_or(default).min(max)
    }

    pub fn slice<T>(&self, items: Vec<T>, default: usize, max: usize) -> Vec<T> {
        let limit = self.resolve_limit(default, max);
        items.into_iter().skip(self.offset).take(limit).collect()
    }
}

// -------------------------
// Views
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SoftwareView {
    pub id: SoftwareId,
    pub name: String,
    pub description: String,
    pub access_levels: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<SoftwareReadModel> for SoftwareView {
    fn from(rm: SoftwareReadModel) -> Self {
        Self {
            id: rm.software_id,
            name: rm.name,
            description: rm.description,
            access_levels: rm.access_levels,
            created_at: rm.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessRequestView {
    pub id: AccessRequestId,
    pub user_id: UserId,
    pub software_id: SoftwareId,
    pub access_type: String,
    pub reason: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl From<AccessRequestReadModel> for AccessRequestView {
    fn from(rm: AccessRequestReadModel) -> Self {
        Self {
            id: rm.request_id,
            user_id: rm.user_id,
            software_id: rm.software_id,
            access_type: rm.access_type,
            reason: rm.reason,
            status: rm.status,
            created_at: rm.created_at,
            decided_by: rm.decided_by,
            decided_at: rm.decided_at,
        }
    }
}

/// A pending request joined with what a reviewer needs to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRequestView {
    pub request: AccessRequestView,
    pub software: Option<SoftwareView>,
    pub user: Option<User>,
}

/// A user's own view: latest status per software, plus the approved tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MyRequests {
    pub statuses: HashMap<SoftwareId, RequestStatus>,
    pub approved: Vec<SoftwareView>,
}
