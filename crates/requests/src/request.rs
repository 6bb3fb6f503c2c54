use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accessdesk_catalog::AccessLevels;
use accessdesk_core::{AccessRequestId, Aggregate, AggregateRoot, DomainError, SoftwareId, UserId};
use accessdesk_events::Event;

use crate::{Decision, RequestStatus};

/// Stream type for access requests.
pub const ACCESS_REQUEST_AGGREGATE_TYPE: &str = "requests.access_request";

/// Aggregate root: AccessRequest.
///
/// # Invariants
/// - `access_type` was one of the target software's access levels at submission.
/// - Status moves `Pending → {Approved | Rejected | Cancelled}` at most once.
/// - A decision touches only status and the decision audit fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRequest {
    id: AccessRequestId,
    user_id: Option<UserId>,
    software_id: Option<SoftwareId>,
    access_type: String,
    reason: String,
    status: RequestStatus,
    created_at: Option<DateTime<Utc>>,
    decided_by: Option<UserId>,
    decided_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl AccessRequest {
    /// Create an empty, not-yet-submitted aggregate instance for rehydration.
    pub fn empty(id: AccessRequestId) -> Self {
        Self {
            id,
            user_id: None,
            software_id: None,
            access_type: String::new(),
            reason: String::new(),
            status: RequestStatus::Pending,
            created_at: None,
            decided_by: None,
            decided_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn id_typed(&self) -> AccessRequestId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn software_id(&self) -> Option<SoftwareId> {
        self.software_id
    }

    pub fn access_type(&self) -> &str {
        &self.access_type
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn decided_by(&self) -> Option<UserId> {
        self.decided_by
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }
}

impl AggregateRoot for AccessRequest {
    type Id = AccessRequestId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: SubmitRequest.
///
/// `offered_levels` is the target software's access levels as loaded by the
/// caller; the aggregate checks membership against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub request_id: AccessRequestId,
    pub user_id: UserId,
    pub software_id: SoftwareId,
    pub access_type: String,
    pub reason: String,
    pub offered_levels: AccessLevels,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DecideRequest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecideRequest {
    pub request_id: AccessRequestId,
    pub decision: Decision,
    pub decided_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRequestCommand {
    Submit(SubmitRequest),
    Decide(DecideRequest),
}

/// Event: RequestSubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSubmitted {
    pub request_id: AccessRequestId,
    pub user_id: UserId,
    pub software_id: SoftwareId,
    pub access_type: String,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RequestDecided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDecided {
    pub request_id: AccessRequestId,
    pub status: RequestStatus,
    pub decided_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRequestEvent {
    Submitted(RequestSubmitted),
    Decided(RequestDecided),
}

impl Event for AccessRequestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AccessRequestEvent::Submitted(_) => "requests.access_request.submitted",
            AccessRequestEvent::Decided(_) => "requests.access_request.decided",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            AccessRequestEvent::Submitted(e) => e.occurred_at,
            AccessRequestEvent::Decided(e) => e.occurred_at,
        }
    }
}

impl Aggregate for AccessRequest {
    type Command = AccessRequestCommand;
    type Event = AccessRequestEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            AccessRequestEvent::Submitted(e) => {
                self.id = e.request_id;
                self.user_id = Some(e.user_id);
                self.software_id = Some(e.software_id);
                self.access_type = e.access_type.clone();
                self.reason = e.reason.clone();
                self.status = RequestStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            AccessRequestEvent::Decided(e) => {
                self.status = e.status;
                self.decided_by = Some(e.decided_by);
                self.decided_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            AccessRequestCommand::Submit(cmd) => self.handle_submit(cmd),
            AccessRequestCommand::Decide(cmd) => self.handle_decide(cmd),
        }
    }
}

impl AccessRequest {
    fn ensure_request_id(&self, request_id: AccessRequestId) -> Result<(), DomainError> {
        if self.id != request_id {
            return Err(DomainError::validation("request_id mismatch"));
        }
        Ok(())
    }

    fn handle_submit(&self, cmd: &SubmitRequest) -> Result<Vec<AccessRequestEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("request already exists"));
        }
        self.ensure_request_id(cmd.request_id)?;

        if !cmd.offered_levels.contains(&cmd.access_type) {
            return Err(DomainError::validation(format!(
                "access type '{}' is not offered (available: {})",
                cmd.access_type,
                cmd.offered_levels.labels().join(", ")
            )));
        }

        Ok(vec![AccessRequestEvent::Submitted(RequestSubmitted {
            request_id: cmd.request_id,
            user_id: cmd.user_id,
            software_id: cmd.software_id,
            access_type: cmd.access_type.clone(),
            reason: cmd.reason.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_decide(&self, cmd: &DecideRequest) -> Result<Vec<AccessRequestEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_request_id(cmd.request_id)?;

        if self.status.is_terminal() {
            return Err(DomainError::invalid_transition(format!(
                "request already {}",
                self.status.as_str().to_lowercase()
            )));
        }

        Ok(vec![AccessRequestEvent::Decided(RequestDecided {
            request_id: cmd.request_id,
            status: cmd.decision.target_status(),
            decided_by: cmd.decided_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}
