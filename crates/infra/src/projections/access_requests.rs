use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use accessdesk_core::{AccessRequestId, AggregateId, SoftwareId, UserId};
use accessdesk_events::EventEnvelope;
use accessdesk_requests::{ACCESS_REQUEST_AGGREGATE_TYPE, AccessRequestEvent, RequestStatus};

use crate::projections::cursor::{CursorCheck, ProjectionCursors};
use crate::read_model::{InMemoryReadStore, ReadStore};

/// Queryable access request read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequestReadModel {
    pub request_id: AccessRequestId,
    pub user_id: UserId,
    pub software_id: SoftwareId,
    pub access_type: String,
    pub reason: String,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub decided_by: Option<UserId>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Submission order as seen by this projection. Breaks `created_at` ties.
    pub position: u64,
}

impl AccessRequestReadModel {
    fn order_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.position)
    }
}

#[derive(Debug, Error)]
pub enum AccessRequestProjectionError {
    #[error("failed to deserialize access request event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("decision for unknown request {0}")]
    UnknownRequest(AccessRequestId),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct AccessRequestsProjection<
    S = InMemoryReadStore<AccessRequestId, AccessRequestReadModel>,
> where
    S: ReadStore<AccessRequestId, AccessRequestReadModel>,
{
    store: S,
    cursors: ProjectionCursors,
}

impl Default for AccessRequestsProjection {
    fn default() -> Self {
        Self::new(InMemoryReadStore::new())
    }
}

impl<S> AccessRequestsProjection<S>
where
    S: ReadStore<AccessRequestId, AccessRequestReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: ProjectionCursors::new(),
        }
    }

    pub fn get(&self, request_id: &AccessRequestId) -> Option<AccessRequestReadModel> {
        self.store.get(request_id)
    }

    /// Pending requests, oldest first.
    pub fn pending(&self) -> Vec<AccessRequestReadModel> {
        let mut pending: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|r| r.status == RequestStatus::Pending)
            .collect();
        pending.sort_by_key(AccessRequestReadModel::order_key);
        pending
    }

    /// Every request a user has made, oldest first.
    pub fn for_user(&self, user_id: UserId) -> Vec<AccessRequestReadModel> {
        let mut mine: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect();
        mine.sort_by_key(AccessRequestReadModel::order_key);
        mine
    }

    /// The most recent request per software for one user.
    pub fn latest_per_software(&self, user_id: UserId) -> HashMap<SoftwareId, AccessRequestReadModel> {
        let mut latest: HashMap<SoftwareId, AccessRequestReadModel> = HashMap::new();
        for request in self.for_user(user_id) {
            // for_user is sorted ascending, so later entries overwrite earlier ones.
            latest.insert(request.software_id, request);
        }
        latest
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), AccessRequestProjectionError> {
        if envelope.aggregate_type() != ACCESS_REQUEST_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        match self.cursors.check(aggregate_id, seq) {
            CursorCheck::Duplicate => return Ok(()),
            CursorCheck::Gap { last, found } => {
                return Err(AccessRequestProjectionError::NonMonotonicSequence { last, found });
            }
            CursorCheck::Apply => {}
        }

        let ev: AccessRequestEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| AccessRequestProjectionError::Deserialize(e.to_string()))?;

        let request_id = match &ev {
            AccessRequestEvent::Submitted(e) => e.request_id,
            AccessRequestEvent::Decided(e) => e.request_id,
        };
        if AggregateId::from(request_id) != aggregate_id {
            return Err(AccessRequestProjectionError::StreamMismatch(
                "event request_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            AccessRequestEvent::Submitted(e) => {
                self.store.upsert(
                    e.request_id,
                    AccessRequestReadModel {
                        request_id: e.request_id,
                        user_id: e.user_id,
                        software_id: e.software_id,
                        access_type: e.access_type,
                        reason: e.reason,
                        status: RequestStatus::Pending,
                        created_at: e.occurred_at,
                        decided_by: None,
                        decided_at: None,
                        position: self.cursors.next_position(),
                    },
                );
            }
            AccessRequestEvent::Decided(e) => {
                let mut rm = self
                    .store
                    .get(&e.request_id)
                    .ok_or(AccessRequestProjectionError::UnknownRequest(e.request_id))?;
                rm.status = e.status;
                rm.decided_by = Some(e.decided_by);
                rm.decided_at = Some(e.occurred_at);
                self.store.upsert(e.request_id, rm);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    /// Drop everything and replay. Envelopes must arrive in commit order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), AccessRequestProjectionError> {
        self.store.clear();
        self.cursors.reset();

        for env in envelopes {
            self.apply_envelope(&env)?;
        }
        Ok(())
    }
}
