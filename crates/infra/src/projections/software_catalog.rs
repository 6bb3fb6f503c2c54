use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use accessdesk_catalog::{SOFTWARE_AGGREGATE_TYPE, SoftwareEvent};
use accessdesk_core::{AggregateId, SoftwareId, UserId};
use accessdesk_events::EventEnvelope;

use crate::projections::cursor::{CursorCheck, ProjectionCursors};
use crate::read_model::{InMemoryReadStore, ReadStore};

/// Queryable software read model (catalog listing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareReadModel {
    pub software_id: SoftwareId,
    pub name: String,
    pub description: String,
    pub access_levels: Vec<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// Order in which this projection first saw the software.
    pub position: u64,
}

#[derive(Debug, Error)]
pub enum SoftwareProjectionError {
    #[error("failed to deserialize software event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },
}

#[derive(Debug)]
pub struct SoftwareCatalogProjection<S = InMemoryReadStore<SoftwareId, SoftwareReadModel>>
where
    S: ReadStore<SoftwareId, SoftwareReadModel>,
{
    store: S,
    cursors: ProjectionCursors,
}

impl Default for SoftwareCatalogProjection {
    fn default() -> Self {
        Self::new(InMemoryReadStore::new())
    }
}

impl<S> SoftwareCatalogProjection<S>
where
    S: ReadStore<SoftwareId, SoftwareReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: ProjectionCursors::new(),
        }
    }

    pub fn get(&self, software_id: &SoftwareId) -> Option<SoftwareReadModel> {
        self.store.get(software_id)
    }

    /// Every software record, in creation order.
    pub fn list(&self) -> Vec<SoftwareReadModel> {
        let mut all = self.store.list();
        all.sort_by_key(|s| s.position);
        all
    }

    pub fn apply_envelope(
        &self,
        envelope: &EventEnvelope<JsonValue>,
    ) -> Result<(), SoftwareProjectionError> {
        if envelope.aggregate_type() != SOFTWARE_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();

        match self.cursors.check(aggregate_id, seq) {
            CursorCheck::Duplicate => return Ok(()),
            CursorCheck::Gap { last, found } => {
                return Err(SoftwareProjectionError::NonMonotonicSequence { last, found });
            }
            CursorCheck::Apply => {}
        }

        let ev: SoftwareEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| SoftwareProjectionError::Deserialize(e.to_string()))?;

        match ev {
            SoftwareEvent::Created(e) => {
                if AggregateId::from(e.software_id) != aggregate_id {
                    return Err(SoftwareProjectionError::StreamMismatch(
                        "event software_id does not match envelope aggregate_id".to_string(),
                    ));
                }
                self.store.upsert(
                    e.software_id,
                    SoftwareReadModel {
                        software_id: e.software_id,
                        name: e.name,
                        description: e.description,
                        access_levels: e.access_levels.labels(),
                        created_by: e.created_by,
                        created_at: e.occurred_at,
                        position: self.cursors.next_position(),
                    },
                );
            }
        }

        self.cursors.advance(aggregate_id, seq);
        Ok(())
    }

    /// Drop everything and replay. Envelopes must arrive in commit order.
    pub fn rebuild_from_scratch(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), SoftwareProjectionError> {
        self.store.clear();
        self.cursors.reset();

        for env in envelopes {
            self.apply_envelope(&env)?;
        }
        Ok(())
    }
}
