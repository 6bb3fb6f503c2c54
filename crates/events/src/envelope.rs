use serde::{Deserialize, Serialize};
use uuid::Uuid;

use accessdesk_core::AggregateId;

/// A committed catalog or request event plus the stream it belongs to.
///
/// Subscribers and the read models receive these. `aggregate_type` tells a
/// software stream (`catalog.software`) from a request stream
/// (`requests.access_request`); `sequence_number` starts at 1 per stream, so
/// a request's submission is always 1 and its decision, if any, is 2.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,

    aggregate_id: AggregateId,
    aggregate_type: String,

    sequence_number: u64,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            payload,
        }
    }

    /// Delivery is at-least-once; subscribers dedupe on this.
    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// The event body, serialized as JSON by the store.
    pub fn payload(&self) -> &E {
        &self.payload
    }
}
