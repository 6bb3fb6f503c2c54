//! Command execution pipeline for event-sourced aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load events from store
//!   ↓
//! 2. Rehydrate aggregate (apply historical events to rebuild state)
//!   ↓
//! 3. Handle command (pure decision logic, produces events)
//!   ↓
//! 4. Persist events to store (append-only, optimistic concurrency check)
//!   ↓
//! 5. Publish events to bus
//! ```
//!
//! Step 4 appends with `ExpectedVersion::Exact(loaded_version)`. Two commands
//! racing on the same stream both pass step 3, but only one append lands; the
//! other gets `DispatchError::Concurrency`.
//!
//! This module contains no IO itself; it composes infrastructure traits.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use accessdesk_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use accessdesk_events::{EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};

#[derive(Debug)]
pub enum DispatchError {
    /// Optimistic concurrency failure (stale aggregate version).
    Concurrency(String),
    /// Loaded stream does not belong to the requested aggregate.
    StreamMismatch(String),
    /// Domain validation failure (deterministic).
    Validation(String),
    /// Lifecycle transition not allowed from the current state.
    InvalidTransition(String),
    /// Aggregate already exists.
    Conflict(String),
    /// Domain authorization failure.
    Unauthorized,
    /// Domain-level not found.
    NotFound,
    /// Failed to deserialize historical event payloads into the aggregate event type.
    Deserialize(String),
    /// Persisting to the event store failed.
    Store(EventStoreError),
}

impl core::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DispatchError::Concurrency(msg) => write!(f, "concurrency conflict: {msg}"),
            DispatchError::StreamMismatch(msg) => write!(f, "stream mismatch: {msg}"),
            DispatchError::Validation(msg) => write!(f, "validation failed: {msg}"),
            DispatchError::InvalidTransition(msg) => write!(f, "invalid transition: {msg}"),
            DispatchError::Conflict(msg) => write!(f, "conflict: {msg}"),
            DispatchError::Unauthorized => f.write_str("unauthorized"),
            DispatchError::NotFound => f.write_str("not found"),
            DispatchError::Deserialize(msg) => write!(f, "event deserialization failed: {msg}"),
            DispatchError::Store(e) => write!(f, "{e}"),
        }
    }
}

impl From<EventStoreError> for DispatchError {
    fn from(value: EventStoreError) -> Self {
        match &value {
            EventStoreError::Concurrency(msg) => DispatchError::Concurrency(msg.clone()),
            _ => DispatchError::Store(value),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => DispatchError::Validation(msg),
            DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvalidTransition(msg) => DispatchError::InvalidTransition(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            DomainError::Unauthorized => DispatchError::Unauthorized,
            DomainError::NotFound => DispatchError::NotFound,
        }
    }
}

/// Reusable command execution engine for event-sourced aggregates.
///
/// Events are persisted before publication: if the append fails nothing is
/// published. Once the append succeeds the command has happened; a failed
/// publish is logged and the committed events are still returned.
///
/// - `S`: event store implementation
/// - `B`: event bus implementation
#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Dispatch a command through the full pipeline.
    ///
    /// `make_aggregate` builds the empty aggregate that history is replayed
    /// onto (e.g. `Software::empty(id)`).
    ///
    /// Returns the committed events with their assigned sequence numbers. An
    /// empty vector means the command was a no-op. Subscribers that miss an
    /// event because publication failed catch up from the store.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<StoredEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: accessdesk_events::Event + Serialize + DeserializeOwned,
    {
        // 1) Load history
        let history = self.store.load_stream(aggregate_id)?;
        validate_loaded_stream(aggregate_id, &history)?;
        let expected = ExpectedVersion::Exact(stream_version(&history));

        // 2) Rehydrate aggregate
        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;

        // 3) Decide events (no mutation)
        let decided = aggregate.handle(&command).map_err(DispatchError::from)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        // 4) Persist (append-only, optimistic)
        let aggregate_type = aggregate_type.into();
        let uncommitted = decided
            .iter()
            .map(|ev| {
                UncommittedEvent::from_typed(aggregate_id, aggregate_type.clone(), Uuid::now_v7(), ev)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let committed = self.store.append(uncommitted, expected)?;
        tracing::debug!(
            aggregate_id = %aggregate_id,
            aggregate_type = %aggregate_type,
            events = committed.len(),
            "events committed"
        );

        // 5) Publish committed events (after append)
        for stored in &committed {
            if let Err(e) = self.bus.publish(stored.to_envelope()) {
                tracing::error!(
                    error = ?e,
                    aggregate_id = %aggregate_id,
                    sequence_number = stored.sequence_number,
                    "publish failed after commit"
                );
            }
        }

        Ok(committed)
    }

    /// Load and rehydrate an aggregate without handling a command.
    ///
    /// Returns `None` when the stream is empty.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Option<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.load_stream(aggregate_id)?;
        if history.is_empty() {
            return Ok(None);
        }
        validate_loaded_stream(aggregate_id, &history)?;

        let mut aggregate = make_aggregate(aggregate_id);
        apply_history::<A>(&mut aggregate, &history)?;
        Ok(Some(aggregate))
    }
}

fn stream_version(stream: &[StoredEvent]) -> u64 {
    stream.last().map(|e| e.sequence_number).unwrap_or(0)
}

fn validate_loaded_stream(aggregate_id: AggregateId, stream: &[StoredEvent]) -> Result<(), DispatchError> {
    // The stream must belong to the aggregate and increase strictly by sequence number.
    let mut last = 0u64;
    for (idx, e) in stream.iter().enumerate() {
        if e.aggregate_id != aggregate_id {
            return Err(DispatchError::StreamMismatch(format!(
                "loaded stream contains wrong aggregate_id at index {idx}"
            )));
        }
        if e.sequence_number == 0 {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(
                "stored event has sequence_number=0".to_string(),
            )));
        }
        if e.sequence_number <= last {
            return Err(DispatchError::Store(EventStoreError::InvalidAppend(format!(
                "non-monotonic sequence_number in loaded stream (last={last}, found={})",
                e.sequence_number
            ))));
        }
        last = e.sequence_number;
    }
    Ok(())
}

fn apply_history<A>(aggregate: &mut A, history: &[StoredEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    let mut sorted = history.to_vec();
    sorted.sort_by_key(|e| e.sequence_number);

    for stored in sorted {
        let ev: A::Event = serde_json::from_value(stored.payload)
            .map_err(|e| DispatchError::Deserialize(e.to_string()))?;
        aggregate.apply(&ev);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use accessdesk_catalog::{
        CreateSoftware, SOFTWARE_AGGREGATE_TYPE, Software, SoftwareCommand,
    };
    use accessdesk_core::{AccessRequestId, SoftwareId, UserId};
    use accessdesk_events::InMemoryEventBus;
    use accessdesk_requests::{
        ACCESS_REQUEST_AGGREGATE_TYPE, AccessRequest, AccessRequestCommand, DecideRequest,
        Decision, SubmitRequest,
    };
    use chrono::Utc;

    use crate::event_store::InMemoryEventStore;

    type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

    fn dispatcher() -> Dispatcher {
        CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(InMemoryEventBus::new()))
    }

    fn create_software(d: &Dispatcher) -> Software {
        let id = SoftwareId::new();
        d.dispatch(
            id.into(),
            SOFTWARE_AGGREGATE_TYPE,
            SoftwareCommand::Create(CreateSoftware {
                software_id: id,
                name: "Figma".to_string(),
                description: "Design".to_string(),
                access_levels: vec!["Read".to_string(), "Write".to_string()],
                created_by: UserId::new(),
                occurred_at: Utc::now(),
            }),
            |agg| Software::empty(agg.into()),
        )
        .unwrap();
        d.load(id.into(), |agg| Software::empty(agg.into())).unwrap().unwrap()
    }

    #[test]
    fn dispatch_persists_and_publishes() {
        let d = dispatcher();
        let sub = d.bus().subscribe();
        let software = create_software(&d);

        assert!(software.is_created());
        let published = sub.drain();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].aggregate_type(), SOFTWARE_AGGREGATE_TYPE);
        assert_eq!(published[0].sequence_number(), 1);
    }

    struct BrokenBus;

    impl EventBus<EventEnvelope<JsonValue>> for BrokenBus {
        type Error = &'static str;

        fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
            Err("bus offline")
        }

        fn subscribe(&self) -> accessdesk_events::Subscription<EventEnvelope<JsonValue>> {
            let (_tx, rx) = std::sync::mpsc::channel();
            accessdesk_events::Subscription::new(rx)
        }
    }

    #[test]
    fn failed_publish_still_returns_the_committed_events() {
        let d = CommandDispatcher::new(InMemoryEventStore::new(), BrokenBus);
        let id = SoftwareId::new();

        let committed = d
            .dispatch(
                id.into(),
                SOFTWARE_AGGREGATE_TYPE,
                SoftwareCommand::Create(CreateSoftware {
                    software_id: id,
                    name: "Jira".to_string(),
                    description: "Tickets".to_string(),
                    access_levels: vec!["Read".to_string()],
                    created_by: UserId::new(),
                    occurred_at: Utc::now(),
                }),
                |agg| Software::empty(agg.into()),
            )
            .unwrap();

        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].sequence_number, 1);
        assert_eq!(d.store().load_stream(id.into()).unwrap(), committed);
    }

    #[test]
    fn load_of_unknown_stream_is_none() {
        let d = dispatcher();
        let loaded = d.load(AggregateId::new(), |agg| Software::empty(agg.into())).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn domain_errors_are_mapped_and_nothing_is_written() {
        let d = dispatcher();
        let software = create_software(&d);
        let request_id = AccessRequestId::new();

        let err = d
            .dispatch(
                request_id.into(),
                ACCESS_REQUEST_AGGREGATE_TYPE,
                AccessRequestCommand::Submit(SubmitRequest {
                    request_id,
                    user_id: UserId::new(),
                    software_id: software.id_typed(),
                    access_type: "Admin".to_string(),
                    reason: "need it".to_string(),
                    offered_levels: software.access_levels().unwrap().clone(),
                    occurred_at: Utc::now(),
                }),
                |agg| AccessRequest::empty(agg.into()),
            )
            .unwrap_err();

        assert!(matches!(err, DispatchError::Validation(_)));
        assert!(d.store().load_stream(request_id.into()).unwrap().is_empty());
    }

    #[test]
    fn second_decision_is_an_invalid_transition() {
        let d = dispatcher();
        let software = create_software(&d);
        let request_id = AccessRequestId::new();
        let make = |agg: AggregateId| AccessRequest::empty(agg.into());

        d.dispatch(
            request_id.into(),
            ACCESS_REQUEST_AGGREGATE_TYPE,
            AccessRequestCommand::Submit(SubmitRequest {
                request_id,
                user_id: UserId::new(),
                software_id: software.id_typed(),
                access_type: "Read".to_string(),
                reason: "onboarding".to_string(),
                offered_levels: software.access_levels().unwrap().clone(),
                occurred_at: Utc::now(),
            }),
            make,
        )
        .unwrap();

        let decide = |decision| {
            AccessRequestCommand::Decide(DecideRequest {
                request_id,
                decision,
                decided_by: UserId::new(),
                occurred_at: Utc::now(),
            })
        };

        d.dispatch(request_id.into(), ACCESS_REQUEST_AGGREGATE_TYPE, decide(Decision::Approve), make)
            .unwrap();
        let err = d
            .dispatch(request_id.into(), ACCESS_REQUEST_AGGREGATE_TYPE, decide(Decision::Reject), make)
            .unwrap_err();

        assert!(matches!(err, DispatchError::InvalidTransition(_)));
        assert_eq!(d.store().load_stream(request_id.into()).unwrap().len(), 2);
    }
}
