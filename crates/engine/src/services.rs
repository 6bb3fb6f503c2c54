//! The Access Request Engine service.
//!
//! `AccessDesk` owns the command dispatcher, the read models and the user
//! directory. Every operation takes an explicit [`IdentityContext`], checks the
//! authorization policy first, and only then reads or dispatches.
//!
//! Writes go through the event store. The committed envelopes are applied to
//! the read models before the operation returns (read-your-writes for the
//! caller) and are also published on the bus for [`AccessDesk::subscribe`].
//!
//! Live projection and view reads share the projection gate; a rebuild holds
//! it exclusively, so nobody observes or writes into a half-rebuilt view.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use anyhow::Context;
use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::instrument;

use accessdesk_auth::{Action, Principal, User};
use accessdesk_catalog::{CreateSoftware, SOFTWARE_AGGREGATE_TYPE, Software, SoftwareCommand};
use accessdesk_core::{AccessRequestId, AggregateId, SoftwareId, UserId};
use accessdesk_events::{EventBus, EventEnvelope, InMemoryEventBus, Subscription};
use accessdesk_infra::command_dispatcher::{CommandDispatcher, DispatchError};
use accessdesk_infra::event_store::{EventStore, InMemoryEventStore, StoredEvent};
use accessdesk_infra::projections::{AccessRequestsProjection, SoftwareCatalogProjection};
use accessdesk_infra::read_model::UserDirectory;
use accessdesk_infra::{AccessDeskConfig, rebuild_read_models};
use accessdesk_requests::{
    ACCESS_REQUEST_AGGREGATE_TYPE, AccessRequest, AccessRequestCommand, DecideRequest, Decision,
    RequestStatus, SubmitRequest,
};

use crate::authz::require;
use crate::context::IdentityContext;
use crate::dto::{
    AccessRequestView, MyRequests, NewAccessRequest, NewSoftware, Page, PendingRequestView,
    SoftwareView,
};
use crate::errors::{AccessError, AccessResult};

pub type InMemoryBus = InMemoryEventBus<EventEnvelope<JsonValue>>;

/// Access Request Engine.
///
/// Shareable across threads (`Arc<AccessDesk>`); all interior state is
/// behind the store's and read models' own locks.
#[derive(Debug)]
pub struct AccessDesk<S = Arc<InMemoryEventStore>, B = Arc<InMemoryBus>> {
    dispatcher: CommandDispatcher<S, B>,
    software: SoftwareCatalogProjection,
    requests: AccessRequestsProjection,
    users: UserDirectory,
    projection_gate: RwLock<()>,
    config: AccessDeskConfig,
}

impl AccessDesk {
    /// In-memory engine.
    pub fn in_memory(config: AccessDeskConfig) -> Self {
        Self::with_parts(
            Arc::new(InMemoryEventStore::new()),
            Arc::new(InMemoryEventBus::new()),
            config,
        )
    }
}

impl Default for AccessDesk {
    fn default() -> Self {
        Self::in_memory(AccessDeskConfig::default())
    }
}

impl<S, B> AccessDesk<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    pub fn with_parts(store: S, bus: B, config: AccessDeskConfig) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(store, bus),
            software: SoftwareCatalogProjection::default(),
            requests: AccessRequestsProjection::default(),
            users: UserDirectory::new(),
            projection_gate: RwLock::new(()),
            config,
        }
    }

    pub fn config(&self) -> &AccessDeskConfig {
        &self.config
    }

    // -------------------------
    // Software catalog
    // -------------------------

    #[instrument(skip(self, identity, input), fields(actor = ?actor(identity)), err)]
    pub fn create_software(
        &self,
        identity: &IdentityContext,
        input: NewSoftware,
    ) -> AccessResult<SoftwareView> {
        let principal = self.guard(identity, Action::CreateSoftware, None)?;

        let software_id = SoftwareId::new();
        let committed = self.dispatcher.dispatch(
            software_id.into(),
            SOFTWARE_AGGREGATE_TYPE,
            SoftwareCommand::Create(CreateSoftware {
                software_id,
                name: input.name,
                description: input.description,
                access_levels: input.access_levels,
                created_by: principal.user_id,
                occurred_at: Utc::now(),
            }),
            |id| Software::empty(id.into()),
        )?;
        self.project(&committed);

        let view = {
            let _views = self.views();
            self.software.get(&software_id).map(SoftwareView::from)
        }
        .ok_or(AccessError::Unavailable)?;
        tracing::info!(software_id = %software_id, name = %view.name, "software created");
        Ok(view)
    }

    #[instrument(skip(self, identity), fields(actor = ?actor(identity)), err)]
    pub fn get_software(
        &self,
        identity: &IdentityContext,
        software_id: SoftwareId,
    ) -> AccessResult<SoftwareView> {
        self.guard(identity, Action::ReadSoftware, None)?;
        let _views = self.views();
        self.software
            .get(&software_id)
            .map(SoftwareView::from)
            .ok_or(AccessError::NotFound("software"))
    }

    /// Software in creation order, sliced by `page`.
    #[instrument(skip(self, identity), fields(actor = ?actor(identity)), err)]
    pub fn list_software(
        &self,
        identity: &IdentityContext,
        page: Page,
    ) -> AccessResult<Vec<SoftwareView>> {
        self.guard(identity, Action::ReadSoftware, None)?;
        let all = {
            let _views = self.views();
            self.software.list()
        };
        Ok(page
            .slice(all, self.config.default_page_size, self.config.max_page_size)
            .into_iter()
            .map(SoftwareView::from)
            .collect())
    }

    // -------------------------
    // Access requests
    // -------------------------

    #[instrument(
        skip(self, identity, input),
        fields(actor = ?actor(identity), software_id = %input.software_id),
        err
    )]
    pub fn create_request(
        &self,
        identity: &IdentityContext,
        input: NewAccessRequest,
    ) -> AccessResult<AccessRequestView> {
        self.guard(identity, Action::CreateAccessRequest, Some(input.user_id))?;

        // The event store is the source of truth for the target.
        let software = self
            .dispatcher
            .load(input.software_id.into(), |id: AggregateId| Software::empty(id.into()))
            .map_err(|err| match err {
                // Some other aggregate's stream.
                DispatchError::Deserialize(_) => AccessError::NotFound("software"),
                other => AccessError::from(other),
            })?
            .filter(Software::is_created)
            .ok_or(AccessError::NotFound("software"))?;
        let offered_levels = software
            .access_levels()
            .cloned()
            .ok_or(AccessError::NotFound("software"))?;

        let request_id = AccessRequestId::new();
        let committed = self.dispatcher.dispatch(
            request_id.into(),
            ACCESS_REQUEST_AGGREGATE_TYPE,
            AccessRequestCommand::Submit(SubmitRequest {
                request_id,
                user_id: input.user_id,
                software_id: input.software_id,
                access_type: input.access_type,
                reason: input.reason,
                offered_levels,
                occurred_at: Utc::now(),
            }),
            |id| AccessRequest::empty(id.into()),
        )?;
        self.project(&committed);

        let view = self.request_view(request_id)?;
        tracing::info!(
            request_id = %request_id,
            user_id = %view.user_id,
            access_type = %view.access_type,
            "access request submitted"
        );
        Ok(view)
    }

    /// Move a pending request to `new_status` (Approved, Rejected or Cancelled).
    ///
    /// Exactly one decision lands per request. A caller that loses a race, or
    /// retries a decision, gets `InvalidTransition`.
    #[instrument(skip(self, identity), fields(actor = ?actor(identity)), err)]
    pub fn decide(
        &self,
        identity: &IdentityContext,
        request_id: AccessRequestId,
        new_status: RequestStatus,
    ) -> AccessResult<AccessRequestView> {
        let principal = self.guard(identity, Action::TransitionAccessRequest, None)?;
        let decision = Decision::try_from(new_status)?;

        let committed = self
            .dispatcher
            .dispatch(
                request_id.into(),
                ACCESS_REQUEST_AGGREGATE_TYPE,
                AccessRequestCommand::Decide(DecideRequest {
                    request_id,
                    decision,
                    decided_by: principal.user_id,
                    occurred_at: Utc::now(),
                }),
                |id| AccessRequest::empty(id.into()),
            )
            .map_err(|err| match err {
                DispatchError::Concurrency(detail) => {
                    tracing::warn!(request_id = %request_id, %detail, "lost decision race");
                    AccessError::invalid_transition("request already decided")
                }
                DispatchError::NotFound | DispatchError::Deserialize(_) => {
                    AccessError::NotFound("access request")
                }
                other => AccessError::from(other),
            })?;
        self.project(&committed);

        let view = self.request_view(request_id)?;
        tracing::info!(
            request_id = %request_id,
            status = %view.status,
            decided_by = %principal.user_id,
            "access request decided"
        );
        Ok(view)
    }

    /// A single request: its owner or any reviewer may read it.
    #[instrument(skip(self, identity), fields(actor = ?actor(identity)), err)]
    pub fn get_request(
        &self,
        identity: &IdentityContext,
        request_id: AccessRequestId,
    ) -> AccessResult<AccessRequestView> {
        // Role check first, then ownership once the owner is known.
        self.guard(identity, Action::ReadOwnAccessRequests, None)?;
        let request = {
            let _views = self.views();
            self.requests.get(&request_id)
        }
        .ok_or(AccessError::NotFound("access request"))?;
        self.guard(identity, Action::ReadOwnAccessRequests, Some(request.user_id))?;
        Ok(request.into())
    }

    /// Pending requests, oldest first, joined with software and requester.
    #[instrument(skip(self, identity), fields(actor = ?actor(identity)), err)]
    pub fn list_pending(&self, identity: &IdentityContext) -> AccessResult<Vec<PendingRequestView>> {
        self.guard(identity, Action::ListPendingAccessRequests, None)?;

        let _views = self.views();
        Ok(self
            .requests
            .pending()
            .into_iter()
            .map(|rm| PendingRequestView {
                software: self.software.get(&rm.software_id).map(SoftwareView::from),
                user: self.users.get(&rm.user_id),
                request: rm.into(),
            })
            .collect())
    }

    /// Latest status per software for `user_id`, plus the approved software.
    #[instrument(skip(self, identity), fields(actor = ?actor(identity)), err)]
    pub fn list_mine(&self, identity: &IdentityContext, user_id: UserId) -> AccessResult<MyRequests> {
        self.guard(identity, Action::ReadOwnAccessRequests, Some(user_id))?;

        let _views = self.views();
        let latest = self.requests.latest_per_software(user_id);
        let statuses = latest
            .iter()
            .map(|(software_id, rm)| (*software_id, rm.status))
            .collect();

        let approved = self
            .software
            .list()
            .into_iter()
            .filter(|s| {
                latest
                    .get(&s.software_id)
                    .is_some_and(|rm| rm.status == RequestStatus::Approved)
            })
            .map(SoftwareView::from)
            .collect();

        Ok(MyRequests { statuses, approved })
    }

    // -------------------------
    // Directory, push, maintenance
    // -------------------------

    /// Feed from the auth collaborator (signup).
    pub fn register_user(&self, user: User) {
        tracing::debug!(user_id = %user.id, role = %user.role, "user registered");
        self.users.register(user);
    }

    /// Every committed lifecycle envelope from now on.
    pub fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
        self.dispatcher.bus().subscribe()
    }

    /// Throw the read models away and replay the event log.
    pub fn rebuild_read_models(&self) -> AccessResult<usize> {
        let _exclusive = self
            .projection_gate
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        rebuild_read_models(self.dispatcher.store(), &self.software, &self.requests).map_err(|e| {
            tracing::error!(error = ?e, "read model rebuild failed");
            AccessError::Unavailable
        })
    }

    // -------------------------
    // Internals
    // -------------------------

    fn guard<'a>(
        &self,
        identity: &'a IdentityContext,
        action: Action,
        owner: Option<UserId>,
    ) -> AccessResult<&'a Principal> {
        let principal = require(identity, action, owner)?;
        self.users.observe(principal);
        Ok(principal)
    }

    fn views(&self) -> RwLockReadGuard<'_, ()> {
        self.projection_gate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn request_view(&self, request_id: AccessRequestId) -> AccessResult<AccessRequestView> {
        let _views = self.views();
        self.requests
            .get(&request_id)
            .map(AccessRequestView::from)
            .ok_or(AccessError::Unavailable)
    }

    /// Apply committed events to the read models. Failures are logged; the
    /// events are committed either way and a rebuild repairs the views.
    fn project(&self, committed: &[StoredEvent]) {
        let _views = self.views();
        for stored in committed {
            if let Err(e) = self.apply(stored) {
                tracing::error!(
                    error = ?e,
                    aggregate_id = %stored.aggregate_id,
                    sequence_number = stored.sequence_number,
                    "projection failed"
                );
            }
        }
    }

    fn apply(&self, stored: &StoredEvent) -> anyhow::Result<()> {
        let envelope = stored.to_envelope();
        self.software
            .apply_envelope(&envelope)
            .context("software catalog")?;
        self.requests
            .apply_envelope(&envelope)
            .context("access requests")?;
        tracing::debug!(event_type = %stored.event_type, "projected");
        Ok(())
    }
}

fn actor(identity: &IdentityContext) -> Option<UserId> {
    identity.principal().map(|p| p.user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accessdesk_auth::Role;

    fn principal(role: Role, name: &str) -> IdentityContext {
        IdentityContext::new(Principal::new(UserId::new(), name, role))
    }

    fn uid(ctx: &IdentityContext) -> UserId {
        ctx.principal().unwrap().user_id
    }

    fn seed(desk: &AccessDesk, admin: &IdentityContext) -> SoftwareView {
        desk.create_software(
            admin,
            NewSoftware {
                name: "CRM".to_string(),
                description: "Customer relations".to_string(),
                access_levels: vec!["Read".to_string(), "Write".to_string()],
            },
        )
        .unwrap()
    }

    #[test]
    fn only_admins_create_software() {
        let desk = AccessDesk::default();
        let manager = principal(Role::Manager, "mia");

        let err = desk
            .create_software(
                &manager,
                NewSoftware {
                    name: "CRM".to_string(),
                    description: "d".to_string(),
                    access_levels: vec!["Read".to_string()],
                },
            )
            .unwrap_err();

        assert!(matches!(err, AccessError::Authorization(_)));
        assert!(desk.software.list().is_empty());
    }

    #[test]
    fn invalid_software_is_a_validation_error() {
        let desk = AccessDesk::default();
        let admin = principal(Role::Admin, "root");

        let err = desk
            .create_software(
                &admin,
                NewSoftware {
                    name: "CRM".to_string(),
                    description: "d".to_string(),
                    access_levels: vec!["Read".to_string(), "Read".to_string()],
                },
            )
            .unwrap_err();

        assert!(matches!(err, AccessError::Validation(_)));
    }

    #[test]
    fn request_against_unknown_software_is_not_found() {
        let desk = AccessDesk::default();
        let alice = principal(Role::Employee, "alice");

        let err = desk
            .create_request(
                &alice,
                NewAccessRequest {
                    user_id: uid(&alice),
                    software_id: SoftwareId::new(),
                    access_type: "Read".to_string(),
                    reason: String::new(),
                },
            )
            .unwrap_err();

        assert_eq!(err, AccessError::NotFound("software"));
    }

    #[test]
    fn employees_request_only_for_themselves() {
        let desk = AccessDesk::default();
        let admin = principal(Role::Admin, "root");
        let alice = principal(Role::Employee, "alice");
        let crm = seed(&desk, &admin);

        let err = desk
            .create_request(
                &alice,
                NewAccessRequest {
                    user_id: UserId::new(),
                    software_id: crm.id,
                    access_type: "Read".to_string(),
                    reason: String::new(),
                },
            )
            .unwrap_err();

        assert!(matches!(err, AccessError::Authorization(_)));
        assert!(desk.requests.pending().is_empty());
    }

    #[test]
    fn pending_is_not_a_decision() {
        let desk = AccessDesk::default();
        let manager = principal(Role::Manager, "mia");

        let err = desk
            .decide(&manager, AccessRequestId::new(), RequestStatus::Pending)
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation(_)));
    }

    #[test]
    fn deciding_an_unknown_request_is_not_found() {
        let desk = AccessDesk::default();
        let manager = principal(Role::Manager, "mia");

        let err = desk
            .decide(&manager, AccessRequestId::new(), RequestStatus::Approved)
            .unwrap_err();
        assert_eq!(err, AccessError::NotFound("access request"));
    }

    #[test]
    fn pending_view_joins_software_and_user() {
        let desk = AccessDesk::default();
        let admin = principal(Role::Admin, "root");
        let alice = principal(Role::Employee, "alice");
        let manager = principal(Role::Manager, "mia");
        let crm = seed(&desk, &admin);

        desk.create_request(
            &alice,
            NewAccessRequest {
                user_id: uid(&alice),
                software_id: crm.id,
                access_type: "Write".to_string(),
                reason: "onboarding".to_string(),
            },
        )
        .unwrap();

        let pending = desk.list_pending(&manager).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].software.as_ref().unwrap().name, "CRM");
        assert_eq!(pending[0].user.as_ref().unwrap().username, "alice");
    }

    #[test]
    fn get_request_is_owner_or_reviewer() {
        let desk = AccessDesk::default();
        let admin = principal(Role::Admin, "root");
        let alice = principal(Role::Employee, "alice");
        let bob = principal(Role::Employee, "bob");
        let crm = seed(&desk, &admin);

        let request = desk
            .create_request(
                &alice,
                NewAccessRequest {
                    user_id: uid(&alice),
                    software_id: crm.id,
                    access_type: "Read".to_string(),
                    reason: String::new(),
                },
            )
            .unwrap();

        assert!(desk.get_request(&alice, request.id).is_ok());
        assert!(desk.get_request(&admin, request.id).is_ok());
        assert!(matches!(
            desk.get_request(&bob, request.id),
            Err(AccessError::Authorization(_))
        ));
        assert!(matches!(
            desk.get_request(&IdentityContext::anonymous(), request.id),
            Err(AccessError::Authorization(_))
        ));
    }

    #[test]
    fn list_software_pages_in_creation_order() {
        let desk = AccessDesk::in_memory(AccessDeskConfig {
            default_page_size: 2,
            max_page_size: 3,
            ..AccessDeskConfig::default()
        });
        let admin = principal(Role::Admin, "root");

        for name in ["A", "B", "C", "D"] {
            desk.create_software(
                &admin,
                NewSoftware {
                    name: name.to_string(),
                    description: "tool".to_string(),
                    access_levels: vec!["Read".to_string()],
                },
            )
            .unwrap();
        }

        let names = |page| -> Vec<String> {
            desk.list_software(&admin, page)
                .unwrap()
                .into_iter()
                .map(|s| s.name)
                .collect()
        };
        assert_eq!(names(Page::default()), vec!["A", "B"]);
        assert_eq!(names(Page::new(1, 50)), vec!["B", "C", "D"]);
        assert_eq!(names(Page::new(3, 2)), vec!["D"]);
    }

    #[test]
    fn subscribers_see_committed_events() {
        let desk = AccessDesk::default();
        let sub = desk.subscribe();
        let admin = principal(Role::Admin, "root");
        seed(&desk, &admin);

        let events = sub.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].aggregate_type(), SOFTWARE_AGGREGATE_TYPE);
    }

    struct OfflineBus;

    impl EventBus<EventEnvelope<JsonValue>> for OfflineBus {
        type Error = &'static str;

        fn publish(&self, _message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
            Err("bus offline")
        }

        fn subscribe(&self) -> Subscription<EventEnvelope<JsonValue>> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    #[test]
    fn committed_decision_is_visible_even_when_the_bus_is_down() {
        let desk = AccessDesk::with_parts(
            Arc::new(InMemoryEventStore::new()),
            OfflineBus,
            AccessDeskConfig::default(),
        );
        let admin = principal(Role::Admin, "root");
        let alice = principal(Role::Employee, "alice");
        let manager = principal(Role::Manager, "mia");

        let crm = desk
            .create_software(
                &admin,
                NewSoftware {
                    name: "CRM".to_string(),
                    description: "Customer relations".to_string(),
                    access_levels: vec!["Read".to_string()],
                },
            )
            .unwrap();
        let request = desk
            .create_request(
                &alice,
                NewAccessRequest {
                    user_id: uid(&alice),
                    software_id: crm.id,
                    access_type: "Read".to_string(),
                    reason: String::new(),
                },
            )
            .unwrap();

        let decided = desk
            .decide(&manager, request.id, RequestStatus::Approved)
            .unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(
            desk.dispatcher.store().load_stream(request.id.into()).unwrap().len(),
            2
        );
        assert!(desk.list_pending(&manager).unwrap().is_empty());

        let mine = desk.list_mine(&alice, uid(&alice)).unwrap();
        assert_eq!(mine.statuses[&crm.id], RequestStatus::Approved);

        let retry = desk
            .decide(&manager, request.id, RequestStatus::Approved)
            .unwrap_err();
        assert!(matches!(retry, AccessError::InvalidTransition(_)));
    }

    #[test]
    fn rebuild_reproduces_the_views() {
        let desk = AccessDesk::default();
        let admin = principal(Role::Admin, "root");
        let alice = principal(Role::Employee, "alice");
        let crm = seed(&desk, &admin);
        let request = desk
            .create_request(
                &alice,
                NewAccessRequest {
                    user_id: uid(&alice),
                    software_id: crm.id,
                    access_type: "Read".to_string(),
                    reason: String::new(),
                },
            )
            .unwrap();
        desk.decide(&admin, request.id, RequestStatus::Rejected).unwrap();

        let before = desk.list_mine(&alice, uid(&alice)).unwrap();
        assert_eq!(desk.rebuild_read_models().unwrap(), 3);
        assert_eq!(desk.list_mine(&alice, uid(&alice)).unwrap(), before);
        assert_eq!(before.statuses[&crm.id], RequestStatus::Rejected);
    }
}
