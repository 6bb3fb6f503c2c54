//! Demo: runs the catalog → request → decision flow against the in-memory
//! stack with logging enabled.

use anyhow::Context;

use accessdesk_auth::{Principal, Role};
use accessdesk_core::UserId;
use accessdesk_engine::{AccessDesk, IdentityContext, NewAccessRequest, NewSoftware, Page};
use accessdesk_infra::{AccessDeskConfig, LogFormat};
use accessdesk_observability::LoggingConfig;
use accessdesk_requests::RequestStatus;

fn main() -> anyhow::Result<()> {
    let config = AccessDeskConfig::from_env().context("invalid configuration")?;
    accessdesk_observability::init(&LoggingConfig {
        filter: config.log_filter.clone(),
        json: config.log_format == LogFormat::Json,
    });

    let desk = AccessDesk::in_memory(config);
    let events = desk.subscribe();

    let admin = IdentityContext::new(Principal::new(UserId::new(), "root", Role::Admin));
    let manager = IdentityContext::new(Principal::new(UserId::new(), "mia", Role::Manager));
    let alice_id = UserId::new();
    let alice = IdentityContext::new(Principal::new(alice_id, "alice", Role::Employee));

    let crm = desk.create_software(
        &admin,
        NewSoftware {
            name: "CRM".to_string(),
            description: "Customer relationship management".to_string(),
            access_levels: vec!["Read".to_string(), "Write".to_string()],
        },
    )?;

    let request = desk.create_request(
        &alice,
        NewAccessRequest {
            user_id: alice_id,
            software_id: crm.id,
            access_type: "Write".to_string(),
            reason: "onboarding".to_string(),
        },
    )?;
    tracing::info!(status = %request.status, "alice requested CRM write access");

    let pending = desk.list_pending(&manager)?;
    tracing::info!(count = pending.len(), "pending requests for review");

    let decided = desk.decide(&manager, request.id, RequestStatus::Approved)?;
    tracing::info!(status = %decided.status, "manager decided");

    match desk.decide(&manager, request.id, RequestStatus::Rejected) {
        Ok(_) => anyhow::bail!("second decision unexpectedly succeeded"),
        Err(err) => tracing::info!(error = %err, "second decision refused"),
    }

    match desk.decide(&alice, request.id, RequestStatus::Cancelled) {
        Ok(_) => anyhow::bail!("employee decision unexpectedly succeeded"),
        Err(err) => tracing::info!(error = %err, "employee decision refused"),
    }

    let mine = desk.list_mine(&alice, alice_id)?;
    let catalog = desk.list_software(&alice, Page::default())?;
    tracing::info!(
        crm_status = ?mine.statuses.get(&crm.id),
        approved = mine.approved.len(),
        catalog = catalog.len(),
        events = events.drain().len(),
        "done"
    );

    Ok(())
}
