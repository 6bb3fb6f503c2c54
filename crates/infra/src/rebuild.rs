use anyhow::Context;

use accessdesk_core::{AccessRequestId, SoftwareId};

use crate::event_store::EventStore;
use crate::projections::{
    AccessRequestReadModel, AccessRequestsProjection, SoftwareCatalogProjection, SoftwareReadModel,
};
use crate::read_model::ReadStore;

/// Rebuild both read models from the full event log.
///
/// Returns the number of events replayed.
pub fn rebuild_read_models<E, SS, RS>(
    store: &E,
    software: &SoftwareCatalogProjection<SS>,
    requests: &AccessRequestsProjection<RS>,
) -> anyhow::Result<usize>
where
    E: EventStore,
    SS: ReadStore<SoftwareId, SoftwareReadModel>,
    RS: ReadStore<AccessRequestId, AccessRequestReadModel>,
{
    let log = store.load_all().context("loading event log")?;
    let envelopes: Vec<_> = log.iter().map(|e| e.to_envelope()).collect();

    software
        .rebuild_from_scratch(envelopes.iter().cloned())
        .context("rebuilding software catalog")?;
    requests
        .rebuild_from_scratch(envelopes)
        .context("rebuilding access requests")?;

    tracing::info!(events = log.len(), "read models rebuilt");
    Ok(log.len())
}
