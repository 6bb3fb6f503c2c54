/// Execute an aggregate command in memory: decide, then apply each event.
///
/// No persistence and no concurrency control; this is the lifecycle the
/// dispatcher runs minus the store. Useful for aggregate tests.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: accessdesk_core::Aggregate,
{
    let events = A::handle(aggregate, command)?;
    for ev in &events {
        A::apply(aggregate, ev);
    }
    Ok(events)
}
