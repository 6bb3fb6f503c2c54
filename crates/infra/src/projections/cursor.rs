use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use accessdesk_core::AggregateId;

/// Outcome of checking an incoming sequence number against a stream cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CursorCheck {
    /// Next event for the stream; apply it.
    Apply,
    /// Already applied (redelivery); skip it.
    Duplicate,
    /// Out of order or invalid.
    Gap { last: u64, found: u64 },
}

/// Per-stream "last applied sequence number" bookkeeping plus a projection
/// wide position counter for stable ordering of records.
#[derive(Debug, Default)]
pub struct ProjectionCursors {
    last_seen: RwLock<HashMap<AggregateId, u64>>,
    position: AtomicU64,
}

impl ProjectionCursors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, aggregate_id: AggregateId) -> u64 {
        match self.last_seen.read() {
            Ok(cursors) => cursors.get(&aggregate_id).copied().unwrap_or(0),
            Err(_) => 0,
        }
    }

    pub fn check(&self, aggregate_id: AggregateId, seq: u64) -> CursorCheck {
        let last = self.get(aggregate_id);
        if seq == 0 {
            return CursorCheck::Gap { last, found: seq };
        }
        if seq <= last {
            return CursorCheck::Duplicate;
        }
        if seq != last + 1 {
            return CursorCheck::Gap { last, found: seq };
        }
        CursorCheck::Apply
    }

    pub fn advance(&self, aggregate_id: AggregateId, seq: u64) {
        if let Ok(mut cursors) = self.last_seen.write() {
            cursors.insert(aggregate_id, seq);
        }
    }

    /// Hand out the next position (1, 2, 3, ...).
    pub fn next_position(&self) -> u64 {
        self.position.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn reset(&self) {
        if let Ok(mut cursors) = self.last_seen.write() {
            cursors.clear();
        }
        self.position.store(0, Ordering::SeqCst);
    }
}
