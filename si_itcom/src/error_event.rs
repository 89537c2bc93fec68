//! `ErrorEvent` — one occurrence of a raised fault/info event (spec §3).

use si_common::events::{EventId, NotificationTarget, Severity};

use crate::snapshot::SystemSnapshot;

/// A single occurrence flowing through the `EventQueue` → FM processing
/// pipeline (spec §3). `counter` is filled in by the FM during Stage0
/// (`IncrementCounter`), not at raise time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorEvent {
    pub event_id: EventId,
    pub counter: u64,
    pub severity: Severity,
    pub notification: NotificationTarget,
    pub snapshot: SystemSnapshot,
}

impl ErrorEvent {
    /// Raise a fresh occurrence, capturing `snapshot` now (spec §3: "Captured
    /// into the ErrorEvent at enqueue time, not at processing time"). The
    /// lifetime counter is filled in later by FM Stage0.
    pub fn raise(event_id: EventId, snapshot: SystemSnapshot) -> Self {
        Self {
            event_id,
            counter: 0,
            severity: event_id.severity(),
            notification: event_id.notification_target(),
            snapshot,
        }
    }
}
