//! Severity-based bounded `EventQueue` (spec §4.2, §8: `QUEUE_MAX = 32`).

use heapless::Vec;

use crate::error::ItcomError;
use crate::error_event::ErrorEvent;

/// Bound on the number of pending (unprocessed) error events (spec §8).
pub const QUEUE_MAX: usize = 32;

/// Ordered sequence of pending error-event occurrences, bounded by
/// `QUEUE_MAX`, with least-severe eviction under pressure (spec §4.2).
#[derive(Debug, Default)]
pub struct EventQueue {
    entries: Vec<ErrorEvent, QUEUE_MAX>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == QUEUE_MAX
    }

    /// Enqueue policy (spec §4.2): append if there's room; otherwise replace
    /// the least-severe entry if `event` strictly outranks it, else drop.
    /// Returns whether `event` ended up in the queue.
    pub fn enqueue(&mut self, event: ErrorEvent) -> bool {
        if !self.is_full() {
            self.entries
                .push(event)
                .expect("just checked not full");
            return true;
        }

        let least_severe_index = self
            .entries
            .iter()
            .enumerate()
            .min_by_key(|(_, e)| e.severity)
            .map(|(i, _)| i)
            .expect("queue is full, so non-empty");

        if event.severity > self.entries[least_severe_index].severity {
            self.entries[least_severe_index] = event;
            true
        } else {
            false
        }
    }

    /// The head (oldest pending) event, without removing it.
    pub fn head(&self) -> Option<&ErrorEvent> {
        self.entries.first()
    }

    pub fn head_mut(&mut self) -> Option<&mut ErrorEvent> {
        self.entries.first_mut()
    }

    /// Remove and return the head event (Stage3, `DequeueProcessed`).
    pub fn dequeue_head(&mut self) -> Result<ErrorEvent, ItcomError> {
        if self.entries.is_empty() {
            return Err(ItcomError::Empty);
        }
        Ok(self.entries.remove(0))
    }

    /// Drain every remaining entry in order (shutdown: spec §4.2 "SKIPPED EVENT").
    pub fn drain_all(&mut self) -> Vec<ErrorEvent, QUEUE_MAX> {
        core::mem::replace(&mut self.entries, Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ErrorEvent> {
        self.entries.iter()
    }
}
