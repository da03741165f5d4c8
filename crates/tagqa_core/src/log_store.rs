use std::time::{Duration, Instant};

use crate::NetworkEvent;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One pending slot, re-armed by every trigger, fired once the triggers go quiet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsingScheduler {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl CollapsingScheduler {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn quiet_window(&self) -> Duration {
        self.quiet
    }

    /// Pushes the deadline to `now + quiet`, replacing any earlier one.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true exactly once per armed window, when `now` has reached the deadline.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Append-only, arrival-ordered network log with a debounced "matching is stale" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStore {
    events: Vec<NetworkEvent>,
    scheduler: CollapsingScheduler,
}

impl Default for LogStore {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl LogStore {
    pub fn new(debounce: Duration) -> Self {
        Self {
            events: Vec::new(),
            scheduler: CollapsingScheduler::new(debounce),
        }
    }

    /// Appends at the tail and re-arms the recompute timer. Returns the new event's position.
    pub fn append(&mut self, event: NetworkEvent, now: Instant) -> usize {
        self.events.push(event);
        self.scheduler.arm(now);
        self.events.len() - 1
    }

    /// Drops every event and any pending recompute.
    pub fn clear(&mut self) {
        self.events.clear();
        self.scheduler.cancel();
    }

    pub fn snapshot(&self) -> &[NetworkEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn recompute_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    /// Consumes the pending recompute if its quiet window has elapsed.
    pub fn recompute_due(&mut self, now: Instant) -> bool {
        self.scheduler.take_due(now)
    }

    /// Drops the pending recompute; used when the caller recomputes eagerly.
    pub fn settle(&mut self) {
        self.scheduler.cancel();
    }
}
