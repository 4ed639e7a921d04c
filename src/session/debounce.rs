//! Debounce state machine.
//!
//! Pure bookkeeping: the caller supplies the clock and decides how to wait
//! for [`DebounceScheduler::deadline`]. See `session.rs` for the tokio
//! driver.

use std::time::Duration;
use tokio::time::Instant;

/// Default quiescence window
pub const DEFAULT_QUIESCENCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending { version: u64, due: Instant },
    Cancelled { version: u64 },
}

/// Handle for one scheduled run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub version: u64,
    pub due: Instant,
}

#[derive(Debug, Clone)]
pub struct DebounceScheduler {
    window: Duration,
    version: u64,
    state: DebounceState,
}

impl DebounceScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            version: 0,
            state: DebounceState::Idle,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Version of the most recent change
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_current(&self, version: u64) -> bool {
        version == self.version
    }

    /// Record an input change at `now`
    ///
    /// Supersedes any pending run and starts a fresh window.
    pub fn notify_change(&mut self, now: Instant) -> Ticket {
        self.version += 1;
        let ticket = Ticket {
            version: self.version,
            due: now + self.window,
        };

        if let DebounceState::Pending { version, .. } = self.state {
            tracing::trace!("Debounce v{} superseded by v{}", version, ticket.version);
        }

        self.state = DebounceState::Pending {
            version: ticket.version,
            due: ticket.due,
        };
        ticket
    }

    /// When the pending run is due, if any
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Pending { due, .. } => Some(due),
            _ => None,
        }
    }

    /// Timer callback for `ticket`
    ///
    /// Returns the version to compute when the ticket is still the pending
    /// one and its window has elapsed; the scheduler then goes idle. Stale,
    /// cancelled or early tickets are no-ops.
    pub fn fire(&mut self, ticket: Ticket, now: Instant) -> Option<u64> {
        match self.state {
            DebounceState::Pending { version, due }
                if version == ticket.version && due <= now =>
            {
                self.state = DebounceState::Idle;
                Some(version)
            }
            _ => None,
        }
    }

    /// Fire whatever is pending if its window has elapsed
    pub fn poll(&mut self, now: Instant) -> Option<u64> {
        match self.state {
            DebounceState::Pending { version, due } => self.fire(Ticket { version, due }, now),
            _ => None,
        }
    }

    /// Drop the pending run. Idempotent.
    pub fn cancel(&mut self) {
        if let DebounceState::Pending { version, .. } = self.state {
            self.state = DebounceState::Cancelled { version };
        }
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIESCENCE)
    }
}
