//! Keystrokes to committed search intents.
//!
//! The debouncer only decides *when* a commit happens.  The text that gets
//! committed is whatever the feed holds at that moment, so a burst of
//! keystrokes always commits its final text.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;

use crate::timer::{DebounceTimer, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// A commit is pending under this ticket.
    Armed(Ticket),
    /// The text is empty: nothing pending, the feed should clear now.
    Cleared,
}

#[derive(Debug)]
pub struct SearchDebouncer {
    quiet: Duration,
    timer: DebounceTimer,
}

impl SearchDebouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            timer: DebounceTimer::new(),
        }
    }

    /// Every edit re-arms the quiet window; emptying the text cancels it.
    pub fn on_input<M, F>(&mut self, text: &str, tx: &UnboundedSender<M>, make: F) -> DebounceOutcome
    where
        M: Send + 'static,
        F: FnOnce(Ticket) -> M + Send + 'static,
    {
        if text.trim().is_empty() {
            self.timer.cancel();
            return DebounceOutcome::Cleared;
        }
        trace!(quiet_ms = self.quiet.as_millis() as u64, "search debounce re-armed");
        DebounceOutcome::Armed(self.timer.schedule(self.quiet, tx, make))
    }

    /// Manual commit (enter, pull-to-refresh).  Returns the text to commit, or
    /// `None` for empty text, which is ignored.
    pub fn trigger(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.timer.cancel();
        Some(text.to_string())
    }

    /// True when `ticket` is the pending commit; the caller then commits.
    pub fn on_elapsed(&mut self, ticket: Ticket) -> bool {
        self.timer.fire(ticket)
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }
}
