//! Cancellable one-shot timers that report back as messages.
//!
//! A [`DebounceTimer`] owns at most one armed timer.  Arming it again aborts
//! the previous sleep task and hands out a fresh [`Ticket`].  The message a
//! timer delivers carries its ticket, and [`DebounceTimer::fire`] only accepts
//! the current one, so a message that a superseded timer managed to queue
//! before it was aborted is recognised and ignored.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Identifies one arming of a [`DebounceTimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct DebounceTimer {
    seq: u64,
    armed: Option<(Ticket, JoinHandle<()>)>,
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer: after `delay`, `make(ticket)` is sent on `tx`.
    /// Any previously armed timer is cancelled first.
    pub fn schedule<M, F>(&mut self, delay: Duration, tx: &UnboundedSender<M>, make: F) -> Ticket
    where
        M: Send + 'static,
        F: FnOnce(Ticket) -> M + Send + 'static,
    {
        self.cancel();
        self.seq += 1;
        let ticket = Ticket(self.seq);
        let deadline = Instant::now() + delay;
        let tx = tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let _ = tx.send(make(ticket));
        });
        self.armed = Some((ticket, handle));
        ticket
    }

    /// Disarm.  Returns whether a timer was armed.
    pub fn cancel(&mut self) -> bool {
        match self.armed.take() {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Accept a delivered ticket.  True only for the currently armed ticket,
    /// which also disarms the timer.
    pub fn fire(&mut self, ticket: Ticket) -> bool {
        match &self.armed {
            Some((current, _)) if *current == ticket => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
