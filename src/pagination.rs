//! Visibility-driven infinite scroll.
//!
//! The UI owns a [`Viewport`] and reports whether the end-of-list sentinel is
//! on screen.  A feed subscribes through [`PaginationController::attach`],
//! which spawns a small forwarder turning visibility changes into messages on
//! the feed's inbox.  The controller then debounces load-more requests:
//!
//! ```text
//! sentinel visible ──► arm(delay) ──► LoadMoreDue(ticket) ──► gate open? ──► fetch
//!        ▲                                                                     │
//!        └───────────── still visible after the page lands? re-arm ◄──────────┘
//! ```
//!
//! The *gate* is computed by the feed (next cursor present, breaker closed,
//! not halted, nothing in flight); the controller only tracks the sentinel,
//! the timer and the loading flag.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::timer::{DebounceTimer, Ticket};

/// Messages a feed must be able to receive for pagination to drive it.
pub trait PaginationMsg: Send + 'static {
    fn visibility(visible: bool) -> Self;
    fn load_more_due(ticket: Ticket) -> Self;
}

// ---------------------------------------------------------------------------
// Viewport port
// ---------------------------------------------------------------------------

/// The UI side of the visibility signal.
#[derive(Debug)]
pub struct Viewport {
    tx: watch::Sender<bool>,
}

impl Viewport {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Report whether the sentinel is on screen.  Only changes are forwarded.
    pub fn set_sentinel_visible(&self, visible: bool) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == visible {
                false
            } else {
                *current = visible;
                true
            }
        })
    }

    pub fn is_sentinel_visible(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to a [`Viewport`].  Dropping it stops the forwarder.
#[derive(Debug)]
pub struct ObserverRegistration {
    handle: JoinHandle<()>,
}

impl ObserverRegistration {
    fn spawn<M: PaginationMsg>(mut rx: watch::Receiver<bool>, tx: UnboundedSender<M>) -> Self {
        let handle = tokio::spawn(async move {
            let initial = *rx.borrow_and_update();
            if tx.send(M::visibility(initial)).is_err() {
                return;
            }
            while rx.changed().await.is_ok() {
                let visible = *rx.borrow_and_update();
                if tx.send(M::visibility(visible)).is_err() {
                    return;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for ObserverRegistration {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct PaginationController {
    delay: Duration,
    timer: DebounceTimer,
    observer: Option<ObserverRegistration>,
    sentinel_visible: bool,
    loading_more: bool,
}

impl PaginationController {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timer: DebounceTimer::new(),
            observer: None,
            sentinel_visible: false,
            loading_more: false,
        }
    }

    /// Start observing `viewport`, replacing any earlier registration.
    pub fn attach<M: PaginationMsg>(&mut self, viewport: &Viewport, tx: &UnboundedSender<M>) {
        self.observer = Some(ObserverRegistration::spawn(viewport.subscribe(), tx.clone()));
    }

    pub fn is_attached(&self) -> bool {
        self.observer.is_some()
    }

    /// A visibility report arrived.  Returns whether a load-more was armed.
    pub fn on_visibility<M: PaginationMsg>(
        &mut self,
        visible: bool,
        gate_open: bool,
        tx: &UnboundedSender<M>,
    ) -> bool {
        self.sentinel_visible = visible;
        if !visible {
            self.timer.cancel();
            return false;
        }
        self.arm(gate_open, tx)
    }

    /// The debounce elapsed.  Returns true when the caller should fetch the
    /// next page now; the controller is then loading until
    /// [`finish_load`](Self::finish_load).
    pub fn on_due(&mut self, ticket: Ticket, gate_open: bool) -> bool {
        if !self.timer.fire(ticket) {
            debug!("stale load-more timer ignored");
            return false;
        }
        if !self.sentinel_visible || self.loading_more || !gate_open {
            return false;
        }
        self.loading_more = true;
        true
    }

    /// Mark a load as started outside the timer path (manual retry).
    pub fn begin_load(&mut self) {
        self.timer.cancel();
        self.loading_more = true;
    }

    pub fn finish_load(&mut self) {
        self.loading_more = false;
    }

    /// After a page lands: keep going if the sentinel is still on screen.
    pub fn rearm_if_visible<M: PaginationMsg>(
        &mut self,
        gate_open: bool,
        tx: &UnboundedSender<M>,
    ) -> bool {
        self.sentinel_visible && self.arm(gate_open, tx)
    }

    fn arm<M: PaginationMsg>(&mut self, gate_open: bool, tx: &UnboundedSender<M>) -> bool {
        if self.loading_more || !gate_open || self.timer.is_armed() {
            return false;
        }
        self.timer.schedule(self.delay, tx, M::load_more_due);
        true
    }

    /// Forget loading state for a new query.  The observer stays attached.
    pub fn reset(&mut self) {
        self.timer.cancel();
        self.loading_more = false;
    }

    /// Release the timer and the viewport subscription.
    pub fn teardown(&mut self) {
        self.timer.cancel();
        self.observer = None;
        self.sentinel_visible = false;
        self.loading_more = false;
    }

    pub fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn is_armed(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn sentinel_visible(&self) -> bool {
        self.sentinel_visible
    }
}
