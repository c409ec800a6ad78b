//! Circuit breaker for runaway pagination.
//!
//! A sparse or hostile feed can hand out cursor after cursor of content that
//! the filter throws away.  The breaker counts those pages and stops
//! pagination after `threshold` of them in a row, accepting that a feed may
//! occasionally be cut off a little early.

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreaker {
    consecutive_empty_pages: u32,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_empty_pages: 0,
            threshold,
        }
    }

    /// Record one fetched page: `raw_count` items before filtering,
    /// `filtered_count` after.
    ///
    /// An empty raw page means the source is exhausted; that is left to the
    /// cursor to end and does not move the breaker.
    pub fn record_page(&mut self, raw_count: usize, filtered_count: usize) {
        if filtered_count > 0 {
            if self.consecutive_empty_pages > 0 {
                debug!(previous = self.consecutive_empty_pages, "breaker reset");
            }
            self.consecutive_empty_pages = 0;
        } else if raw_count > 0 {
            self.consecutive_empty_pages += 1;
            if self.consecutive_empty_pages == self.threshold {
                warn!(
                    pages = self.consecutive_empty_pages,
                    "breaker tripped: feed keeps yielding only filtered items"
                );
            }
        }
    }

    pub fn should_continue(&self) -> bool {
        self.consecutive_empty_pages < self.threshold
    }

    pub fn is_tripped(&self) -> bool {
        !self.should_continue()
    }

    pub fn consecutive_empty_pages(&self) -> u32 {
        self.consecutive_empty_pages
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        self.consecutive_empty_pages = 0;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(crate::config::BREAKER_THRESHOLD)
    }
}
