//! Per-session service handles.

use tracing::info;

use crate::cache::RequestCache;
use crate::source::{BoxScore, CommentListing, SearchPage, ThreadLookup};

/// The request caches shared by every feed in one logical session.
///
/// Cloning is cheap and yields handles onto the same caches, so two feeds
/// built from clones of one `Session` coalesce identical requests.
#[derive(Clone, Default)]
pub struct Session {
    search: RequestCache<SearchPage>,
    threads: RequestCache<ThreadLookup>,
    comments: RequestCache<CommentListing>,
    box_scores: RequestCache<BoxScore>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &RequestCache<SearchPage> {
        &self.search
    }

    pub fn threads(&self) -> &RequestCache<ThreadLookup> {
        &self.threads
    }

    pub fn comments(&self) -> &RequestCache<CommentListing> {
        &self.comments
    }

    pub fn box_scores(&self) -> &RequestCache<BoxScore> {
        &self.box_scores
    }

    /// End the session: every in-flight entry is forgotten.
    pub fn clear(&self) {
        info!("session cleared");
        self.search.clear();
        self.threads.clear();
        self.comments.clear();
        self.box_scores.clear();
    }
}
