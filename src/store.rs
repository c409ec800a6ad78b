//! The search feed: one query, its pages, and the machinery that fills them.
//!
//! ```text
//!            commit                   page with items
//!   Idle ───────────► Searching ───────────────────────► Loaded ◄──┐
//!    ▲                 │  │  └── error ──► Errored          │       │
//!    │ empty text      │  └── nothing left ──► Empty        │ due   │ page
//!    └─────────────────┘                                    ▼       │
//!                                                       LoadingMore ┘
//! ```
//!
//! All state lives on [`SearchFeed`] and is mutated only through `&mut self`
//! methods called from the owner's event loop.  Fetches run as spawned tasks
//! and report back as [`FeedMsg::Fetched`] on the feed's inbox; every fetch is
//! stamped with the generation it was issued under, and a commit, a sort
//! change or a clear bumps the generation so late answers for an older query
//! are dropped instead of appended.
//!
//! ## For contributors
//!
//! The owner's loop is always the same three lines:
//!
//! ```ignore
//! let (mut feed, mut inbox) = SearchFeed::new(provider, &session, &config)?;
//! feed.set_text("lakers");
//! while let Some(msg) = inbox.recv().await { feed.apply(msg); }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::breaker::CircuitBreaker;
use crate::cache::{FetchKey, RequestCache, ResourceType};
use crate::config::FeedConfig;
use crate::debounce::{DebounceOutcome, SearchDebouncer};
use crate::error::{FetchError, FetchResult};
use crate::filter::{ContentFilter, SeenIds};
use crate::pagination::{PaginationController, PaginationMsg, Viewport};
use crate::query::{Cursor, FeedQuery, SortMode};
use crate::session::Session;
use crate::source::{FeedItem, SearchPage, SearchProvider};
use crate::timer::Ticket;

/// Which page a fetch asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    First,
    More(Cursor),
}

impl PageRequest {
    fn cursor(&self) -> Option<&Cursor> {
        match self {
            PageRequest::First => None,
            PageRequest::More(cursor) => Some(cursor),
        }
    }
}

/// Everything that can arrive on a search feed's inbox.
#[derive(Debug)]
pub enum FeedMsg {
    /// The search quiet window elapsed.
    SearchDue(Ticket),
    Visibility(bool),
    LoadMoreDue(Ticket),
    Fetched {
        generation: u64,
        request: PageRequest,
        result: FetchResult<SearchPage>,
    },
}

impl PaginationMsg for FeedMsg {
    fn visibility(visible: bool) -> Self {
        FeedMsg::Visibility(visible)
    }

    fn load_more_due(ticket: Ticket) -> Self {
        FeedMsg::LoadMoreDue(ticket)
    }
}

pub type FeedInbox = UnboundedReceiver<FeedMsg>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Idle,
    Searching,
    Loaded,
    Empty,
    Errored(FetchError),
    LoadingMore,
}

/// One applied page.  Pages are appended in request order and never
/// reordered; a new query replaces them all.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    /// Cursor for the page after this one.
    pub cursor: Option<Cursor>,
    pub has_more: bool,
}

pub struct SearchFeed {
    provider: Arc<dyn SearchProvider>,
    cache: RequestCache<SearchPage>,
    filter: ContentFilter,
    debouncer: SearchDebouncer,
    pagination: PaginationController,
    tx: UnboundedSender<FeedMsg>,

    query: FeedQuery,
    /// Text of the query the current pages belong to.
    committed: Option<String>,
    status: FeedStatus,
    pages: Vec<FeedPage>,
    seen: SeenIds,
    breaker: CircuitBreaker,
    cursor: Option<Cursor>,
    /// Set by rate-limit / auth failures; cleared by retry or a new commit.
    halted: bool,
    generation: u64,
    in_flight: Option<PageRequest>,
    failed: Option<PageRequest>,
}

impl SearchFeed {
    pub fn new(
        provider: Arc<dyn SearchProvider>,
        session: &Session,
        config: &FeedConfig,
    ) -> Result<(Self, FeedInbox), regex::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Self {
            provider,
            cache: session.search().clone(),
            filter: ContentFilter::new(&config.denylist)?,
            debouncer: SearchDebouncer::new(config.search_quiet_window),
            pagination: PaginationController::new(config.pagination_delay),
            tx,
            query: FeedQuery::default(),
            committed: None,
            status: FeedStatus::Idle,
            pages: Vec::new(),
            seen: SeenIds::default(),
            breaker: CircuitBreaker::new(config.breaker_threshold),
            cursor: None,
            halted: false,
            generation: 0,
            in_flight: None,
            failed: None,
        };
        Ok((feed, rx))
    }

    // -- intents -------------------------------------------------------------

    /// The search box changed.
    pub fn set_text(&mut self, text: &str) {
        self.query.text = text.to_string();
        let outcome = self
            .debouncer
            .on_input(&self.query.text, &self.tx, FeedMsg::SearchDue);
        if outcome == DebounceOutcome::Cleared {
            self.clear();
        }
    }

    /// Commit the current text now.  Ignored when it is empty.
    pub fn submit(&mut self) {
        if let Some(text) = self.debouncer.trigger(&self.query.text) {
            self.commit(text);
        }
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        if self.query.sort_mode == mode {
            return;
        }
        self.query.sort_mode = mode;
        debug!(sort = %mode, "sort mode changed");
        if self.query.has_searched {
            self.submit();
        }
    }

    pub fn toggle_sort(&mut self) {
        self.set_sort_mode(self.query.sort_mode.toggled());
    }

    /// Re-issue the request that failed: the first page of the committed
    /// query, or the page at the cursor that errored.
    pub fn retry(&mut self) {
        match self.failed.take() {
            Some(PageRequest::First) => {
                if let Some(text) = self.committed.clone() {
                    self.commit(text);
                }
            }
            Some(PageRequest::More(cursor)) => {
                info!(cursor = %cursor, "retrying page");
                self.halted = false;
                self.status = FeedStatus::LoadingMore;
                self.pagination.begin_load();
                self.issue(PageRequest::More(cursor));
            }
            None => {}
        }
    }

    /// Start the committed query over from its first page.
    pub fn refresh(&mut self) {
        if let Some(text) = self.committed.clone() {
            self.commit(text);
        }
    }

    pub fn attach_viewport(&mut self, viewport: &Viewport) {
        self.pagination.attach(viewport, &self.tx);
    }

    /// Stop everything: timers, viewport subscription, in-flight answers.
    pub fn close(&mut self) {
        self.debouncer.cancel();
        self.pagination.teardown();
        self.generation += 1;
        self.in_flight = None;
    }

    // -- event loop ----------------------------------------------------------

    pub fn apply(&mut self, msg: FeedMsg) {
        match msg {
            FeedMsg::SearchDue(ticket) => {
                if self.debouncer.on_elapsed(ticket) {
                    let text = self.query.trimmed().to_string();
                    if !text.is_empty() {
                        self.commit(text);
                    }
                }
            }
            FeedMsg::Visibility(visible) => {
                let gate = self.can_load_more();
                self.pagination.on_visibility(visible, gate, &self.tx);
            }
            FeedMsg::LoadMoreDue(ticket) => {
                let gate = self.can_load_more();
                if !self.pagination.on_due(ticket, gate) {
                    return;
                }
                let Some(cursor) = self.cursor.clone() else {
                    self.pagination.finish_load();
                    return;
                };
                self.status = FeedStatus::LoadingMore;
                self.issue(PageRequest::More(cursor));
            }
            FeedMsg::Fetched {
                generation,
                request,
                result,
            } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "stale response dropped");
                    return;
                }
                if self.in_flight.as_ref() != Some(&request) {
                    debug!(?request, "unexpected page dropped");
                    return;
                }
                self.in_flight = None;
                match result {
                    Ok(page) => self.apply_page(request, page),
                    Err(error) => self.apply_error(request, error),
                }
            }
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            FeedStatus::Errored(e) => Some(e),
            _ => None,
        }
    }

    pub fn query(&self) -> &FeedQuery {
        &self.query
    }

    pub fn committed_query(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    pub fn pages(&self) -> &[FeedPage] {
        &self.pages
    }

    pub fn items(&self) -> impl Iterator<Item = &FeedItem> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn is_loading_more(&self) -> bool {
        self.pagination.is_loading_more()
    }

    // -- internals -----------------------------------------------------------

    fn can_load_more(&self) -> bool {
        self.status == FeedStatus::Loaded
            && self.in_flight.is_none()
            && self.cursor.is_some()
            && self.breaker.should_continue()
            && !self.halted
    }

    fn reset_pages(&mut self) {
        self.generation += 1;
        self.pages.clear();
        self.seen.clear();
        self.breaker.reset();
        self.cursor = None;
        self.halted = false;
        self.in_flight = None;
        self.failed = None;
        self.pagination.reset();
    }

    fn clear(&mut self) {
        self.reset_pages();
        self.committed = None;
        self.query.has_searched = false;
        self.status = FeedStatus::Idle;
        debug!("search cleared");
    }

    fn commit(&mut self, text: String) {
        self.reset_pages();
        info!(query = %text, sort = %self.query.sort_mode, generation = self.generation, "search committed");
        self.committed = Some(text);
        self.query.has_searched = true;
        self.status = FeedStatus::Searching;
        self.issue(PageRequest::First);
    }

    fn fetch_key(&self, query: &str, request: &PageRequest) -> FetchKey {
        let key = FetchKey::new(ResourceType::SearchPage, query)
            .with("sort", self.query.sort_mode.as_query_type());
        match request.cursor() {
            Some(cursor) => key.with("cursor", cursor),
            None => key,
        }
    }

    fn issue(&mut self, request: PageRequest) {
        let Some(query) = self.committed.clone() else {
            return;
        };
        let key = self.fetch_key(&query, &request);
        let sort = self.query.sort_mode;
        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let cache = self.cache.clone();
        let tx = self.tx.clone();
        let fetch_request = request.clone();

        self.in_flight = Some(request.clone());
        tokio::spawn(async move {
            let result = cache
                .fetch(key, move || async move {
                    match fetch_request {
                        PageRequest::First => provider.search(&query, sort).await,
                        PageRequest::More(cursor) => provider.search_more(&query, sort, &cursor).await,
                    }
                })
                .await;
            let _ = tx.send(FeedMsg::Fetched {
                generation,
                request,
                result,
            });
        });
    }

    fn apply_page(&mut self, request: PageRequest, page: SearchPage) {
        let screened = self.filter.screen(page.items, &mut self.seen);
        self.breaker
            .record_page(screened.raw_count, screened.valid_count());

        let mut next = if page.has_next_page { page.next_cursor } else { None };
        if next.is_some() && next.as_ref() == request.cursor() {
            debug!("cursor did not advance; treating feed as exhausted");
            next = None;
        }

        debug!(
            raw = screened.raw_count,
            kept = screened.valid_count(),
            duplicates = screened.duplicates,
            has_more = next.is_some(),
            "page applied"
        );

        if !screened.items.is_empty() {
            self.pages.push(FeedPage {
                items: screened.items,
                cursor: next.clone(),
                has_more: next.is_some(),
            });
        }
        self.cursor = next;
        self.pagination.finish_load();

        if self.item_count() > 0 {
            self.status = FeedStatus::Loaded;
        } else if let Some(cursor) = self.cursor.clone().filter(|_| self.breaker.should_continue()) {
            debug!(cursor = %cursor, "nothing usable yet, advancing");
            self.status = FeedStatus::Searching;
            self.issue(PageRequest::More(cursor));
            return;
        } else {
            self.status = FeedStatus::Empty;
        }

        let gate = self.can_load_more();
        self.pagination.rearm_if_visible(gate, &self.tx);
    }

    fn apply_error(&mut self, request: PageRequest, error: FetchError) {
        self.pagination.finish_load();

        if error == FetchError::NotFound {
            debug!(?request, "search source has nothing for this query");
            self.cursor = None;
            self.status = if self.item_count() > 0 {
                FeedStatus::Loaded
            } else {
                FeedStatus::Empty
            };
            return;
        }

        warn!(?request, error = %error, "search fetch failed");
        if error.halts_pagination() {
            self.halted = true;
        }
        self.failed = Some(request);
        self.status = FeedStatus::Errored(error);
    }
}

impl Drop for SearchFeed {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{next_msg, page, pump, tweet, ScriptedSearch};
    use std::time::Duration;
    use tokio::time::advance;

    fn feed(provider: &Arc<ScriptedSearch>, session: &Session) -> (SearchFeed, FeedInbox) {
        let provider: Arc<dyn SearchProvider> = provider.clone();
        SearchFeed::new(provider, session, &FeedConfig::default()).unwrap()
    }

    fn ids(feed: &SearchFeed) -> Vec<String> {
        feed.items().map(|i| i.id.clone()).collect()
    }

    // -- debounce ------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn keystroke_burst_commits_final_text_once() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("lakers", None, Ok(page(vec![tweet("1", 3, 1)], None)));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());

        for text in ["l", "la", "lak", "lake", "laker", "lakers"] {
            feed.set_text(text);
            advance(Duration::from_millis(300)).await;
        }
        assert_eq!(provider.call_count(), 0);

        pump(&mut inbox, |m| feed.apply(m)).await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].query, "lakers");
        assert_eq!(feed.status(), &FeedStatus::Loaded);
        assert_eq!(ids(&feed), ["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn emptying_text_goes_idle_synchronously() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("lakers", None, Ok(page(vec![tweet("1", 3, 1)], Some("c1"))));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("lakers");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(feed.item_count(), 1);

        feed.set_text("");
        assert_eq!(feed.status(), &FeedStatus::Idle);
        assert_eq!(feed.item_count(), 0);
        assert!(feed.cursor().is_none());
        assert!(!feed.query().has_searched);

        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(provider.call_count(), 1, "clearing never hits the network");
    }

    #[tokio::test(start_paused = true)]
    async fn submit_with_empty_text_is_ignored() {
        let provider = Arc::new(ScriptedSearch::new());
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("   ");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(provider.call_count(), 0);
        assert_eq!(feed.status(), &FeedStatus::Idle);
    }

    // -- stale responses -----------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn slower_older_query_never_lands() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond_after(
            "celtics",
            None,
            Duration::from_millis(800),
            Ok(page(vec![tweet("a1", 9, 1)], None)),
        );
        provider.respond_after(
            "lakers",
            None,
            Duration::from_millis(100),
            Ok(page(vec![tweet("b1", 2, 2)], None)),
        );
        let (mut feed, mut inbox) = feed(&provider, &Session::new());

        feed.set_text("celtics");
        feed.submit();
        feed.set_text("lakers");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        assert_eq!(provider.call_count(), 2);
        assert_eq!(feed.committed_query(), Some("lakers"));
        assert_eq!(ids(&feed), ["b1"]);
    }

    // -- first page outcomes -------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn nothing_usable_and_no_cursor_is_empty() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("quiet", None, Ok(page(vec![tweet("1", 0, 1)], None)));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("quiet");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(feed.status(), &FeedStatus::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn filtered_out_first_page_advances_to_next() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("dead", 0, 1)], Some("c1"))));
        provider.respond("sox", Some("c1"), Ok(page(vec![tweet("live", 4, 2)], None)));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        assert_eq!(feed.status(), &FeedStatus::Loaded);
        assert_eq!(ids(&feed), ["live"]);
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_empty_not_an_error() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("nobody", None, Err(FetchError::NotFound));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("nobody");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(feed.status(), &FeedStatus::Empty);
        assert!(feed.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_search_retries_same_query() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Err(FetchError::Http(502)));
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], None)));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(feed.error(), Some(&FetchError::Http(502)));

        feed.retry();
        assert_eq!(feed.status(), &FeedStatus::Searching);
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(feed.status(), &FeedStatus::Loaded);
        assert_eq!(provider.call_count(), 2);
    }

    // -- sort ----------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn sort_toggle_before_search_does_not_fetch() {
        let provider = Arc::new(ScriptedSearch::new());
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.toggle_sort();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(feed.query().sort_mode, SortMode::Latest);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sort_toggle_after_search_refetches_from_scratch() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], Some("c1"))));
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        feed.toggle_sort();
        assert_eq!(feed.status(), &FeedStatus::Searching);
        assert_eq!(feed.item_count(), 0);
        pump(&mut inbox, |m| feed.apply(m)).await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].sort, SortMode::Latest);
        assert_eq!(calls[1].cursor, None);
        assert_eq!(ids(&feed), ["1"], "same id is new again after a reset");
    }

    // -- pagination ----------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn visible_sentinel_loads_pages_in_order_without_duplicates() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1), tweet("2", 1, 2)], Some("c1"))));
        provider.respond("sox", Some("c1"), Ok(page(vec![tweet("2", 1, 2), tweet("3", 1, 3)], Some("c2"))));
        provider.respond("sox", Some("c2"), Ok(page(vec![tweet("4", 1, 4)], Some("c3"))));
        provider.respond("sox", Some("c3"), Ok(page(vec![tweet("5", 1, 5)], None)));

        let viewport = Viewport::new();
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.attach_viewport(&viewport);
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(provider.call_count(), 1, "sentinel hidden, nothing more");

        viewport.set_sentinel_visible(true);
        pump(&mut inbox, |m| feed.apply(m)).await;

        let cursors: Vec<Option<String>> = provider.calls().into_iter().map(|c| c.cursor).collect();
        assert_eq!(
            cursors,
            [None, Some("c1".into()), Some("c2".into()), Some("c3".into())]
        );
        assert_eq!(ids(&feed), ["1", "2", "3", "4", "5"]);
        assert_eq!(feed.pages().len(), 4);
        assert_eq!(feed.status(), &FeedStatus::Loaded);
        assert!(feed.cursor().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_sentinel_stops_loading() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], Some("c1"))));
        provider.respond("sox", Some("c1"), Ok(page(vec![tweet("2", 1, 2)], Some("c2"))));

        let viewport = Viewport::new();
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.attach_viewport(&viewport);
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        viewport.set_sentinel_visible(true);
        feed.apply(next_msg(&mut inbox).await);
        viewport.set_sentinel_visible(false);
        pump(&mut inbox, |m| feed.apply(m)).await;

        assert_eq!(provider.call_count(), 1, "debounce cancelled before it fired");
    }

    #[tokio::test(start_paused = true)]
    async fn breaker_stops_runaway_pagination() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], Some("c1"))));
        provider.respond("sox", Some("c1"), Ok(page(vec![tweet("d1", 0, 2)], Some("c2"))));
        provider.respond("sox", Some("c2"), Ok(page(vec![tweet("d2", 0, 3)], Some("c3"))));
        provider.respond("sox", Some("c3"), Ok(page(vec![tweet("d3", 0, 4)], Some("c4"))));
        provider.respond("sox", Some("c4"), Ok(page(vec![tweet("2", 5, 5)], None)));

        let viewport = Viewport::new();
        viewport.set_sentinel_visible(true);
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.attach_viewport(&viewport);
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        assert_eq!(provider.call_count(), 4);
        assert!(feed.breaker().is_tripped());
        assert_eq!(feed.status(), &FeedStatus::Loaded);
        assert_eq!(ids(&feed), ["1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_cursor_ends_pagination() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], Some("c1"))));
        provider.respond("sox", Some("c1"), Ok(page(vec![tweet("2", 1, 2)], Some("c1"))));

        let viewport = Viewport::new();
        viewport.set_sentinel_visible(true);
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.attach_viewport(&viewport);
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        assert_eq!(provider.call_count(), 2);
        assert!(feed.cursor().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_halts_until_retry() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], Some("c1"))));
        provider.respond("sox", Some("c1"), Err(FetchError::RateLimited));
        provider.respond("sox", Some("c1"), Ok(page(vec![tweet("2", 1, 2)], None)));

        let viewport = Viewport::new();
        viewport.set_sentinel_visible(true);
        let (mut feed, mut inbox) = feed(&provider, &Session::new());
        feed.attach_viewport(&viewport);
        feed.set_text("sox");
        feed.submit();
        pump(&mut inbox, |m| feed.apply(m)).await;

        assert_eq!(feed.error(), Some(&FetchError::RateLimited));
        assert!(feed.is_halted());
        assert_eq!(provider.call_count(), 2);
        assert_eq!(ids(&feed), ["1"], "earlier pages survive the failure");

        feed.retry();
        pump(&mut inbox, |m| feed.apply(m)).await;
        assert_eq!(provider.calls()[2].cursor.as_deref(), Some("c1"));
        assert_eq!(ids(&feed), ["1", "2"]);
        assert_eq!(feed.status(), &FeedStatus::Loaded);
    }

    // -- request coalescing --------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn two_feeds_on_one_session_share_a_fetch() {
        let provider = Arc::new(ScriptedSearch::new());
        provider.respond("sox", None, Ok(page(vec![tweet("1", 1, 1)], None)));
        let session = Session::new();
        let (mut a, mut inbox_a) = feed(&provider, &session);
        let (mut b, mut inbox_b) = feed(&provider, &session);

        a.set_text("sox");
        a.submit();
        b.set_text("sox");
        b.submit();
        a.apply(next_msg(&mut inbox_a).await);
        b.apply(next_msg(&mut inbox_b).await);

        assert_eq!(provider.call_count(), 1);
        assert_eq!(ids(&a), ["1"]);
        assert_eq!(ids(&b), ["1"]);
    }
}
