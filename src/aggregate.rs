//! Per-game comment feed built from two independent communities.
//!
//! A [`GameFeed`] resolves the away and home teams to their subreddits and
//! runs one [`SideFeed`] for each: find the game thread, then page through
//! its comments with the side's own cursor, breaker and seen-set.  The sides
//! never wait on each other.  One side having no thread, failing, or running
//! dry leaves the other untouched, and the panel only reports an error when
//! every side that could load has failed.
//!
//! [`GameFeed::merged`] is the display list: both sides' items tagged with
//! the community they were posted in, restricted to the two resolved
//! communities, and ordered by the current sort mode.
//!
//! Pagination shares one sentinel and one debounce timer, but each side
//! gates its own load-more on its own in-flight request, so a slow page on
//! one side never holds back the other.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::breaker::CircuitBreaker;
use crate::cache::{FetchKey, RequestCache, ResourceType};
use crate::config::FeedConfig;
use crate::error::{FetchError, FetchResult};
use crate::filter::{ContentFilter, SeenIds};
use crate::game::{GameRef, Side};
use crate::pagination::{PaginationController, PaginationMsg, Viewport};
use crate::query::{Cursor, SortMode};
use crate::session::Session;
use crate::source::{
    normalize_handle, CommentListing, CommentProvider, CommentRequest, FeedItem, SourceResolver,
    ThreadLookup,
};
use crate::timer::Ticket;

#[derive(Debug)]
pub enum GameMsg {
    Thread {
        generation: u64,
        side: Side,
        result: FetchResult<ThreadLookup>,
    },
    Comments {
        generation: u64,
        side: Side,
        after: Option<Cursor>,
        result: FetchResult<CommentListing>,
    },
    Visibility(bool),
    LoadMoreDue(Ticket),
}

impl PaginationMsg for GameMsg {
    fn visibility(visible: bool) -> Self {
        GameMsg::Visibility(visible)
    }

    fn load_more_due(ticket: Ticket) -> Self {
        GameMsg::LoadMoreDue(ticket)
    }
}

pub type GameInbox = UnboundedReceiver<GameMsg>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideStatus {
    /// The team has no known community.
    Unresolved,
    FindingThread,
    /// No game thread (yet).  Not an error.
    NoThread,
    Loading,
    Loaded,
    LoadingMore,
    Empty,
    Errored(FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SideRequest {
    Thread,
    Comments(Option<Cursor>),
}

/// One side of a game: a single subreddit's thread.
#[derive(Debug)]
pub struct SideFeed {
    side: Side,
    handle: Option<String>,
    status: SideStatus,
    items: Vec<FeedItem>,
    cursor: Option<Cursor>,
    breaker: CircuitBreaker,
    seen: SeenIds,
    halted: bool,
    thread_found: bool,
    in_flight: Option<SideRequest>,
    failed: Option<SideRequest>,
}

impl SideFeed {
    fn new(side: Side, handle: Option<String>, breaker_threshold: u32) -> Self {
        let status = if handle.is_some() {
            SideStatus::FindingThread
        } else {
            SideStatus::Unresolved
        };
        Self {
            side,
            handle,
            status,
            items: Vec::new(),
            cursor: None,
            breaker: CircuitBreaker::new(breaker_threshold),
            seen: SeenIds::default(),
            halted: false,
            thread_found: false,
            in_flight: None,
            failed: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn handle(&self) -> Option<&str> {
        self.handle.as_deref()
    }

    pub fn status(&self) -> &SideStatus {
        &self.status
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
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

    pub fn error(&self) -> Option<&FetchError> {
        match &self.status {
            SideStatus::Errored(e) => Some(e),
            _ => None,
        }
    }

    fn gate_open(&self) -> bool {
        self.status == SideStatus::Loaded
            && self.in_flight.is_none()
            && self.cursor.is_some()
            && self.breaker.should_continue()
            && !self.halted
    }

    fn reset(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.breaker.reset();
        self.cursor = None;
        self.halted = false;
        self.in_flight = None;
        self.failed = None;
    }
}

/// A display row: an item and the side whose community it was posted in.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedItem {
    pub side: Side,
    pub item: FeedItem,
}

pub struct GameFeed {
    game: GameRef,
    provider: Arc<dyn CommentProvider>,
    threads: RequestCache<ThreadLookup>,
    comments: RequestCache<CommentListing>,
    filter: ContentFilter,
    pagination: PaginationController,
    tx: UnboundedSender<GameMsg>,
    sort_mode: SortMode,
    sides: [SideFeed; 2],
    generation: u64,
    /// First pages of the current generation skip the provider's cache.
    bypass_cache: bool,
    bypass_on_refresh: bool,
}

impl GameFeed {
    /// Resolve both teams and start loading every resolved side.
    pub fn open(
        game: GameRef,
        provider: Arc<dyn CommentProvider>,
        resolver: &dyn SourceResolver,
        session: &Session,
        config: &FeedConfig,
    ) -> Result<(Self, GameInbox), regex::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let resolve = |side: Side| {
            let handle = resolver.resolve_handle(game.team(side), game.league);
            if handle.is_none() {
                info!(team = game.team(side), league = %game.league, "no community for team");
            }
            SideFeed::new(side, handle, config.breaker_threshold)
        };
        let sides = [resolve(Side::Away), resolve(Side::Home)];

        let mut feed = Self {
            provider,
            threads: session.threads().clone(),
            comments: session.comments().clone(),
            filter: ContentFilter::new(&config.denylist)?,
            pagination: PaginationController::new(config.pagination_delay),
            tx,
            sort_mode: SortMode::default(),
            sides,
            generation: 0,
            bypass_cache: false,
            bypass_on_refresh: config.bypass_cache_on_refresh,
            game,
        };
        info!(
            game = %feed.game.game_id,
            away = feed.sides[0].handle().unwrap_or("-"),
            home = feed.sides[1].handle().unwrap_or("-"),
            "game feed opened"
        );
        feed.start(true);
        Ok((feed, rx))
    }

    // -- intents -------------------------------------------------------------

    /// Change the comment ordering.  Both sides start over.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        if self.sort_mode == mode {
            return;
        }
        self.sort_mode = mode;
        self.bypass_cache = false;
        self.start(false);
    }

    pub fn toggle_sort(&mut self) {
        self.set_sort_mode(self.sort_mode.toggled());
    }

    /// Reload both sides from scratch, threads included.
    pub fn refresh(&mut self) {
        self.bypass_cache = self.bypass_on_refresh;
        self.start(true);
    }

    /// Re-issue whatever failed on each side.
    pub fn retry(&mut self) {
        for side in Side::BOTH {
            let Some(request) = self.sides[side.index()].failed.take() else {
                continue;
            };
            self.sides[side.index()].halted = false;
            match request {
                SideRequest::Thread => self.find_thread(side),
                SideRequest::Comments(after) => {
                    let status = if after.is_some() {
                        SideStatus::LoadingMore
                    } else {
                        SideStatus::Loading
                    };
                    self.fetch_comments(side, after, status);
                }
            }
        }
    }

    pub fn attach_viewport(&mut self, viewport: &Viewport) {
        self.pagination.attach(viewport, &self.tx);
    }

    pub fn close(&mut self) {
        self.pagination.teardown();
        self.generation += 1;
        for side in &mut self.sides {
            side.in_flight = None;
        }
    }

    // -- event loop ----------------------------------------------------------

    pub fn apply(&mut self, msg: GameMsg) {
        match msg {
            GameMsg::Visibility(visible) => {
                let gate = self.any_gate_open();
                self.pagination.on_visibility(visible, gate, &self.tx);
            }
            GameMsg::LoadMoreDue(ticket) => {
                let gate = self.any_gate_open();
                if !self.pagination.on_due(ticket, gate) {
                    return;
                }
                for side in Side::BOTH {
                    let feed = &self.sides[side.index()];
                    if !feed.gate_open() {
                        continue;
                    }
                    let after = feed.cursor.clone();
                    self.fetch_comments(side, after, SideStatus::LoadingMore);
                }
                // Each side's `in_flight` is its loading gate.
                self.pagination.finish_load();
            }
            GameMsg::Thread {
                generation,
                side,
                result,
            } => {
                if !self.accept(generation, side, &SideRequest::Thread) {
                    return;
                }
                match result {
                    Ok(ThreadLookup::Found) => {
                        self.sides[side.index()].thread_found = true;
                        self.fetch_comments(side, None, SideStatus::Loading);
                    }
                    Ok(ThreadLookup::NotFound) | Err(FetchError::NotFound) => {
                        info!(%side, "no game thread");
                        self.sides[side.index()].status = SideStatus::NoThread;
                    }
                    Err(error) => self.side_failed(side, SideRequest::Thread, error),
                }
            }
            GameMsg::Comments {
                generation,
                side,
                after,
                result,
            } => {
                let request = SideRequest::Comments(after.clone());
                if !self.accept(generation, side, &request) {
                    return;
                }
                match result {
                    Ok(listing) => self.apply_listing(side, after, listing),
                    Err(FetchError::NotFound) => {
                        let feed = &mut self.sides[side.index()];
                        feed.cursor = None;
                        feed.status = if feed.items.is_empty() {
                            SideStatus::Empty
                        } else {
                            SideStatus::Loaded
                        };
                    }
                    Err(error) => self.side_failed(side, request, error),
                }
                self.settle_pagination();
            }
        }
    }

    // -- accessors -----------------------------------------------------------

    pub fn game(&self) -> &GameRef {
        &self.game
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn side(&self, side: Side) -> &SideFeed {
        &self.sides[side.index()]
    }

    pub fn is_loading(&self) -> bool {
        self.sides.iter().any(|s| {
            matches!(s.status, SideStatus::FindingThread | SideStatus::Loading)
        })
    }

    /// The panel-level error: only when every resolved side failed.
    pub fn error(&self) -> Option<&FetchError> {
        let mut resolved = self.sides.iter().filter(|s| s.handle.is_some()).peekable();
        resolved.peek()?;
        let mut first = None;
        for side in resolved {
            let error = side.error()?;
            first.get_or_insert(error);
        }
        first
    }

    /// Both sides merged for display.  Each item is tagged by the community
    /// it was posted in, whichever side fetched it; items from any other
    /// community are left out.  Cross-side duplicates keep the first
    /// occurrence (away listing before home).
    pub fn merged(&self) -> Vec<TaggedItem> {
        let communities: Vec<(Side, String)> = self
            .sides
            .iter()
            .filter_map(|s| s.handle.as_deref().map(|h| (s.side, normalize_handle(h))))
            .collect();
        let community_of = |item: &FeedItem| {
            let source = normalize_handle(&item.source);
            communities
                .iter()
                .find(|(_, handle)| *handle == source)
                .map(|(side, _)| *side)
        };

        let mut ids = HashSet::new();
        let mut out: Vec<TaggedItem> = self
            .sides
            .iter()
            .flat_map(|s| s.items.iter())
            .filter_map(|item| community_of(item).map(|side| (side, item)))
            .filter(|(_, item)| ids.insert(item.id.clone()))
            .map(|(side, item)| TaggedItem {
                side,
                item: item.clone(),
            })
            .collect();

        match self.sort_mode {
            SortMode::Latest => out.sort_by(|a, b| a.item.cmp(&b.item)),
            SortMode::Top => out.sort_by(|a, b| {
                b.item
                    .engagement
                    .score()
                    .cmp(&a.item.engagement.score())
                    .then_with(|| a.item.cmp(&b.item))
            }),
        }
        out
    }

    // -- internals -----------------------------------------------------------

    fn start(&mut self, lookup_threads: bool) {
        self.generation += 1;
        self.pagination.reset();
        debug!(generation = self.generation, sort = %self.sort_mode, "game feed restarting");
        for side in Side::BOTH {
            let feed = &mut self.sides[side.index()];
            feed.reset();
            if feed.handle.is_none() {
                feed.status = SideStatus::Unresolved;
                continue;
            }
            if lookup_threads || !feed.thread_found {
                self.find_thread(side);
            } else {
                self.fetch_comments(side, None, SideStatus::Loading);
            }
        }
    }

    fn accept(&mut self, generation: u64, side: Side, request: &SideRequest) -> bool {
        if generation != self.generation {
            debug!(%side, generation, current = self.generation, "stale response dropped");
            return false;
        }
        let feed = &mut self.sides[side.index()];
        if feed.in_flight.as_ref() != Some(request) {
            debug!(%side, ?request, "unexpected response dropped");
            return false;
        }
        feed.in_flight = None;
        true
    }

    fn find_thread(&mut self, side: Side) {
        let feed = &mut self.sides[side.index()];
        let Some(handle) = feed.handle.clone() else {
            return;
        };
        feed.status = SideStatus::FindingThread;
        feed.in_flight = Some(SideRequest::Thread);

        let league = self.game.league;
        let key = FetchKey::new(ResourceType::GameThread, handle.as_str()).with("league", league);
        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let cache = self.threads.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = cache
                .fetch(key, move || async move { provider.find_thread(&handle, league).await })
                .await;
            let _ = tx.send(GameMsg::Thread {
                generation,
                side,
                result,
            });
        });
    }

    fn fetch_comments(&mut self, side: Side, after: Option<Cursor>, status: SideStatus) {
        let feed = &mut self.sides[side.index()];
        let Some(subreddit) = feed.handle.clone() else {
            return;
        };
        feed.status = status;
        feed.in_flight = Some(SideRequest::Comments(after.clone()));

        let request = CommentRequest {
            subreddit,
            game_id: self.game.game_id.clone(),
            sort: self.sort_mode,
            bypass_cache: self.bypass_cache && after.is_none(),
            after: after.clone(),
        };
        let mut key = FetchKey::new(ResourceType::Comments, request.subreddit.as_str())
            .with("game", &request.game_id)
            .with("sort", request.sort.as_comment_kind());
        if let Some(cursor) = &after {
            key = key.with("after", cursor);
        }
        if request.bypass_cache {
            key = key.with("fresh", true);
        }

        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let cache = self.comments.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = cache
                .fetch(key, move || async move { provider.get_comments(&request).await })
                .await;
            let _ = tx.send(GameMsg::Comments {
                generation,
                side,
                after,
                result,
            });
        });
    }

    fn apply_listing(&mut self, side: Side, after: Option<Cursor>, listing: CommentListing) {
        let feed = &mut self.sides[side.index()];
        let screened = self.filter.screen(listing.feed_items(), &mut feed.seen);
        feed.breaker
            .record_page(screened.raw_count, screened.valid_count());

        let mut next = listing.next_cursor;
        if next.is_some() && next == after {
            debug!(%side, "cursor did not advance; treating thread as exhausted");
            next = None;
        }
        debug!(
            %side,
            raw = screened.raw_count,
            kept = screened.valid_count(),
            has_more = next.is_some(),
            "comments applied"
        );

        feed.items.extend(screened.items);
        feed.cursor = next;

        if !feed.items.is_empty() {
            feed.status = SideStatus::Loaded;
        } else if let Some(cursor) = feed.cursor.clone().filter(|_| feed.breaker.should_continue()) {
            self.fetch_comments(side, Some(cursor), SideStatus::Loading);
        } else {
            feed.status = SideStatus::Empty;
        }
    }

    fn side_failed(&mut self, side: Side, request: SideRequest, error: FetchError) {
        warn!(%side, ?request, error = %error, "game feed side failed");
        let feed = &mut self.sides[side.index()];
        if error.halts_pagination() {
            feed.halted = true;
        }
        feed.failed = Some(request);
        feed.status = SideStatus::Errored(error);
    }

    fn any_gate_open(&self) -> bool {
        self.sides.iter().any(SideFeed::gate_open)
    }

    /// A side's page landed: re-arm for any side that can page again.
    fn settle_pagination(&mut self) {
        let gate = self.any_gate_open();
        self.pagination.rearm_if_visible(gate, &self.tx);
    }
}

impl Drop for GameFeed {
    fn drop(&mut self) {
        self.close();
    }
}
