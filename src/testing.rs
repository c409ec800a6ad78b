//! Scripted providers and event-loop helpers shared by the engine tests.
//!
//! Every fake answers from a script keyed by the request, sleeps a virtual
//! delay first (tests run on tokio's paused clock), and records each call so
//! tests can assert on exactly what reached the "network".

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use crate::error::{FetchError, FetchResult};
use crate::game::League;
use crate::query::{Cursor, SortMode};
use crate::source::{
    BoxScore, BoxScoreProvider, Comment, CommentListing, CommentProvider, CommentRequest,
    Engagement, FeedItem, SearchPage, SearchProvider, ThreadLookup, ThreadPost,
};

/// Virtual latency of a scripted response unless a test says otherwise.
pub const LATENCY: Duration = Duration::from_millis(50);

/// How long [`pump`] waits for the next message before calling the loop idle.
const IDLE: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Feed every message from `rx` into `apply` until nothing arrives for a
/// while.  Returns how many messages were applied.
pub async fn pump<M>(rx: &mut UnboundedReceiver<M>, mut apply: impl FnMut(M)) -> usize {
    let mut applied = 0;
    while let Ok(Some(msg)) = timeout(IDLE, rx.recv()).await {
        apply(msg);
        applied += 1;
    }
    applied
}

/// The next message, or a panic if none arrives.
pub async fn next_msg<M>(rx: &mut UnboundedReceiver<M>) -> M {
    timeout(IDLE, rx.recv())
        .await
        .expect("timed out waiting for a message")
        .expect("inbox closed")
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// An item with `likes` likes, published `minute` minutes into the game.
pub fn tweet(id: &str, likes: i64, minute: u32) -> FeedItem {
    FeedItem {
        id: id.to_string(),
        author: Some(format!("fan_{id}")),
        body: format!("tweet {id}"),
        source: "twitter".into(),
        published: Utc.with_ymd_and_hms(2025, 7, 4, 19, minute, 0).single(),
        link: None,
        engagement: Engagement {
            likes: Some(likes),
            ..Engagement::default()
        },
    }
}

pub fn page(items: Vec<FeedItem>, next: Option<&str>) -> SearchPage {
    SearchPage {
        items,
        has_next_page: next.is_some(),
        next_cursor: next.map(Cursor::new),
    }
}

pub fn comment(id: &str, subreddit: &str, score: i64, minute: u32) -> Comment {
    Comment {
        id: id.to_string(),
        author: format!("user_{id}"),
        subreddit: subreddit.to_string(),
        content: format!("comment {id}"),
        score,
        timestamp: format!("2025-07-04T19:{minute:02}:00Z"),
        replies: Vec::new(),
    }
}

pub fn listing(comments: Vec<Comment>, next: Option<&str>) -> CommentListing {
    CommentListing {
        posts: vec![ThreadPost { comments }],
        next_cursor: next.map(Cursor::new),
    }
}

// ---------------------------------------------------------------------------
// Script storage
// ---------------------------------------------------------------------------

struct Scripted<T> {
    delay: Duration,
    result: FetchResult<T>,
}

/// Responses per key, served in order; the last one repeats.
struct Script<K, T> {
    entries: Mutex<HashMap<K, VecDeque<Scripted<T>>>>,
}

impl<K: std::hash::Hash + Eq, T: Clone> Script<K, T> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn push(&self, key: K, delay: Duration, result: FetchResult<T>) {
        self.entries
            .lock()
            .entry(key)
            .or_default()
            .push_back(Scripted { delay, result });
    }

    fn take(&self, key: &K) -> Option<(Duration, FetchResult<T>)> {
        let mut entries = self.entries.lock();
        let queue = entries.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front().map(|s| (s.delay, s.result))
        } else {
            queue.front().map(|s| (s.delay, s.result.clone()))
        }
    }
}

async fn serve<T>(scripted: Option<(Duration, FetchResult<T>)>, fallback: FetchResult<T>) -> FetchResult<T> {
    match scripted {
        Some((delay, result)) => {
            tokio::time::sleep(delay).await;
            result
        }
        None => {
            tokio::time::sleep(LATENCY).await;
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCall {
    pub query: String,
    pub sort: SortMode,
    pub cursor: Option<String>,
}

/// Search provider keyed by `(query, cursor)`.  Unscripted requests get an
/// empty final page.
pub struct ScriptedSearch {
    script: Script<(String, Option<String>), SearchPage>,
    calls: Mutex<Vec<SearchCall>>,
}

impl ScriptedSearch {
    pub fn new() -> Self {
        Self {
            script: Script::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, query: &str, cursor: Option<&str>, result: FetchResult<SearchPage>) {
        self.respond_after(query, cursor, LATENCY, result);
    }

    pub fn respond_after(
        &self,
        query: &str,
        cursor: Option<&str>,
        delay: Duration,
        result: FetchResult<SearchPage>,
    ) {
        self.script
            .push((query.to_string(), cursor.map(String::from)), delay, result);
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn answer(&self, query: &str, sort: SortMode, cursor: Option<&Cursor>) -> FetchResult<SearchPage> {
        let cursor = cursor.map(|c| c.as_str().to_string());
        self.calls.lock().push(SearchCall {
            query: query.to_string(),
            sort,
            cursor: cursor.clone(),
        });
        let scripted = self.script.take(&(query.to_string(), cursor));
        serve(scripted, Ok(SearchPage::default())).await
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, query: &str, sort: SortMode) -> FetchResult<SearchPage> {
        self.answer(query, sort, None).await
    }

    async fn search_more(&self, query: &str, sort: SortMode, cursor: &Cursor) -> FetchResult<SearchPage> {
        self.answer(query, sort, Some(cursor)).await
    }
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// Comment provider keyed by subreddit (threads) and `(subreddit, after)`
/// (listings).  Unscripted threads are not found; unscripted listings are
/// empty.
pub struct ScriptedComments {
    threads: Script<String, ThreadLookup>,
    listings: Script<(String, Option<String>), CommentListing>,
    thread_calls: Mutex<Vec<String>>,
    comment_calls: Mutex<Vec<CommentRequest>>,
}

impl ScriptedComments {
    pub fn new() -> Self {
        Self {
            threads: Script::new(),
            listings: Script::new(),
            thread_calls: Mutex::new(Vec::new()),
            comment_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn thread(&self, subreddit: &str, result: FetchResult<ThreadLookup>) {
        self.threads.push(subreddit.to_string(), LATENCY, result);
    }

    pub fn comments(&self, subreddit: &str, after: Option<&str>, result: FetchResult<CommentListing>) {
        self.comments_after(subreddit, after, LATENCY, result);
    }

    pub fn comments_after(
        &self,
        subreddit: &str,
        after: Option<&str>,
        delay: Duration,
        result: FetchResult<CommentListing>,
    ) {
        self.listings
            .push((subreddit.to_string(), after.map(String::from)), delay, result);
    }

    pub fn thread_calls(&self) -> Vec<String> {
        self.thread_calls.lock().clone()
    }

    pub fn comment_calls(&self) -> Vec<CommentRequest> {
        self.comment_calls.lock().clone()
    }
}

#[async_trait]
impl CommentProvider for ScriptedComments {
    async fn find_thread(&self, subreddit: &str, _league: League) -> FetchResult<ThreadLookup> {
        self.thread_calls.lock().push(subreddit.to_string());
        let scripted = self.threads.take(&subreddit.to_string());
        serve(scripted, Ok(ThreadLookup::NotFound)).await
    }

    async fn get_comments(&self, request: &CommentRequest) -> FetchResult<CommentListing> {
        self.comment_calls.lock().push(request.clone());
        let key = (
            request.subreddit.clone(),
            request.after.as_ref().map(|c| c.as_str().to_string()),
        );
        let scripted = self.listings.take(&key);
        serve(scripted, Ok(CommentListing::default())).await
    }
}

// ---------------------------------------------------------------------------
// Box scores
// ---------------------------------------------------------------------------

/// Box-score provider: every game answers after `delay` with its id echoed
/// back, unless the game is scripted to fail.
pub struct ScriptedBoxScores {
    delay: Duration,
    failures: Mutex<HashMap<String, FetchError>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBoxScores {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail(&self, game_id: &str, error: FetchError) {
        self.failures.lock().insert(game_id.to_string(), error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl BoxScoreProvider for ScriptedBoxScores {
    async fn get_box_score(&self, league: League, game_id: &str) -> FetchResult<BoxScore> {
        self.calls.lock().push(game_id.to_string());
        tokio::time::sleep(self.delay).await;
        if let Some(error) = self.failures.lock().get(game_id).cloned() {
            return Err(error);
        }
        Ok(BoxScore {
            league,
            game_id: game_id.to_string(),
            payload: serde_json::json!({ "gameId": game_id }),
        })
    }
}
