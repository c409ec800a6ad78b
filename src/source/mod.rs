//! Provider abstraction layer.
//!
//! This module defines the provider traits the engine talks to and the
//! provider-neutral shapes they return.  Concrete implementations live in
//! sub-modules: [`http`] talks to the application backend, [`teams`] is the
//! static team → subreddit table.
//!
//! ## For contributors: adding a new provider
//!
//! 1. Create a new file in this directory (e.g. `bluesky.rs`).
//! 2. Implement [`SearchProvider`] or [`CommentProvider`] for your struct,
//!    converting native records into [`FeedItem`]s.
//! 3. Map transport failures onto [`FetchError`]; rate limits and auth
//!    failures must stay distinguishable.
//! 4. Re-export your struct in the `pub use` block below.
//!
//! Filtering, de-duplication, pagination and merging are provider-agnostic.

mod feed_item;
pub mod http;
pub mod teams;

pub use feed_item::{parse_timestamp, Engagement, FeedItem};
pub use http::ArbApiClient;
pub use teams::TeamDirectory;

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::game::League;
use crate::query::{Cursor, SortMode};

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    pub items: Vec<FeedItem>,
    pub has_next_page: bool,
    pub next_cursor: Option<Cursor>,
}

/// Free-text search over a social network.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// First page for `query`.
    async fn search(&self, query: &str, sort: SortMode) -> FetchResult<SearchPage>;

    /// The page starting at `cursor`.
    async fn search_more(
        &self,
        query: &str,
        sort: SortMode,
        cursor: &Cursor,
    ) -> FetchResult<SearchPage>;
}

/// Outcome of looking for a subreddit's game thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadLookup {
    Found,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRequest {
    pub subreddit: String,
    pub game_id: String,
    pub sort: SortMode,
    pub after: Option<Cursor>,
    pub bypass_cache: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub subreddit: String,
    pub content: String,
    pub score: i64,
    pub timestamp: String,
    pub replies: Vec<Comment>,
}

impl Comment {
    /// Convert into a [`FeedItem`], the score standing in for likes.
    pub fn to_feed_item(&self) -> FeedItem {
        FeedItem {
            id: self.id.clone(),
            author: Some(self.author.clone()),
            body: self.content.clone(),
            source: self.subreddit.clone(),
            published: parse_timestamp(&self.timestamp),
            link: None,
            engagement: Engagement {
                likes: Some(self.score),
                replies: Some(self.replies.len() as i64),
                ..Engagement::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThreadPost {
    pub comments: Vec<Comment>,
}

/// One page of game-thread comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentListing {
    pub posts: Vec<ThreadPost>,
    pub next_cursor: Option<Cursor>,
}

impl CommentListing {
    /// Flatten every post's comment tree, depth-first, in listing order.
    pub fn feed_items(&self) -> Vec<FeedItem> {
        fn walk(comments: &[Comment], out: &mut Vec<FeedItem>) {
            for c in comments {
                out.push(c.to_feed_item());
                walk(&c.replies, out);
            }
        }

        let mut out = Vec::new();
        for post in &self.posts {
            walk(&post.comments, &mut out);
        }
        out
    }
}

/// Reddit game-thread comments.
#[async_trait]
pub trait CommentProvider: Send + Sync {
    async fn find_thread(&self, subreddit: &str, league: League) -> FetchResult<ThreadLookup>;

    async fn get_comments(&self, request: &CommentRequest) -> FetchResult<CommentListing>;
}

/// A box-score record.  The engine only routes it; the payload stays opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxScore {
    pub league: League,
    pub game_id: String,
    pub payload: serde_json::Value,
}

#[async_trait]
pub trait BoxScoreProvider: Send + Sync {
    async fn get_box_score(&self, league: League, game_id: &str) -> FetchResult<BoxScore>;
}

/// Maps a team name onto the handle of its community (a subreddit name,
/// without the `r/` prefix).
pub trait SourceResolver: Send + Sync {
    fn resolve_handle(&self, team: &str, league: League) -> Option<String>;
}

/// Lower-case a subreddit name and strip any `r/` or `/r/` prefix so handles
/// from different places compare equal.
pub fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim().trim_start_matches('/');
    let bare = trimmed
        .strip_prefix("r/")
        .or_else(|| trimmed.strip_prefix("R/"))
        .unwrap_or(trimmed);
    bare.to_ascii_lowercase()
}
