//! The core data type shared across all feed sources.
//!
//! `FeedItem` represents a single post, tweet or comment from any provider.
//! Every provider converts its native shape into `FeedItem`s so that filtering,
//! de-duplication, pagination and merging stay source-agnostic.
//!
//! ## For contributors
//!
//! If you are adding a new provider you do **not** need to modify this file
//! unless your source carries an engagement signal that does not map onto
//! [`Engagement`].  Unknown counters should simply be left as `None`.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;

/// Engagement counters attached to an item.
///
/// Every counter is optional: providers report different subsets (a tweet has
/// views and quotes, a Reddit comment only has a score).  An absent counter is
/// treated exactly like zero.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct Engagement {
    pub likes: Option<i64>,
    pub replies: Option<i64>,
    pub reshares: Option<i64>,
    pub quotes: Option<i64>,
    pub views: Option<i64>,
}

impl Engagement {
    fn counters(&self) -> [i64; 5] {
        [
            self.likes.unwrap_or(0),
            self.replies.unwrap_or(0),
            self.reshares.unwrap_or(0),
            self.quotes.unwrap_or(0),
            self.views.unwrap_or(0),
        ]
    }

    /// True when every counter is zero or absent.
    pub fn is_dead(&self) -> bool {
        self.counters().iter().all(|c| *c == 0)
    }

    /// Interaction score used for "top" ordering.  Views are excluded: they
    /// are an impression count, not an interaction.  Saturates at the bounds
    /// of `i64`; counters come straight from upstream JSON.
    pub fn score(&self) -> i64 {
        let [likes, replies, reshares, quotes, _] = self.counters();
        [likes, replies, reshares, quotes]
            .into_iter()
            .fold(0i64, i64::saturating_add)
    }
}

/// A single feed entry, normalised from any provider.
///
/// ## Sorting
///
/// `FeedItem` implements [`Ord`] for **reverse-chronological** ordering:
/// newer items sort before older ones, and items without a date sort last.
/// Items published at the same instant are ordered by id.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeedItem {
    /// Identity used for de-duplication within one feed.
    pub id: String,

    /// Account that produced the item, if the provider reports one.  This is
    /// what the denylist is matched against.
    pub author: Option<String>,

    /// Text content.
    pub body: String,

    /// Source tag: the subreddit for comments, the provider name for tweets.
    pub source: String,

    /// Publication timestamp, used for sorting.
    pub published: Option<DateTime<Utc>>,

    /// URL to the full content.
    pub link: Option<String>,

    pub engagement: Engagement,
}

// ---------------------------------------------------------------------------
// Ordering: reverse chronological (newest first)
// ---------------------------------------------------------------------------

impl Ord for FeedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // `other` first so that `Some(newer) > Some(older)` gives us newest-first.
        // `None` is less than `Some(_)`, so undated items sink to the bottom.
        other
            .published
            .cmp(&self.published)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for FeedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parse the timestamp formats our providers emit: RFC 3339 (comments),
/// the Twitter `Wed Oct 10 20:19:24 +0000 2018` form, and RFC 2822.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%a %b %d %H:%M:%S %z %Y"))
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
