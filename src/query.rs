//! Query-side value types shared by every feed.

use std::fmt;

/// Ordering requested from the upstream provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortMode {
    #[default]
    Top,
    Latest,
}

impl SortMode {
    pub fn toggled(self) -> Self {
        match self {
            SortMode::Top => SortMode::Latest,
            SortMode::Latest => SortMode::Top,
        }
    }

    /// Value sent as the `queryType` parameter of the search endpoint.
    pub fn as_query_type(self) -> &'static str {
        match self {
            SortMode::Top => "Top",
            SortMode::Latest => "Latest",
        }
    }

    /// Value sent as the `kind` parameter of the comments endpoint.
    pub fn as_comment_kind(self) -> &'static str {
        match self {
            SortMode::Top => "top",
            SortMode::Latest => "new",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Top => f.write_str("Top"),
            SortMode::Latest => f.write_str("Latest"),
        }
    }
}

/// Opaque pagination token handed out by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user-editable part of a search feed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedQuery {
    /// Raw text as typed, not yet committed.
    pub text: String,
    pub sort_mode: SortMode,
    /// True once a non-empty query has been committed; cleared with the text.
    pub has_searched: bool,
}

impl FeedQuery {
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }
}
