//! Engine and backend configuration.
//!
//! Defaults reproduce the reference behaviour of the app (1 s search quiet
//! window, 300 ms load-more debounce, breaker trips after three useless
//! pages).  The binary fills these structs from its command line; library
//! users construct them directly.

use std::time::Duration;

/// How long the search box must be quiet before a query is committed.
pub const SEARCH_QUIET_WINDOW: Duration = Duration::from_millis(1000);

/// How long a visible sentinel must settle before a load-more is issued.
pub const PAGINATION_DELAY: Duration = Duration::from_millis(300);

/// Consecutive useless pages before pagination stops.
pub const BREAKER_THRESHOLD: u32 = 3;

/// How often tracked box scores are re-requested.
pub const BOX_SCORE_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Authors whose posts never reach a feed.  Matched case-insensitively.
pub const DEFAULT_DENYLIST: &[&str] = &[
    r"^automoderator$",
    r"^\[deleted\]$",
    r"bot$",
    r"^(free|best)?_?(picks|betting|odds)_?(tips|deals)?\d*$",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub search_quiet_window: Duration,
    pub pagination_delay: Duration,
    pub breaker_threshold: u32,
    /// Regex patterns matched against item authors.
    pub denylist: Vec<String>,
    /// Ask the comment provider to skip its server-side cache on refresh.
    pub bypass_cache_on_refresh: bool,
    pub box_score_poll_interval: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            search_quiet_window: SEARCH_QUIET_WINDOW,
            pagination_delay: PAGINATION_DELAY,
            breaker_threshold: BREAKER_THRESHOLD,
            denylist: DEFAULT_DENYLIST.iter().map(|p| p.to_string()).collect(),
            bypass_cache_on_refresh: true,
            box_score_poll_interval: BOX_SCORE_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".into(),
            user_agent: concat!("livescroll-social/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout: Duration::from_secs(10),
        }
    }
}
