//! livescroll-social: a live social-feed engine.
//!
//! Drives two kinds of feed for a sports scores app: a free-text search over
//! a Twitter-like source, and a per-game comment panel that merges the away
//! and home teams' subreddit threads.  Both are infinite-scroll lists fed by
//! cursor pagination.
//!
//! ## Architecture overview
//!
//! ```text
//!  keystrokes ──► debounce ──┐                        ┌──► filter ──► breaker ──► pages
//!                            ▼                        │
//!  viewport ──► pagination ──► store / aggregate ──► cache ──► source (spawned fetch)
//!                  ▲               ▲                              │
//!                  └── timer       └──────── FeedMsg / GameMsg ◄──┘
//! ```
//!
//! * **`source/`**: provider traits, the HTTP client for the app backend,
//!   and the static team → subreddit directory.
//! * **`store`**: [`SearchFeed`](store::SearchFeed), the search state machine.
//! * **`aggregate`**: [`GameFeed`](aggregate::GameFeed), two independent
//!   sides merged into one tagged list.
//! * **`cache`**: per-key in-flight request coalescing.
//! * **`filter`** / **`breaker`**: item quality rules and the runaway-page
//!   guard.
//! * **`debounce`** / **`pagination`** / **`timer`**: the time-based gates.
//! * **`boxscore`** / **`poll`**: coalesced box scores and their poller.
//! * **`session`**: the caches one logical session shares.
//!
//! Feeds are single-owner state machines: fetches run as spawned tasks and
//! report back as messages that the owner applies with `&mut self`.  Nothing
//! is shared between feeds except the [`Session`](session::Session) caches.

pub mod aggregate;
pub mod boxscore;
pub mod breaker;
pub mod cache;
pub mod config;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod game;
pub mod pagination;
pub mod poll;
pub mod query;
pub mod session;
pub mod source;
pub mod store;
pub mod telemetry;
pub mod timer;

#[cfg(test)]
mod testing;

pub use aggregate::{GameFeed, GameInbox, GameMsg, SideStatus, TaggedItem};
pub use config::{ApiConfig, FeedConfig};
pub use error::{FetchError, FetchResult};
pub use game::{GameRef, League, Side};
pub use query::{Cursor, SortMode};
pub use session::Session;
pub use store::{FeedInbox, FeedMsg, FeedStatus, SearchFeed};
