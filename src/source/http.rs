//! Backend API client.
//!
//! [`ArbApiClient`] implements [`SearchProvider`], [`CommentProvider`] and
//! [`BoxScoreProvider`] against the application backend over HTTP.  The wire
//! structs below are private: they are decoded leniently (every field the
//! engine can live without is defaulted) and converted into the
//! provider-neutral shapes from [`super`] straight away.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{
    parse_timestamp, BoxScore, BoxScoreProvider, Comment, CommentListing, CommentProvider,
    CommentRequest, Engagement, FeedItem, SearchPage, SearchProvider, ThreadLookup, ThreadPost,
};
use crate::config::ApiConfig;
use crate::error::{FetchError, FetchResult};
use crate::game::League;
use crate::query::{Cursor, SortMode};

const SEARCH_PATH: &str = "/api/v1/twitter-search";
const THREAD_PATH: &str = "/api/v1/reddit-thread";
const COMMENTS_PATH: &str = "/api/v1/reddit-thread-comments";
const BOX_SCORE_PATH: &str = "/api/v1/box-score";

/// Source tag stamped on every search result.
pub const TWITTER_SOURCE: &str = "twitter";

/// HTTP client for the application backend.
#[derive(Clone)]
pub struct ArbApiClient {
    client: Client,
    base_url: String,
}

impl ArbApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, path: &str, params: &[(&str, String)]) -> FetchResult<Response> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let err = FetchError::from_status(status);
        if err == FetchError::NotFound {
            debug!(url = %url, "upstream has no data");
        } else {
            warn!(url = %url, status = %status, "upstream request failed");
        }
        Err(err)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> FetchResult<T> {
        let body = self.send(path, params).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn search_page(
        &self,
        query: &str,
        sort: SortMode,
        cursor: Option<&Cursor>,
    ) -> FetchResult<SearchPage> {
        let mut params = vec![
            ("query", query.to_string()),
            ("queryType", sort.as_query_type().to_string()),
        ];
        if let Some(cursor) = cursor {
            params.push(("cursor", cursor.to_string()));
        }
        let wire: SearchResponseWire = self.get_json(SEARCH_PATH, &params).await?;
        Ok(wire.into_page())
    }
}

#[async_trait]
impl SearchProvider for ArbApiClient {
    #[instrument(skip(self), fields(sort = %sort))]
    async fn search(&self, query: &str, sort: SortMode) -> FetchResult<SearchPage> {
        self.search_page(query, sort, None).await
    }

    #[instrument(skip(self), fields(sort = %sort, cursor = %cursor))]
    async fn search_more(
        &self,
        query: &str,
        sort: SortMode,
        cursor: &Cursor,
    ) -> FetchResult<SearchPage> {
        self.search_page(query, sort, Some(cursor)).await
    }
}

#[async_trait]
impl CommentProvider for ArbApiClient {
    #[instrument(skip(self), fields(league = %league))]
    async fn find_thread(&self, subreddit: &str, league: League) -> FetchResult<ThreadLookup> {
        let params = [
            ("subreddit", subreddit.to_string()),
            ("league", league.to_string()),
        ];
        match self.send(THREAD_PATH, &params).await {
            Ok(_) => Ok(ThreadLookup::Found),
            Err(FetchError::NotFound) => Ok(ThreadLookup::NotFound),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, request), fields(subreddit = %request.subreddit, game_id = %request.game_id))]
    async fn get_comments(&self, request: &CommentRequest) -> FetchResult<CommentListing> {
        let mut params = vec![
            ("subreddit", request.subreddit.clone()),
            ("game_id", request.game_id.clone()),
            ("kind", request.sort.as_comment_kind().to_string()),
            ("bypass_cache", request.bypass_cache.to_string()),
        ];
        if let Some(after) = &request.after {
            params.push(("after", after.to_string()));
        }
        let wire: CommentsResponseWire = self.get_json(COMMENTS_PATH, &params).await?;
        Ok(wire.into_listing())
    }
}

#[async_trait]
impl BoxScoreProvider for ArbApiClient {
    #[instrument(skip(self), fields(league = %league))]
    async fn get_box_score(&self, league: League, game_id: &str) -> FetchResult<BoxScore> {
        let params = [
            ("league", league.to_string()),
            ("game_id", game_id.to_string()),
        ];
        let payload: serde_json::Value = self.get_json(BOX_SCORE_PATH, &params).await?;
        Ok(BoxScore {
            league,
            game_id: game_id.to_string(),
            payload,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct SearchResponseWire {
    #[serde(default)]
    tweets: Vec<TweetWire>,
    #[serde(default)]
    has_next_page: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

impl SearchResponseWire {
    fn into_page(self) -> SearchPage {
        let next_cursor = self
            .next_cursor
            .filter(|c| !c.is_empty())
            .map(Cursor::new);
        SearchPage {
            has_next_page: self.has_next_page && next_cursor.is_some(),
            next_cursor,
            items: self.tweets.into_iter().map(TweetWire::into_item).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TweetWire {
    id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(rename = "likeCount", default)]
    like_count: Option<i64>,
    #[serde(rename = "replyCount", default)]
    reply_count: Option<i64>,
    #[serde(rename = "retweetCount", default)]
    retweet_count: Option<i64>,
    #[serde(rename = "quoteCount", default)]
    quote_count: Option<i64>,
    #[serde(rename = "viewCount", default)]
    view_count: Option<i64>,
    #[serde(rename = "createdAt", default)]
    created_at: Option<String>,
    #[serde(default)]
    author: Option<TweetAuthorWire>,
}

#[derive(Debug, Deserialize)]
struct TweetAuthorWire {
    #[serde(rename = "userName", default)]
    user_name: Option<String>,
}

impl TweetWire {
    fn into_item(self) -> FeedItem {
        // https://x.com/<user>/status/<id>
        let from_url = self
            .url
            .as_deref()
            .and_then(|u| u.split('/').nth(3))
            .filter(|s| !s.is_empty())
            .map(String::from);
        let author = self.author.and_then(|a| a.user_name).or(from_url);

        FeedItem {
            id: self.id,
            author,
            body: self.text,
            source: TWITTER_SOURCE.to_string(),
            published: self.created_at.as_deref().and_then(parse_timestamp),
            link: self.url,
            engagement: Engagement {
                likes: self.like_count,
                replies: self.reply_count,
                reshares: self.retweet_count,
                quotes: self.quote_count,
                views: self.view_count,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentsResponseWire {
    #[serde(default)]
    posts: Vec<PostWire>,
    #[serde(default, alias = "after")]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostWire {
    #[serde(default)]
    comments: Vec<CommentWire>,
}

#[derive(Debug, Deserialize)]
struct CommentWire {
    id: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    subreddit: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    replies: Vec<CommentWire>,
}

impl CommentWire {
    fn into_comment(self) -> Comment {
        Comment {
            id: self.id,
            author: self.author,
            subreddit: self.subreddit,
            content: self.content,
            score: self.score,
            timestamp: self.timestamp,
            replies: self.replies.into_iter().map(CommentWire::into_comment).collect(),
        }
    }
}

impl CommentsResponseWire {
    fn into_listing(self) -> CommentListing {
        CommentListing {
            posts: self
                .posts
                .into_iter()
                .map(|p| ThreadPost {
                    comments: p.comments.into_iter().map(CommentWire::into_comment).collect(),
                })
                .collect(),
            next_cursor: self.next_cursor.filter(|c| !c.is_empty()).map(Cursor::new),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
