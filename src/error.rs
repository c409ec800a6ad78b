//! Fetch-level error taxonomy.
//!
//! Every provider call resolves to a [`FetchResult`].  Errors are values: the
//! spawned fetch task hands them back to the owning feed inside a message, the
//! feed stores them on its state, and the driver renders
//! [`FetchError`]'s `Display` text to the user.  Nothing in the engine lets a
//! fetch error escape the event loop.

use reqwest::StatusCode;
use thiserror::Error;

/// Why a fetch did not produce data.
///
/// `Clone` because a single coalesced result is broadcast to every caller
/// waiting on the same [`FetchKey`](crate::cache::FetchKey).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Rate limit exceeded. Please try again in a few minutes.")]
    RateLimited,

    #[error("Authentication with the upstream API failed.")]
    AuthFailed,

    /// No thread / no data.  A normal outcome for a game that has no game
    /// thread yet; callers decide whether to surface it.
    #[error("Nothing found.")]
    NotFound,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream API error: HTTP {0}")]
    Http(u16),

    #[error("Unexpected response from upstream: {0}")]
    InvalidResponseShape(String),

    /// The leader of a coalesced request went away without completing it.
    #[error("Request was abandoned before it completed.")]
    Abandoned,
}

pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::TOO_MANY_REQUESTS => FetchError::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::AuthFailed,
            StatusCode::NOT_FOUND => FetchError::NotFound,
            other => FetchError::Http(other.as_u16()),
        }
    }

    /// Rate-limit and auth failures stop pagination until the user retries.
    pub fn halts_pagination(&self) -> bool {
        matches!(self, FetchError::RateLimited | FetchError::AuthFailed)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::InvalidResponseShape(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::from_status(status)
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::InvalidResponseShape(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(FetchError::from_status(StatusCode::TOO_MANY_REQUESTS), FetchError::RateLimited);
        assert_eq!(FetchError::from_status(StatusCode::UNAUTHORIZED), FetchError::AuthFailed);
        assert_eq!(FetchError::from_status(StatusCode::FORBIDDEN), FetchError::AuthFailed);
        assert_eq!(FetchError::from_status(StatusCode::NOT_FOUND), FetchError::NotFound);
        assert_eq!(FetchError::from_status(StatusCode::BAD_GATEWAY), FetchError::Http(502));
    }

    #[test]
    fn only_rate_limit_and_auth_halt_pagination() {
        assert!(FetchError::RateLimited.halts_pagination());
        assert!(FetchError::AuthFailed.halts_pagination());
        assert!(!FetchError::NotFound.halts_pagination());
        assert!(!FetchError::Network("reset".into()).halts_pagination());
        assert!(!FetchError::Http(500).halts_pagination());
    }

    #[test]
    fn messages_are_user_facing() {
        assert!(FetchError::RateLimited.to_string().contains("try again"));
        assert_eq!(FetchError::Http(503).to_string(), "Upstream API error: HTTP 503");
    }
}
