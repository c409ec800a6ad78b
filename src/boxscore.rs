//! Coalesced box-score fetching with a latest-value store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{FetchKey, RequestCache, ResourceType};
use crate::error::FetchResult;
use crate::game::League;
use crate::session::Session;
use crate::source::{BoxScore, BoxScoreProvider};

/// Box scores keyed by `(league, game_id)`.  At most one request per game is
/// in flight; the last successful answer is kept for readers.
#[derive(Clone)]
pub struct BoxScores {
    provider: Arc<dyn BoxScoreProvider>,
    cache: RequestCache<BoxScore>,
    latest: Arc<Mutex<HashMap<(League, String), BoxScore>>>,
}

impl BoxScores {
    pub fn new(provider: Arc<dyn BoxScoreProvider>, session: &Session) -> Self {
        Self {
            provider,
            cache: session.box_scores().clone(),
            latest: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn key(league: League, game_id: &str) -> FetchKey {
        FetchKey::new(ResourceType::BoxScore, game_id).with("league", league)
    }

    /// Fetch, joining an identical request already in flight.
    pub async fn fetch(&self, league: League, game_id: &str) -> FetchResult<BoxScore> {
        let provider = Arc::clone(&self.provider);
        let result = self
            .cache
            .fetch(Self::key(league, game_id), || async move {
                provider.get_box_score(league, game_id).await
            })
            .await;

        if let Ok(score) = &result {
            self.latest
                .lock()
                .insert((league, game_id.to_string()), score.clone());
        }
        result
    }

    /// Advisory: a poller uses this to skip games that are still loading.
    pub fn is_fetching(&self, league: League, game_id: &str) -> bool {
        let busy = self.cache.is_in_flight(&Self::key(league, game_id));
        if busy {
            debug!(%league, game_id, "box score still in flight");
        }
        busy
    }

    pub fn get(&self, league: League, game_id: &str) -> Option<BoxScore> {
        self.latest.lock().get(&(league, game_id.to_string())).cloned()
    }
}
