//! Background box-score polling.
//!
//! Runs as a tokio task that re-requests every tracked game on a fixed
//! interval and sends results to the event loop over an [`mpsc`] channel.
//!
//! ## For contributors
//!
//! Each game is fetched in its own task so one slow game never delays the
//! rest.  A game whose previous request is still running is skipped for that
//! tick rather than queued; the request cache would coalesce it anyway, but
//! skipping keeps slow games from piling up waiters.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::boxscore::BoxScores;
use crate::error::FetchError;
use crate::game::GameRef;
use crate::source::BoxScore;

/// Messages sent from the poller to the event loop.
#[derive(Debug)]
pub enum PollMsg {
    BoxScore(BoxScore),
    Error { game_id: String, error: FetchError },
}

/// Owns the polling task.  Dropping it stops polling.
#[derive(Debug)]
pub struct PollHandle {
    handle: JoinHandle<()>,
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Shortest accepted polling period.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Start polling `games` every `interval`, first tick immediately.  Intervals
/// below [`MIN_POLL_INTERVAL`] are raised to it.
pub fn spawn_box_score_poller(
    scores: BoxScores,
    games: Vec<GameRef>,
    interval: Duration,
) -> (PollHandle, mpsc::UnboundedReceiver<PollMsg>) {
    let (tx, rx) = mpsc::unbounded_channel();
    if interval < MIN_POLL_INTERVAL {
        warn!(?interval, min = ?MIN_POLL_INTERVAL, "poll interval too short, clamping");
    }
    let interval = interval.max(MIN_POLL_INTERVAL);

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // If the receiver is gone the event loop has exited.
            if tx.is_closed() {
                return;
            }
            for game in &games {
                if scores.is_fetching(game.league, &game.game_id) {
                    debug!(game = %game.game_id, "skipping tick, previous fetch still running");
                    continue;
                }
                let scores = scores.clone();
                let tx = tx.clone();
                let game = game.clone();
                tokio::spawn(async move {
                    let msg = match scores.fetch(game.league, &game.game_id).await {
                        Ok(score) => PollMsg::BoxScore(score),
                        Err(error) => PollMsg::Error {
                            game_id: game.game_id,
                            error,
                        },
                    };
                    let _ = tx.send(msg);
                });
            }
        }
    });

    (PollHandle { handle }, rx)
}
