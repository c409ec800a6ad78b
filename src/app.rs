//! Driver state: the two feeds, the list cursor, and the viewports that tell
//! the feeds when the end of the list is on screen.

use chrono::{DateTime, Utc};
use ratatui::widgets::ListState;

use livescroll_social::pagination::Viewport;
use livescroll_social::poll::PollMsg;
use livescroll_social::source::BoxScore;
use livescroll_social::{FeedStatus, GameFeed, GameMsg, SearchFeed, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Search,
    Game,
}

/// One display line, independent of which feed produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub tag: String,
    pub author: String,
    pub body: String,
    pub published: Option<DateTime<Utc>>,
}

pub struct App {
    pub search: SearchFeed,
    pub game: Option<GameFeed>,
    pub panel: Panel,
    /// List selection state for scrolling.
    pub list_state: ListState,
    search_viewport: Viewport,
    game_viewport: Viewport,
    pub box_score: Option<BoxScore>,
    /// Whether the user has requested to quit.
    pub quit: bool,
    /// Last out-of-band message (poller results).
    pub status: String,
    /// Rows that fit in the list area, measured on the last draw.
    pub view_height: usize,
}

impl App {
    pub fn new(mut search: SearchFeed, mut game: Option<GameFeed>) -> Self {
        let search_viewport = Viewport::new();
        let game_viewport = Viewport::new();
        search.attach_viewport(&search_viewport);
        if let Some(game) = game.as_mut() {
            game.attach_viewport(&game_viewport);
        }
        let panel = if game.is_some() { Panel::Game } else { Panel::Search };
        Self {
            search,
            game,
            panel,
            list_state: ListState::default(),
            search_viewport,
            game_viewport,
            box_score: None,
            quit: false,
            status: String::new(),
            view_height: 0,
        }
    }

    // -- rows ----------------------------------------------------------------

    pub fn rows(&self) -> Vec<Row> {
        match (self.panel, &self.game) {
            (Panel::Game, Some(game)) => game
                .merged()
                .into_iter()
                .map(|t| Row {
                    tag: match t.side {
                        Side::Away => game.game().away_team.clone(),
                        Side::Home => game.game().home_team.clone(),
                    },
                    author: t.item.author.unwrap_or_default(),
                    body: t.item.body,
                    published: t.item.published,
                })
                .collect(),
            _ => self
                .search
                .items()
                .map(|item| Row {
                    tag: item.source.clone(),
                    author: item.author.clone().unwrap_or_default(),
                    body: item.body.clone(),
                    published: item.published,
                })
                .collect(),
        }
    }

    pub fn row_count(&self) -> usize {
        match (self.panel, &self.game) {
            (Panel::Game, Some(game)) => game.merged().len(),
            _ => self.search.item_count(),
        }
    }

    /// One-line description of the active feed's state.
    pub fn feed_status(&self) -> String {
        match (self.panel, &self.game) {
            (Panel::Game, Some(game)) => {
                if let Some(error) = game.error() {
                    format!("{error} (ctrl-r to retry)")
                } else if game.is_loading() {
                    "Loading game threads…".into()
                } else {
                    match self.row_count() {
                        0 => "No comments yet".into(),
                        n => format!("{n} comments · {}", game.sort_mode()),
                    }
                }
            }
            _ => match self.search.status() {
                FeedStatus::Idle => "Type to search".into(),
                FeedStatus::Searching => "Searching…".into(),
                FeedStatus::LoadingMore => "Loading more…".into(),
                FeedStatus::Empty => "No results".into(),
                FeedStatus::Errored(error) => format!("{error} (ctrl-r to retry)"),
                FeedStatus::Loaded if self.search.breaker().is_tripped() => {
                    format!("{} posts · nothing new further down", self.search.item_count())
                }
                FeedStatus::Loaded => {
                    format!("{} posts · {}", self.search.item_count(), self.search.query().sort_mode)
                }
            },
        }
    }

    // -- intents -------------------------------------------------------------

    pub fn push_char(&mut self, c: char) {
        if self.panel != Panel::Search {
            return;
        }
        let mut text = self.search.query().text.clone();
        text.push(c);
        self.search.set_text(&text);
    }

    pub fn pop_char(&mut self) {
        if self.panel != Panel::Search {
            return;
        }
        let mut text = self.search.query().text.clone();
        text.pop();
        self.search.set_text(&text);
        if text.is_empty() {
            self.list_state.select(None);
        }
    }

    pub fn submit(&mut self) {
        if self.panel == Panel::Search {
            self.search.submit();
            self.list_state.select(None);
        }
    }

    pub fn toggle_sort(&mut self) {
        match (self.panel, self.game.as_mut()) {
            (Panel::Game, Some(game)) => game.toggle_sort(),
            _ => self.search.toggle_sort(),
        }
        self.list_state.select(None);
    }

    pub fn retry(&mut self) {
        match (self.panel, self.game.as_mut()) {
            (Panel::Game, Some(game)) => game.retry(),
            _ => self.search.retry(),
        }
    }

    pub fn refresh(&mut self) {
        match (self.panel, self.game.as_mut()) {
            (Panel::Game, Some(game)) => game.refresh(),
            _ => self.search.refresh(),
        }
        self.list_state.select(None);
    }

    pub fn switch_panel(&mut self) {
        if self.game.is_none() {
            return;
        }
        self.panel = match self.panel {
            Panel::Search => Panel::Game,
            Panel::Game => Panel::Search,
        };
        self.list_state = ListState::default();
        // The panel going off screen must not keep paginating.
        self.search_viewport.set_sentinel_visible(false);
        self.game_viewport.set_sentinel_visible(false);
    }

    // -- messages ------------------------------------------------------------

    pub fn apply_game(&mut self, msg: GameMsg) {
        if let Some(game) = self.game.as_mut() {
            game.apply(msg);
        }
    }

    pub fn apply_poll(&mut self, msg: PollMsg) {
        match msg {
            PollMsg::BoxScore(score) => {
                self.status = format!("Box score updated {}", Utc::now().format("%H:%M:%S"));
                self.box_score = Some(score);
            }
            PollMsg::Error { game_id, error } => {
                self.status = format!("Box score {game_id}: {error}");
            }
        }
    }

    /// Report to the active feed whether the last row is on screen.
    pub fn sync_viewport(&mut self) {
        let rows = self.row_count();
        let visible = rows > 0 && self.list_state.offset() + self.view_height >= rows;
        match self.panel {
            Panel::Search => self.search_viewport.set_sentinel_visible(visible),
            Panel::Game => self.game_viewport.set_sentinel_visible(visible),
        };
    }

    pub fn close(&mut self) {
        self.search.close();
        if let Some(game) = self.game.as_mut() {
            game.close();
        }
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(len - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if self.row_count() > 0 {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.list_state.select(Some(len - 1));
        }
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let step = self.view_height.max(1);
        let i = self.list_state.selected().map_or(0, |i| i + step);
        self.list_state.select(Some(i.min(len - 1)));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let step = self.view_height.max(1);
        let i = self.list_state.selected().map_or(0, |i| i.saturating_sub(step));
        self.list_state.select(Some(i));
    }
}
