//! livescroll-social: a terminal driver for the live social-feed engine.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌────────────┐ FeedMsg / GameMsg ┌──────────┐  draw()  ┌──────────┐
//! │ feed tasks │ ────────────────► │  app.rs  │ ───────► │  ui.rs   │
//! │  (tokio)   │    (inboxes)      │ (state)  │          │ (render) │
//! └────────────┘                   └──────────┘          └──────────┘
//! ┌────────────┐     PollMsg            ▲  ▲
//! │  poller    │ ───────────────────────┘  │ handle_key_event()
//! └────────────┘                      ┌──────────┐
//!                                     │ input.rs │
//!                                     └──────────┘
//! ```
//!
//! * **`app`**: owns the search feed, the optional game feed and the list
//!   position; reports sentinel visibility back to the feeds.
//! * **`ui`**: pure rendering: reads `App` state and draws widgets.
//! * **`input`**: maps key events to `App` mutations.
//! * **`main`**: parses arguments, builds the engine, sets up the terminal
//!   and runs a single-threaded event loop over keys, feed inboxes and the
//!   box-score poller.

mod app;
mod input;
mod ui;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;

use livescroll_social::boxscore::BoxScores;
use livescroll_social::config::DEFAULT_DENYLIST;
use livescroll_social::poll::{spawn_box_score_poller, PollHandle, PollMsg};
use livescroll_social::source::{ArbApiClient, TeamDirectory};
use livescroll_social::{
    telemetry, ApiConfig, FeedConfig, GameFeed, GameInbox, GameRef, League, SearchFeed, Session,
};

use app::App;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(version, about = "Live social feeds for a game, in the terminal")]
struct Args {
    /// Base URL of the application backend.
    #[arg(long, env = "LIVESCROLL_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Write logs here (the terminal is taken by the UI).
    #[arg(long, env = "LIVESCROLL_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Search to run on start-up.
    #[arg(long, env = "LIVESCROLL_QUERY")]
    query: Option<String>,

    /// Open the comment panel for this game.
    #[arg(long, env = "LIVESCROLL_GAME_ID", requires_all = ["away", "home"])]
    game_id: Option<String>,

    #[arg(long, env = "LIVESCROLL_LEAGUE", default_value = "mlb")]
    league: League,

    /// Away team, full name or nickname.
    #[arg(long, env = "LIVESCROLL_AWAY")]
    away: Option<String>,

    /// Home team, full name or nickname.
    #[arg(long, env = "LIVESCROLL_HOME")]
    home: Option<String>,

    #[arg(long, env = "LIVESCROLL_QUIET_MS", default_value_t = 1000)]
    quiet_ms: u64,

    #[arg(long, env = "LIVESCROLL_PAGE_DELAY_MS", default_value_t = 300)]
    page_delay_ms: u64,

    #[arg(long, env = "LIVESCROLL_BREAKER", default_value_t = 3)]
    breaker_threshold: u32,

    /// Extra author patterns to hide (regex, comma separated).
    #[arg(long = "deny", env = "LIVESCROLL_DENYLIST", value_delimiter = ',')]
    deny: Vec<String>,

    /// Let refresh reuse the backend's cached comments.
    #[arg(long, env = "LIVESCROLL_KEEP_CACHE_ON_REFRESH")]
    keep_cache_on_refresh: bool,

    /// Box-score polling period, in seconds.
    #[arg(
        long,
        env = "LIVESCROLL_POLL_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_secs: u64,

    #[arg(long, env = "LIVESCROLL_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,
}

impl Args {
    fn feed_config(&self) -> FeedConfig {
        let mut denylist: Vec<String> = DEFAULT_DENYLIST.iter().map(|p| p.to_string()).collect();
        denylist.extend(self.deny.iter().cloned());
        FeedConfig {
            search_quiet_window: Duration::from_millis(self.quiet_ms),
            pagination_delay: Duration::from_millis(self.page_delay_ms),
            breaker_threshold: self.breaker_threshold,
            denylist,
            bypass_cache_on_refresh: !self.keep_cache_on_refresh,
            box_score_poll_interval: Duration::from_secs(self.poll_secs),
        }
    }

    fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            request_timeout: Duration::from_secs(self.timeout_secs),
            ..ApiConfig::default()
        }
    }

    fn game(&self) -> Option<GameRef> {
        Some(GameRef {
            game_id: self.game_id.clone()?,
            league: self.league,
            away_team: self.away.clone()?,
            home_team: self.home.clone()?,
        })
    }
}

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Enters raw mode + alternate screen on construction and restores the
/// terminal when dropped, including during unwinding.
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before the default hook prints the panic.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// `recv` on an optional channel; pends forever when there is none.
async fn recv_opt<M>(rx: &mut Option<UnboundedReceiver<M>>) -> Option<M> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init_tracing(args.log_file.as_deref())?;
    install_panic_hook();

    // -- engine --------------------------------------------------------------
    let feed_config = args.feed_config();
    let api = Arc::new(ArbApiClient::new(&args.api_config())?);
    let session = Session::new();
    info!(api = api.base_url(), "starting");

    let (search, mut search_inbox) = SearchFeed::new(api.clone(), &session, &feed_config)?;

    let mut game_inbox: Option<GameInbox> = None;
    let mut poll_rx: Option<UnboundedReceiver<PollMsg>> = None;
    let mut _poller: Option<PollHandle> = None;
    let game = match args.game() {
        Some(game) => {
            let (feed, inbox) = GameFeed::open(
                game.clone(),
                api.clone(),
                &TeamDirectory::builtin(),
                &session,
                &feed_config,
            )?;
            let (handle, rx) = spawn_box_score_poller(
                BoxScores::new(api.clone(), &session),
                vec![game],
                feed_config.box_score_poll_interval,
            );
            game_inbox = Some(inbox);
            poll_rx = Some(rx);
            _poller = Some(handle);
            Some(feed)
        }
        None => None,
    };

    let mut app = App::new(search, game);
    if let Some(query) = args.query.as_deref() {
        app.search.set_text(query);
        app.search.submit();
    }

    // -- terminal setup (RAII: Drop restores on exit or panic) --------------
    let mut guard = TerminalGuard::new()?;
    let mut events = EventStream::new();

    // -- main event loop -----------------------------------------------------
    // Each iteration renders, reports sentinel visibility, then waits for the
    // next key, feed message or poll result.
    loop {
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;
        app.sync_viewport();

        tokio::select! {
            Some(msg) = search_inbox.recv() => app.search.apply(msg),
            Some(msg) = recv_opt(&mut game_inbox) => app.apply_game(msg),
            Some(msg) = recv_opt(&mut poll_rx) => app.apply_poll(msg),
            event = events.next() => match event {
                Some(Ok(Event::Key(key))) => input::handle_key_event(&mut app, key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
        }

        if app.quit {
            break;
        }
    }

    app.close();
    session.clear();
    info!("bye");
    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
