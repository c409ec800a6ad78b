//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! ## For contributors
//!
//! * Layout, top to bottom: the search box (search panel only), the item
//!   list, the box-score line (game panel only) and a one-line status bar.
//! * [`draw`] records the list's inner height on the app; the main loop uses
//!   it to tell the active feed whether the end of the list is on screen.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, Panel};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let search_height = if app.panel == Panel::Search { 3 } else { 0 };
    let score_height = if app.panel == Panel::Game { 1 } else { 0 };
    let [search_area, list_area, score_area, status_area] = Layout::vertical([
        Constraint::Length(search_height),
        Constraint::Min(1),
        Constraint::Length(score_height),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    if app.panel == Panel::Search {
        draw_search_box(app, frame, search_area);
    } else {
        draw_box_score(app, frame, score_area);
    }
    draw_feed_list(app, frame, list_area);
    draw_status_bar(app, frame, status_area);
}

fn draw_search_box(app: &App, frame: &mut Frame, area: Rect) {
    let query = app.search.query();
    let input = Paragraph::new(query.text.as_str()).block(
        Block::default()
            .title(format!(" Search · {} ", query.sort_mode))
            .borders(Borders::ALL),
    );
    frame.render_widget(input, area);
}

fn draw_box_score(app: &App, frame: &mut Frame, area: Rect) {
    let text = match &app.box_score {
        Some(score) => format!(" {} {}: {}", score.league, score.game_id, score.payload),
        None => " Box score pending".to_string(),
    };
    frame.render_widget(Paragraph::new(text), area);
}

/// Render the scrollable feed item list.
fn draw_feed_list(app: &mut App, frame: &mut Frame, area: Rect) {
    app.view_height = area.height.saturating_sub(2) as usize;

    let list_items: Vec<ListItem> = app
        .rows()
        .into_iter()
        .map(|row| {
            let time = row
                .published
                .map(|d| d.format("%H:%M").to_string())
                .unwrap_or_else(|| "--:--".into());

            ListItem::new(Line::from(vec![
                Span::styled(time, Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(format!("[{}]", row.tag), Style::default().fg(Color::Cyan)),
                Span::raw(" "),
                Span::styled(format!("{}:", row.author), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::raw(row.body),
            ]))
        })
        .collect();

    let title = match (app.panel, &app.game) {
        (Panel::Game, Some(game)) => {
            let g = game.game();
            format!(" {} @ {} ", g.away_team, g.home_team)
        }
        _ => " Posts ".to_string(),
    };

    let list = List::new(list_items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(app.feed_status(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::raw(app.status.as_str()),
        Span::raw("  esc: quit  tab: sort  ^r: retry  F5: refresh  F2: panel"),
    ]));
    frame.render_widget(status, area);
}
