//! Keyboard input handling.
//!
//! Maps terminal key events to [`App`] actions.  Printable characters go to
//! the search box, so every other action sits on a non-printing key.
//!
//! ## For contributors
//!
//! To add a new keybinding:
//!
//! 1. Add a method on [`App`] for the action (if one doesn't exist).
//! 2. Add a match arm in [`handle_key_event`] that calls it.
//! 3. Update the help text in [`crate::ui`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::App;

/// Process a single key event, updating app state accordingly.
///
/// Only reacts to key-press events (ignoring release / repeat) so that each
/// physical keypress triggers exactly one action.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.quit = true,
        KeyCode::Char('c') if ctrl => app.quit = true,
        KeyCode::Char('r') if ctrl => app.retry(),
        KeyCode::F(5) => app.refresh(),
        KeyCode::F(2) => app.switch_panel(),
        KeyCode::Tab => app.toggle_sort(),
        KeyCode::Enter => app.submit(),
        KeyCode::Backspace => app.pop_char(),
        KeyCode::Down => app.select_next(),
        KeyCode::Up => app.select_previous(),
        KeyCode::PageDown => app.page_down(),
        KeyCode::PageUp => app.page_up(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::Char(c) if !ctrl => app.push_char(c),
        _ => {}
    }
}
