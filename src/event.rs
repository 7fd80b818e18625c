//! Keyboard event handling.
//!
//! Normal mode keys:
//! - `h` `j` `k` `l` or arrows: move
//! - `0` or `Home`: first column
//! - `$` or `End`: last column
//! - `PageUp` / `PageDown`: previous / next block
//! - `u`: undo, `Ctrl-r`: redo
//! - `?`: help
//! - `:`: command line (see [`crate::command_line`])
//! - `Ctrl-c`: quit without asking

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use std::time::Duration;

use crate::state::{AppMode, AppState};

/// Actions that can be triggered by keyboard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// No action (key not recognized)
    None,
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    /// `0` or `Home`
    GotoFirstColumn,
    /// `$` or `End`
    GotoLastColumn,
    PageUp,
    PageDown,
    Undo,
    Redo,
    ShowHelp,
    /// Dismiss the help overlay
    DismissHelp,
    EnterCommandMode,
    /// Add character to command buffer
    CommandChar(char),
    ExecuteCommand,
    CancelCommand,
    CommandBackspace,
    /// Terminal resized
    Resize(u16, u16),
}

/// Polls for keyboard events with a timeout.
///
/// Returns `None` if no event occurred within the timeout.
pub fn poll_event(timeout: Duration) -> Option<Event> {
    if event::poll(timeout).ok()? {
        event::read().ok()
    } else {
        None
    }
}

/// Converts a crossterm event to an Action based on current app mode.
pub fn handle_event(event: Event, mode: &AppMode, show_help: bool) -> Action {
    match event {
        Event::Key(key_event) => handle_key_event(key_event, mode, show_help),
        Event::Resize(width, height) => Action::Resize(width, height),
        _ => Action::None,
    }
}

fn handle_key_event(key: KeyEvent, mode: &AppMode, show_help: bool) -> Action {
    // If help is shown, any key dismisses it
    if show_help {
        return Action::DismissHelp;
    }

    match mode {
        AppMode::Normal => handle_normal_mode(key),
        AppMode::Command(_) => handle_command_mode(key),
    }
}

fn handle_normal_mode(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Quit,
            KeyCode::Char('r') => Action::Redo,
            _ => Action::None,
        };
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => Action::MoveDown,
        KeyCode::Char('k') | KeyCode::Up => Action::MoveUp,
        KeyCode::Char('l') | KeyCode::Right => Action::MoveRight,
        KeyCode::Char('h') | KeyCode::Left => Action::MoveLeft,

        KeyCode::Char('0') | KeyCode::Home => Action::GotoFirstColumn,
        KeyCode::Char('$') | KeyCode::End => Action::GotoLastColumn,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,

        KeyCode::Char('u') => Action::Undo,
        KeyCode::Char('?') => Action::ShowHelp,
        KeyCode::Char(':') => Action::EnterCommandMode,

        _ => Action::None,
    }
}

fn handle_command_mode(key: KeyEvent) -> Action {
    match key.code {
        KeyCode::Enter => Action::ExecuteCommand,
        KeyCode::Esc => Action::CancelCommand,
        KeyCode::Backspace => Action::CommandBackspace,
        KeyCode::Char(c) => Action::CommandChar(c),
        _ => Action::None,
    }
}

/// Applies an action to the application state.
///
/// Returns `true` if the application should continue, `false` if it should quit.
pub fn apply_action(state: &mut AppState, action: Action) -> bool {
    match action {
        Action::None | Action::Resize(_, _) => {}
        Action::Quit => state.should_quit = true,
        Action::MoveUp => state.move_up(),
        Action::MoveDown => state.move_down(),
        Action::MoveLeft => state.move_left(),
        Action::MoveRight => state.move_right(),
        Action::GotoFirstColumn => state.goto_first_column(),
        Action::GotoLastColumn => state.goto_last_column(),
        Action::PageUp => state.page_back(),
        Action::PageDown => state.page_forward(),
        Action::Undo => state.undo(),
        Action::Redo => state.redo(),
        Action::ShowHelp => state.toggle_help(),
        Action::DismissHelp => state.dismiss_help(),
        Action::EnterCommandMode => {
            state.status_message = None;
            state.enter_command_mode();
        }
        Action::CommandChar(c) => state.command_input(c),
        Action::ExecuteCommand => state.execute_command(),
        Action::CancelCommand => state.cancel_command(),
        Action::CommandBackspace => state.command_backspace(),
    }

    !state.should_quit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::model::Sequence;
    use crate::ui::glyphs::Glyphs;
    use crate::view::ViewSettings;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_normal_mode_navigation() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('h')), &mode, false), Action::MoveLeft);
        assert_eq!(handle_key_event(key(KeyCode::Char('j')), &mode, false), Action::MoveDown);
        assert_eq!(handle_key_event(key(KeyCode::Char('k')), &mode, false), Action::MoveUp);
        assert_eq!(handle_key_event(key(KeyCode::Char('l')), &mode, false), Action::MoveRight);
        assert_eq!(handle_key_event(key(KeyCode::Left), &mode, false), Action::MoveLeft);
        assert_eq!(handle_key_event(key(KeyCode::Down), &mode, false), Action::MoveDown);
    }

    #[test]
    fn test_jump_navigation() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('0')), &mode, false), Action::GotoFirstColumn);
        assert_eq!(handle_key_event(key(KeyCode::Char('$')), &mode, false), Action::GotoLastColumn);
        assert_eq!(handle_key_event(key(KeyCode::Home), &mode, false), Action::GotoFirstColumn);
        assert_eq!(handle_key_event(key(KeyCode::End), &mode, false), Action::GotoLastColumn);
        assert_eq!(handle_key_event(key(KeyCode::PageDown), &mode, false), Action::PageDown);
    }

    #[test]
    fn test_undo_redo_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('u')), &mode, false), Action::Undo);
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(ctrl_r, &mode, false), Action::Redo);
        // plain r does nothing
        assert_eq!(handle_key_event(key(KeyCode::Char('r')), &mode, false), Action::None);
    }

    #[test]
    fn test_ctrl_c_quit() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(handle_key_event(ctrl_c, &AppMode::Normal, false), Action::Quit);
    }

    #[test]
    fn test_command_mode_input() {
        let mode = AppMode::Command(String::new());
        assert_eq!(handle_key_event(key(KeyCode::Char('q')), &mode, false), Action::CommandChar('q'));
        // movement keys are text on the command line
        assert_eq!(handle_key_event(key(KeyCode::Char('j')), &mode, false), Action::CommandChar('j'));
        assert_eq!(handle_key_event(key(KeyCode::Enter), &mode, false), Action::ExecuteCommand);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, false), Action::CancelCommand);
        assert_eq!(handle_key_event(key(KeyCode::Backspace), &mode, false), Action::CommandBackspace);
    }

    #[test]
    fn test_help_keys() {
        let mode = AppMode::Normal;
        assert_eq!(handle_key_event(key(KeyCode::Char('?')), &mode, false), Action::ShowHelp);
        // Any key when help is shown should dismiss help
        assert_eq!(handle_key_event(key(KeyCode::Char('x')), &mode, true), Action::DismissHelp);
        assert_eq!(handle_key_event(key(KeyCode::Esc), &mode, true), Action::DismissHelp);
    }

    #[test]
    fn test_resize_event() {
        assert_eq!(handle_event(Event::Resize(80, 24), &AppMode::Normal, false), Action::Resize(80, 24));
    }

    #[test]
    fn test_apply_actions() {
        let mut document = Document::new();
        document.add_sequences(vec![Sequence::from_text("A", "ACGT")]);
        let mut state = AppState::new(document, ViewSettings::default(), Glyphs::default());
        state.update_viewport_size(10, 40);

        assert!(apply_action(&mut state, Action::MoveRight));
        assert_eq!(state.cursor.col, 1);

        for action in [
            Action::EnterCommandMode,
            Action::CommandChar('g'),
            Action::CommandChar('a'),
            Action::CommandChar('p'),
            Action::ExecuteCommand,
        ] {
            apply_action(&mut state, action);
        }
        assert_eq!(state.document.sequences()[0].as_string(), "A~CGT");

        apply_action(&mut state, Action::Undo);
        assert_eq!(state.document.sequences()[0].as_string(), "ACGT");
        apply_action(&mut state, Action::Redo);
        assert_eq!(state.document.sequences()[0].as_string(), "A~CGT");

        apply_action(&mut state, Action::ShowHelp);
        assert!(state.show_help);
        apply_action(&mut state, Action::DismissHelp);
        assert!(!state.show_help);

        assert!(!apply_action(&mut state, Action::Quit));
    }
}
