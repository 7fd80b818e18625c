//! Application controller.
//!
//! Owns the terminal for the lifetime of an editing session: sets up raw
//! mode and the alternate screen, runs the draw/poll loop, and restores the
//! terminal on drop.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::info;
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::event::{apply_action, handle_event, poll_event, Action};
use crate::state::AppState;
use crate::ui::{calculate_visible_dimensions, render};

/// The main application controller.
pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    state: AppState,
    /// Event poll timeout
    tick_rate: Duration,
}

impl App {
    /// Creates a new application with the given state.
    pub fn new(state: AppState) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            terminal,
            state,
            tick_rate: Duration::from_millis(50),
        })
    }

    /// Runs the main application loop until the user quits.
    pub fn run(&mut self) -> Result<()> {
        self.update_viewport_size()?;
        info!("editor started with {} sequences", self.state.document.sequence_count());

        loop {
            self.terminal.draw(|frame| render(frame, &self.state))?;

            if let Some(event) = poll_event(self.tick_rate) {
                let action = handle_event(event, &self.state.mode, self.state.show_help);

                // Resize needs the actual terminal dimensions
                if let Action::Resize(_, _) = action {
                    self.update_viewport_size()?;
                }

                if !apply_action(&mut self.state, action) {
                    break;
                }
            }
        }

        info!("editor closed");
        Ok(())
    }

    fn update_viewport_size(&mut self) -> Result<()> {
        let size = self.terminal.size()?;
        let (visible_rows, visible_cols) = calculate_visible_dimensions(size.width, size.height);
        self.state.update_viewport_size(visible_rows, visible_cols);
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        // Restore terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Runs the editor on the given state.
pub fn run_app(state: AppState) -> Result<()> {
    let mut app = App::new(state)?;
    app.run()
}

#[cfg(test)]
mod tests {
    use crate::document::{Document, Snapshot};
    use crate::model::Sequence;
    use crate::ui::glyphs::Glyphs;
    use crate::view::ViewSettings;

    use super::*;

    #[test]
    fn test_app_state_creation() {
        let snapshot = Snapshot::from_sequences(vec![
            Sequence::from_text("seq1", "ACGT"),
            Sequence::from_text("seq2", "TGCA"),
        ]);
        let state = AppState::new(Document::from_snapshot(snapshot), ViewSettings::default(), Glyphs::default())
            .with_file("test.json");

        assert_eq!(state.document.sequence_count(), 2);
        assert!(!state.should_quit);
        assert!(!state.is_dirty());
        assert_eq!(state.file_path.as_deref(), Some(std::path::Path::new("test.json")));
    }
}
