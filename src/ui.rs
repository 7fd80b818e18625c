//! TUI rendering module.
//!
//! Screen layout:
//! - names panel on the left, aligned with the letter rows of each block
//! - sequence panel with ruler, coloured letters and annotation backgrounds
//! - one line status bar (mode, command line or message, cursor info)
//! - help overlay on `?` or `:help`

pub mod glyphs;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::state::{AppMode, AppState};
use crate::view::{row_letters, ruler_numbers, ruler_ticks, short_name, LayoutLine, LineKind};

/// Width reserved for sequence names (including border and padding).
const NAME_PANEL_WIDTH: u16 = 20;
/// Minimum width for the sequence panel.
const MIN_SEQ_PANEL_WIDTH: u16 = 10;
/// Height of the status bar.
const STATUS_BAR_HEIGHT: u16 = 1;

const HELP_TEXT: &str = "\
Keys
  h j k l, arrows   move
  0 / Home, $ / End first / last column
  PageUp, PageDown  previous / next block
  u, Ctrl-r         undo, redo
  :                 command line
  ?                 this help
  Ctrl-c            quit at once

Files
  :w [path]   save (JSON, or FASTA by extension)
  :e path     open          :e!  reload from disk
  :import path              add the sequences of a file
  :new        empty document
  :q  :q!     quit, quit discarding changes

Editing at the cursor
  :gap n  :ins TEXT  :del n  :replace TEXT  :aa
  :seq NAME TEXT  :rename NAME  :drop
  :undo  :redo  :<n> go to column n

Annotations
  :ann NAME COLOR    :rmann NAME    :color NAME COLOR
  :annname OLD = NEW :mark [n] NAME :unmark n

View
  :hide n  :reveal [n]  :showhidden  :wrap  :cols n";

/// Colour of a letter.
///
/// This trait allows for different colour schemes to be implemented.
pub trait ColorScheme {
    fn get_color(&self, c: char) -> Color;
}

/// Nucleotide colour scheme.
pub struct BaseColorScheme;

impl ColorScheme for BaseColorScheme {
    fn get_color(&self, c: char) -> Color {
        match c.to_ascii_uppercase() {
            'A' => Color::Green,
            'C' => Color::Red,
            'T' | 'U' => Color::Blue,
            'G' => Color::Magenta,
            '~' => Color::DarkGray,
            _ => Color::Reset,
        }
    }
}

/// Parses an annotation colour: a colour name (`red`, `lightblue`, ...),
/// `#RRGGBB` or a 256-colour index.
pub fn parse_color(value: &str) -> Option<Color> {
    value.trim().parse::<Color>().ok()
}

/// Renders the complete UI.
pub fn render(frame: &mut Frame, state: &AppState) {
    let area = frame.area();

    // Main layout: content area + status bar
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(STATUS_BAR_HEIGHT)])
        .split(area);

    // Split content area: names panel (left) + sequence panel (right)
    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(NAME_PANEL_WIDTH),
            Constraint::Min(MIN_SEQ_PANEL_WIDTH),
        ])
        .split(main_layout[0]);

    render_names_panel(frame, state, content_layout[0]);
    render_sequences_panel(frame, state, content_layout[1]);
    render_status_bar(frame, state, main_layout[1]);

    if state.show_help {
        render_help(frame, area);
    }
}

/// Layout lines currently on screen.
fn visible_lines(state: &AppState) -> &[LayoutLine] {
    let lines = &state.layout.lines;
    let start = state.viewport.first_line.min(lines.len());
    let end = (start + state.viewport.visible_rows).min(lines.len());
    &lines[start..end]
}

/// Renders the sequence names, one per letter row.
fn render_names_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let max_name_len = NAME_PANEL_WIDTH.saturating_sub(3) as usize;

    let lines: Vec<Line> = visible_lines(state)
        .iter()
        .map(|line| match line.kind {
            LineKind::Letters(row) => {
                let name = state
                    .document
                    .sequences()
                    .get(row)
                    .map(|s| short_name(s.name(), max_name_len, state.glyphs.ellipsis))
                    .unwrap_or_default();
                let style = if row == state.cursor.row {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                Line::from(Span::styled(name, style))
            }
            _ => Line::default(),
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title("Sequences");
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Renders ruler and letters of the visible part of the layout.
fn render_sequences_panel(frame: &mut Frame, state: &AppState, area: Rect) {
    let scheme = BaseColorScheme;
    let start = state.viewport.first_col;
    let cols = state.viewport.visible_cols;
    let ruler_style = Style::default().fg(Color::DarkGray);

    let lines: Vec<Line> = visible_lines(state)
        .iter()
        .map(|line| {
            let block = &state.layout.blocks[line.block];
            let end = (start + cols).min(block.len());
            let columns = &block[start.min(end)..end];
            match line.kind {
                LineKind::Numbers => Line::from(Span::styled(ruler_numbers_window(block, start, end), ruler_style)),
                LineKind::Ticks => Line::from(Span::styled(
                    ruler_ticks(&state.document, columns, &state.glyphs),
                    ruler_style,
                )),
                LineKind::Letters(row) => letters_line(state, &scheme, row, columns),
                LineKind::Spacer => Line::default(),
            }
        })
        .collect();

    let dirty = if state.is_dirty() { " [+]" } else { "" };
    let name = state
        .file_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "[No Name]".to_string());
    let title = format!(
        "{}{} [Col: {}/{} | Blocks: {}]",
        name,
        dirty,
        state.cursor.col + 1,
        state.document.width(),
        state.layout.blocks.len()
    );

    let block = Block::default().borders(Borders::ALL).title(title);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Ruler numbers computed over the whole block, then cut to the window so
/// that numbers keep their place while scrolling.
fn ruler_numbers_window(block: &[usize], start: usize, end: usize) -> String {
    ruler_numbers(block)
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

fn letters_line<'a>(state: &AppState, scheme: &impl ColorScheme, row: usize, columns: &[usize]) -> Line<'a> {
    let Some(sequence) = state.document.sequences().get(row) else {
        return Line::default();
    };
    let text = row_letters(&state.document, row, columns);

    let spans: Vec<Span> = columns
        .iter()
        .zip(text.chars())
        .map(|(&col, c)| {
            let mut style = Style::default().fg(scheme.get_color(c));
            if let Some(color) = sequence
                .letter(col)
                .and_then(|l| state.document.annotation_of(l))
                .and_then(|a| parse_color(&a.color))
            {
                style = style.bg(color).fg(Color::Black);
            }
            if state.document.is_hidden(col) {
                style = style.fg(Color::DarkGray).add_modifier(Modifier::DIM);
            }
            if row == state.cursor.row && col == state.cursor.col {
                // Invert colours for cursor position
                style = Style::default()
                    .fg(Color::Black)
                    .bg(Color::White)
                    .add_modifier(Modifier::BOLD);
            }
            Span::styled(c.to_string(), style)
        })
        .collect();

    Line::from(spans)
}

/// Text describing the cursor position, e.g. `seq1 | C 3 (#2) | exon1`.
pub fn cursor_summary(state: &AppState) -> String {
    let Some(info) = state.cursor_info() else {
        return "empty ".to_string();
    };
    let mut summary = format!("{} {}/{} | ", info.sequence, state.cursor.row + 1, state.document.sequence_count());
    match (info.letter, info.ordinal) {
        (Some(letter), Some(ordinal)) => {
            summary.push_str(&format!("{} {} (#{})", letter, info.position, ordinal));
        }
        _ => summary.push_str(&format!("- {}", info.position)),
    }
    if let Some(annotation) = info.annotation {
        summary.push_str(" | ");
        summary.push_str(&annotation);
    }
    summary.push(' ');
    summary
}

/// First line of `message` wrapped to `width`, with an ellipsis if cut.
fn fit_message(message: &str, width: usize, ellipsis: &str) -> String {
    if width == 0 {
        return String::new();
    }
    let wrapped = textwrap::wrap(message, width);
    match wrapped.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, ..] => {
            let keep = width.saturating_sub(ellipsis.chars().count());
            let mut line: String = first.chars().take(keep).collect();
            line.push_str(ellipsis);
            line
        }
    }
}

/// Renders the status bar at the bottom.
fn render_status_bar(frame: &mut Frame, state: &AppState, area: Rect) {
    let position_info = cursor_summary(state);
    let width = area.width as usize;

    let left_content = match &state.mode {
        AppMode::Command(cmd) => format!(" COMMAND | :{}", cmd),
        AppMode::Normal => {
            let message = match (&state.status_message, &state.log_path) {
                (Some(message), _) => message.clone(),
                (None, Some(log)) => format!("Log: {}", log.display()),
                (None, None) => String::new(),
            };
            let room = width.saturating_sub(position_info.chars().count() + 12);
            format!(" NORMAL | {} ", fit_message(&message, room, state.glyphs.ellipsis))
        }
    };

    let left_len = left_content.chars().count();
    let status_line = Line::from(vec![
        Span::styled(left_content, Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(
            " ".repeat(width.saturating_sub(left_len + position_info.chars().count())),
            Style::default().bg(Color::Cyan),
        ),
        Span::styled(
            position_info,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
    ]);

    frame.render_widget(Paragraph::new(status_line), area);
}

/// Help lines wrapped to `width`.
pub fn help_lines(width: usize) -> Vec<String> {
    HELP_TEXT
        .lines()
        .flat_map(|line| {
            if line.is_empty() {
                vec![String::new()]
            } else {
                let indent: String = line.chars().take_while(|c| *c == ' ').collect();
                let options = textwrap::Options::new(width.max(1)).subsequent_indent(&indent);
                let wrapped: Vec<String> = textwrap::wrap(line, options)
                    .into_iter()
                    .map(|l| l.into_owned())
                    .collect();
                wrapped
            }
        })
        .collect()
}

fn render_help(frame: &mut Frame, area: Rect) {
    let width = area.width.saturating_sub(4).min(64);
    let inner_width = width.saturating_sub(2) as usize;
    let lines = help_lines(inner_width);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup = Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width,
        height,
    };

    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Help (any key to close)");
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(text).block(block), popup);
}

/// Calculates the visible dimensions for the sequence panel.
pub fn calculate_visible_dimensions(terminal_width: u16, terminal_height: u16) -> (usize, usize) {
    // Account for borders and status bar
    let visible_cols = terminal_width.saturating_sub(NAME_PANEL_WIDTH + 2) as usize;
    let visible_rows = terminal_height.saturating_sub(STATUS_BAR_HEIGHT + 2) as usize;
    (visible_rows, visible_cols)
}
