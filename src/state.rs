//! Editor state.
//!
//! `AppState` owns the document and everything the editor keeps around it:
//! undo history, view settings and layout, cursor and viewport. It listens
//! to the document so that layout and cursor follow every change, including
//! those made by undo and redo.
//!
//! The cursor addresses a sequence (row) and a document column. It only
//! rests on shown columns; hiding the column under it moves it to the next
//! shown one.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, bail, Context, Result};
use log::{info, warn};

use crate::command_line::{parse_command, EditorCommand};
use crate::commands::{Command, History};
use crate::document::{Change, Document, Snapshot};
use crate::formats::{self, FileFormat};
use crate::model::{normalize_text, Annotation, AnnotationId, Letter, Sequence, SequenceId};
use crate::ui::glyphs::Glyphs;
use crate::ui::parse_color;
use crate::view::{Layout, ViewSettings};

/// The part of the layout currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    /// Index of the first visible layout line
    pub first_line: usize,
    /// Offset of the first visible column within a block
    pub first_col: usize,
    /// Number of visible lines
    pub visible_rows: usize,
    /// Number of visible columns
    pub visible_cols: usize,
}

impl Viewport {
    pub fn new(visible_rows: usize, visible_cols: usize) -> Self {
        Self {
            first_line: 0,
            first_col: 0,
            visible_rows,
            visible_cols,
        }
    }

    pub fn resize(&mut self, visible_rows: usize, visible_cols: usize) {
        self.visible_rows = visible_rows;
        self.visible_cols = visible_cols;
    }
}

/// Cursor position: sequence index and document column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub row: usize,
    pub col: usize,
}

impl Cursor {
    pub fn at(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Input mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AppMode {
    #[default]
    Normal,
    /// Command line input (after pressing ':')
    Command(String),
}

/// What the status bar shows about the letter under the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorInfo {
    pub sequence: String,
    /// `None` past the end of the sequence
    pub letter: Option<char>,
    /// 1-based position, gaps counted
    pub position: usize,
    /// 1-based position, gaps not counted
    pub ordinal: Option<usize>,
    pub annotation: Option<String>,
}

/// The complete editor state.
#[derive(Debug)]
pub struct AppState {
    pub document: Document,
    pub history: History,
    pub settings: ViewSettings,
    pub glyphs: Glyphs,
    pub layout: Layout,
    pub viewport: Viewport,
    pub cursor: Cursor,
    pub mode: AppMode,
    pub should_quit: bool,
    pub show_help: bool,
    pub status_message: Option<String>,
    /// File the document was loaded from or last written to
    pub file_path: Option<PathBuf>,
    /// Where the log goes, if logging is enabled
    pub log_path: Option<PathBuf>,
    changes: Rc<RefCell<Vec<Change>>>,
}

impl AppState {
    pub fn new(mut document: Document, settings: ViewSettings, glyphs: Glyphs) -> Self {
        let changes = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        document.subscribe(move |change| sink.borrow_mut().push(change.clone()));
        let layout = Layout::new(&document, &settings);

        let mut state = Self {
            document,
            history: History::new(),
            settings,
            glyphs,
            layout,
            viewport: Viewport::new(0, 0),
            cursor: Cursor::default(),
            mode: AppMode::Normal,
            should_quit: false,
            show_help: false,
            status_message: None,
            file_path: None,
            log_path: None,
            changes,
        };
        state.clamp_cursor();
        state
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_log_path(mut self, path: Option<PathBuf>) -> Self {
        self.log_path = path;
        self
    }

    /// Updates the viewport size based on terminal dimensions.
    pub fn update_viewport_size(&mut self, rows: usize, cols: usize) {
        self.viewport.resize(rows, cols);
        self.ensure_cursor_visible();
    }

    // ---------------------------------------------------------------------
    // Document changes
    // ---------------------------------------------------------------------

    /// Applies the document changes collected since the last call.
    fn sync(&mut self) {
        let changes: Vec<Change> = self.changes.borrow_mut().drain(..).collect();
        if changes.is_empty() {
            return;
        }
        for change in &changes {
            match change {
                Change::Reset => {
                    self.cursor = Cursor::default();
                    self.viewport.first_line = 0;
                    self.viewport.first_col = 0;
                }
                Change::SequencesAdded { index, .. } => self.cursor.row = *index,
                _ => {}
            }
        }
        self.relayout();
    }

    fn relayout(&mut self) {
        self.layout = Layout::new(&self.document, &self.settings);
        self.clamp_cursor();
        self.ensure_cursor_visible();
    }

    /// Puts the cursor on an existing row and a shown column.
    fn clamp_cursor(&mut self) {
        self.cursor.row = self
            .cursor
            .row
            .min(self.document.sequence_count().saturating_sub(1));
        let shown = self.shown_columns();
        self.cursor.col = match shown.iter().find(|&&c| c >= self.cursor.col) {
            Some(&col) => col,
            None => shown.last().copied().unwrap_or(0),
        };
    }

    fn shown_columns(&self) -> Vec<usize> {
        self.layout.shown_columns().collect()
    }

    // ---------------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------------

    pub fn move_up(&mut self) {
        if self.cursor.row > 0 {
            self.cursor.row -= 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor.row + 1 < self.document.sequence_count() {
            self.cursor.row += 1;
            self.ensure_cursor_visible();
        }
    }

    pub fn move_left(&mut self) {
        self.step_columns(false, 1);
    }

    pub fn move_right(&mut self) {
        self.step_columns(true, 1);
    }

    /// Moves by one block when wrapping, by one screen otherwise.
    pub fn page_forward(&mut self) {
        self.step_columns(true, self.page_size());
    }

    pub fn page_back(&mut self) {
        self.step_columns(false, self.page_size());
    }

    pub fn goto_first_column(&mut self) {
        if let Some(&col) = self.shown_columns().first() {
            self.cursor.col = col;
            self.ensure_cursor_visible();
        }
    }

    pub fn goto_last_column(&mut self) {
        if let Some(&col) = self.shown_columns().last() {
            self.cursor.col = col;
            self.ensure_cursor_visible();
        }
    }

    /// Goes to a 1-based document column.
    pub fn goto_column(&mut self, column: usize) -> Result<()> {
        if column == 0 || column > self.document.width() {
            bail!("Invalid column: {}", column);
        }
        let col = column - 1;
        if self.layout.locate(col).is_none() {
            bail!("Column {} is hidden (:showhidden to show it)", column);
        }
        self.cursor.col = col;
        self.ensure_cursor_visible();
        Ok(())
    }

    fn page_size(&self) -> usize {
        if self.settings.wrap {
            self.settings.columns.max(1)
        } else {
            self.viewport.visible_cols.max(1)
        }
    }

    fn step_columns(&mut self, forward: bool, steps: usize) {
        let shown = self.shown_columns();
        let Some(index) = shown.iter().position(|&c| c == self.cursor.col) else {
            return;
        };
        let target = if forward {
            index.saturating_add(steps).min(shown.len() - 1)
        } else {
            index.saturating_sub(steps)
        };
        self.cursor.col = shown[target];
        self.ensure_cursor_visible();
    }

    /// Scrolls so that the cursor, and the ruler of its block when it fits,
    /// is on screen.
    fn ensure_cursor_visible(&mut self) {
        let (block, offset) = self.layout.locate(self.cursor.col).unwrap_or((0, 0));
        let rows = self.viewport.visible_rows.max(1);

        if let Some(line) = self.layout.letters_line(block, self.cursor.row) {
            // numbers line of the block
            let block_top = line - self.cursor.row - 2;
            if block_top < self.viewport.first_line && line - block_top < rows {
                self.viewport.first_line = block_top;
            } else if line < self.viewport.first_line {
                self.viewport.first_line = line;
            } else if line >= self.viewport.first_line + rows {
                self.viewport.first_line = line + 1 - rows;
            }
        }

        // Horizontal scrolling - center when reaching edge
        let cols = self.viewport.visible_cols;
        if cols > 0 && (offset < self.viewport.first_col || offset >= self.viewport.first_col + cols) {
            self.viewport.first_col = offset.saturating_sub(cols / 2);
        }

        self.clamp_viewport();
    }

    fn clamp_viewport(&mut self) {
        self.viewport.first_line = self
            .viewport
            .first_line
            .min(self.layout.lines.len().saturating_sub(self.viewport.visible_rows));
        self.viewport.first_col = self
            .viewport
            .first_col
            .min(self.layout.max_block_width().saturating_sub(self.viewport.visible_cols));
    }

    // ---------------------------------------------------------------------
    // Status
    // ---------------------------------------------------------------------

    /// Letter, positions and annotation under the cursor.
    pub fn cursor_info(&self) -> Option<CursorInfo> {
        let sequence = self.document.sequences().get(self.cursor.row)?;
        let letter = sequence.letter(self.cursor.col);
        Some(CursorInfo {
            sequence: sequence.name().to_string(),
            letter: letter.map(Letter::character),
            position: self.cursor.col + 1,
            ordinal: letter.and_then(|l| sequence.ordinal_excluding_gaps(l.id()).ok()),
            annotation: letter
                .and_then(|l| self.document.annotation_of(l))
                .map(|a| a.description.clone()),
        })
    }

    pub fn is_dirty(&self) -> bool {
        self.history.is_dirty()
    }

    pub fn dismiss_help(&mut self) {
        self.show_help = false;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    // ---------------------------------------------------------------------
    // Command line
    // ---------------------------------------------------------------------

    pub fn enter_command_mode(&mut self) {
        self.mode = AppMode::Command(String::new());
    }

    pub fn command_input(&mut self, c: char) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            cmd.push(c);
        }
    }

    /// Handles backspace in command mode; leaves the mode when the line is empty.
    pub fn command_backspace(&mut self) {
        if let AppMode::Command(ref mut cmd) = self.mode {
            if cmd.pop().is_none() {
                self.mode = AppMode::Normal;
            }
        }
    }

    pub fn cancel_command(&mut self) {
        self.mode = AppMode::Normal;
    }

    /// Executes the typed command line and returns to normal mode.
    pub fn execute_command(&mut self) {
        if let AppMode::Command(line) = std::mem::take(&mut self.mode) {
            self.execute_line(&line);
        }
    }

    /// Runs one command line, reporting the outcome in the status bar.
    pub fn execute_line(&mut self, line: &str) {
        let result = parse_command(line)
            .map_err(anyhow::Error::from)
            .and_then(|command| self.run(command));
        match result {
            Ok(message) => self.status_message = message,
            Err(e) => {
                warn!(":{} failed: {:#}", line, e);
                self.status_message = Some(format!("{:#}", e));
            }
        }
    }

    pub fn undo(&mut self) {
        let result = self.history.undo(&mut self.document);
        self.sync();
        self.status_message = Some(match result {
            Ok(Some(label)) => format!("Undone: {}", label),
            Ok(None) => "Nothing to undo".to_string(),
            Err(e) => format!("Undo failed: {}", e),
        });
    }

    pub fn redo(&mut self) {
        let result = self.history.redo(&mut self.document);
        self.sync();
        self.status_message = Some(match result {
            Ok(Some(label)) => format!("Redone: {}", label),
            Ok(None) => "Nothing to redo".to_string(),
            Err(e) => format!("Redo failed: {}", e),
        });
    }

    fn run(&mut self, command: EditorCommand) -> Result<Option<String>> {
        use EditorCommand::*;

        match command {
            Quit { force } => {
                if !force && self.is_dirty() {
                    bail!("Unsaved changes (:q! discards them, :w saves)");
                }
                self.should_quit = true;
                Ok(None)
            }
            Write(path) => self.write(path.map(PathBuf::from)).map(Some),
            Open(path) => {
                self.refuse_if_dirty()?;
                self.open(Path::new(&path)).map(Some)
            }
            Reload => self.reload().map(Some),
            Import(path) => self.import(Path::new(&path)).map(Some),
            New => {
                self.refuse_if_dirty()?;
                let command = Command::replace_all(&self.document, Snapshot::default());
                self.push(command)?;
                // the empty document has nothing to save yet
                self.history.mark_saved();
                self.file_path = None;
                Ok(Some("New document".to_string()))
            }
            Undo => {
                self.undo();
                Ok(self.status_message.take())
            }
            Redo => {
                self.redo();
                Ok(self.status_message.take())
            }
            Help => {
                self.show_help = true;
                Ok(None)
            }
            GotoColumn(column) => self.goto_column(column).map(|_| None),
            InsertGaps(count) => {
                let (sequence, position) = self.insertion_point()?;
                self.push(Command::insert_blanks(sequence, position, count))
            }
            Insert(text) => {
                if normalize_text(&text).is_empty() {
                    bail!("Nothing to insert");
                }
                let (sequence, position) = self.insertion_point()?;
                self.push(Command::insert_text(sequence, position, &text))
            }
            Delete(count) => {
                let sequence = self.current_sequence()?;
                let len = self.document.sequence(sequence).map_or(0, Sequence::len);
                if count == 0 || self.cursor.col >= len {
                    bail!("Nothing to delete here");
                }
                self.push(Command::remove_letters(sequence, self.cursor.col, count))
            }
            Mark { count, description } => {
                let sequence = self.current_sequence()?;
                let annotation = self.annotation_named(&description)?;
                self.push(Command::mark_letters(sequence, self.cursor.col, count, Some(annotation)))
            }
            Unmark(count) => {
                let sequence = self.current_sequence()?;
                self.push(Command::mark_letters(sequence, self.cursor.col, count, None))
            }
            AddAnnotation { description, color } => {
                if self.document.annotation_by_description(&description).is_some() {
                    bail!("Annotation '{}' already exists", description);
                }
                check_color(&color)?;
                self.push(Command::add_annotation(Annotation::new(description, color)))
            }
            RemoveAnnotation(description) => {
                let annotation = self.annotation_named(&description)?;
                let command = Command::remove_annotation(&self.document, annotation)?;
                self.push(command)
            }
            Recolor { description, color } => {
                let annotation = self.annotation_named(&description)?;
                check_color(&color)?;
                let command = Command::set_annotation_color(&self.document, annotation, color)?;
                self.push(command)
            }
            RenameAnnotation {
                description,
                new_description,
            } => {
                let annotation = self.annotation_named(&description)?;
                if self.document.annotation_by_description(&new_description).is_some() {
                    bail!("Annotation '{}' already exists", new_description);
                }
                let command =
                    Command::set_annotation_description(&self.document, annotation, new_description)?;
                self.push(command)
            }
            Rename(name) => {
                let sequence = self.current_sequence()?;
                let command = Command::rename_sequence(&self.document, sequence, name)?;
                self.push(command)
            }
            AddSequence { name, text } => {
                self.push(Command::add_sequences(vec![Sequence::from_text(name, &text)]))
            }
            DropSequence => {
                let sequence = self.current_sequence()?;
                self.push(Command::remove_sequences(vec![sequence]))
            }
            Replace(text) => {
                let sequence = self.current_sequence()?;
                let command = Command::replace_with_text(&self.document, sequence, &text)?;
                self.push(command)
            }
            AminoAcids => {
                let sequence = self.current_sequence()?;
                let command = Command::amino_acid_expansion(&self.document, sequence)?;
                self.push(command)
            }
            Hide(count) => {
                if count == 0 {
                    bail!("No columns to hide");
                }
                let columns = self.columns_from_cursor(count);
                self.push(Command::hide_columns(columns))
            }
            Reveal(count) => {
                let columns: Vec<usize> = match count {
                    Some(count) => self.columns_from_cursor(count),
                    None => self.document.hidden_columns().iter().copied().collect(),
                };
                if !columns.iter().any(|c| self.document.is_hidden(*c)) {
                    bail!("No hidden columns there");
                }
                self.push(Command::reveal_columns(columns))
            }
            ToggleWrap => {
                self.settings.wrap = !self.settings.wrap;
                self.relayout();
                Ok(Some(format!("Wrap {}", on_off(self.settings.wrap))))
            }
            Columns(columns) => {
                if columns == 0 {
                    bail!("Column count must be at least 1");
                }
                self.settings.columns = columns;
                self.relayout();
                Ok(Some(format!("{} columns per block", columns)))
            }
            ToggleShowHidden => {
                self.settings.show_hidden = !self.settings.show_hidden;
                self.relayout();
                Ok(Some(format!("Hidden columns {}", if self.settings.show_hidden { "shown" } else { "left out" })))
            }
        }
    }

    /// Applies a command through the history.
    fn push(&mut self, command: Command) -> Result<Option<String>> {
        let label = command.label();
        let result = self.history.push(command, &mut self.document);
        self.sync();
        result?;
        info!("{}", label);
        Ok(Some(label))
    }

    fn refuse_if_dirty(&self) -> Result<()> {
        if self.is_dirty() {
            bail!("Unsaved changes (:w saves them, :e! reverts them)");
        }
        Ok(())
    }

    fn current_sequence(&self) -> Result<SequenceId> {
        self.document
            .sequences()
            .get(self.cursor.row)
            .map(Sequence::id)
            .ok_or_else(|| anyhow!("No sequence under the cursor"))
    }

    /// Current sequence and cursor column, clamped to the end of the sequence.
    fn insertion_point(&self) -> Result<(SequenceId, usize)> {
        let sequence = self
            .document
            .sequences()
            .get(self.cursor.row)
            .ok_or_else(|| anyhow!("No sequence under the cursor"))?;
        Ok((sequence.id(), self.cursor.col.min(sequence.len())))
    }

    fn annotation_named(&self, description: &str) -> Result<AnnotationId> {
        self.document
            .annotation_by_description(description)
            .map(Annotation::id)
            .ok_or_else(|| anyhow!("Unknown annotation '{}'", description))
    }

    /// `count` columns from the cursor. They may reach past the longest
    /// sequence and take effect once a sequence grows that far.
    fn columns_from_cursor(&self, count: usize) -> Vec<usize> {
        (self.cursor.col..self.cursor.col.saturating_add(count)).collect()
    }

    // ---------------------------------------------------------------------
    // Files
    // ---------------------------------------------------------------------

    fn write(&mut self, path: Option<PathBuf>) -> Result<String> {
        let path = path
            .or_else(|| self.file_path.clone())
            .ok_or_else(|| anyhow!("No file name (use :w PATH)"))?;
        let format = formats::detect_format_from_extension(&path).unwrap_or(FileFormat::Json);
        let snapshot = self.document.snapshot();
        formats::save_file(&path, &snapshot, format)
            .with_context(|| format!("Cannot write {}", path.display()))?;

        self.history.mark_saved();
        let mut message = format!(
            "Wrote {} sequences to {} ({})",
            snapshot.sequences.len(),
            path.display(),
            format
        );
        if format == FileFormat::Fasta
            && (!snapshot.annotations.is_empty() || !snapshot.hidden_columns.is_empty())
        {
            message.push_str("; annotations and hidden columns are not stored in FASTA");
        }
        self.file_path = Some(path);
        Ok(message)
    }

    fn open(&mut self, path: &Path) -> Result<String> {
        let (snapshot, format) = formats::load_file_with_options(path, None)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let count = snapshot.sequences.len();
        self.document.replace_all(snapshot);
        self.history = History::new();
        self.file_path = Some(path.to_path_buf());
        self.sync();
        Ok(format!("Opened {} ({} sequences, {})", path.display(), count, format))
    }

    /// Reloads the current file as one undoable step.
    fn reload(&mut self) -> Result<String> {
        let path = self
            .file_path
            .clone()
            .ok_or_else(|| anyhow!("No file to reload"))?;
        let (snapshot, _) = formats::load_file_with_options(&path, None)
            .with_context(|| format!("Cannot open {}", path.display()))?;
        let command = Command::replace_all(&self.document, snapshot);
        self.push(command)?;
        self.history.mark_saved();
        Ok(format!("Reloaded {}", path.display()))
    }

    fn import(&mut self, path: &Path) -> Result<String> {
        let (snapshot, _) = formats::load_file_with_options(path, None)
            .with_context(|| format!("Cannot import {}", path.display()))?;
        let count = snapshot.sequences.len();
        self.push(Command::add_sequences(snapshot.sequences))?;
        Ok(format!("Imported {} sequences from {}", count, path.display()))
    }
}

fn check_color(color: &str) -> Result<()> {
    match parse_color(color) {
        Some(_) => Ok(()),
        None => bail!("Unknown colour '{}' (use a name or #RRGGBB)", color),
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
