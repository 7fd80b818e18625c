//! # seqmark - Terminal Sequence Editor
//!
//! A terminal editor for biological sequences with coloured annotations,
//! hidden columns and a wrapped, ruled layout, built on ratatui.
//!
//! ## Architecture
//!
//! - `model`: letters, sequences and annotations with stable identities
//! - `document`: the collection that owns them and notifies listeners of every change
//! - `commands`: reversible edits and the undo/redo history
//! - `formats`: JSON save files and FASTA, with format detection
//! - `view`: layout of a document into ruled blocks of columns, text export
//! - `command_line`: parsing of `:` commands
//! - `state`: editor state (cursor, viewport, history, settings)
//! - `event`: keyboard handling
//! - `ui`: TUI rendering
//! - `controller`: terminal setup and the main loop

pub mod command_line;
pub mod commands;
pub mod controller;
pub mod document;
pub mod event;
pub mod formats;
pub mod model;
pub mod state;
pub mod ui;
pub mod view;
