//! FASTA import and export.
//!
//! ## FASTA Format
//!
//! ```text
//! # comment lines are skipped
//! >sequence name, everything after '>'
//! ACGTACGTACGT...
//! >another sequence
//! TGCATGCATGCA...
//! ```
//!
//! Sequence lines are concatenated until the next header; whitespace is
//! removed and letters are upper-cased (same rule as
//! [`Sequence::from_text`]). Text before the first header becomes a
//! sequence named [`DEFAULT_NAME`].
//!
//! A record is only kept when letters follow its header, so a header
//! directly followed by another header is dropped. The last record is
//! always kept: input without any letters gives one empty sequence.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use thiserror::Error;

use crate::model::Sequence;

/// Name of sequences without a (non-empty) header.
pub const DEFAULT_NAME: &str = "Unbekannt";

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// Parses a FASTA file.
///
/// # Examples
///
/// ```no_run
/// use seqmark::formats::fasta::parse_fasta_file;
///
/// let sequences = parse_fasta_file("sequences.fasta").unwrap();
/// println!("Loaded {} sequences", sequences.len());
/// ```
pub fn parse_fasta_file<P: AsRef<Path>>(path: P) -> FastaResult<Vec<Sequence>> {
    let file = File::open(path)?;
    parse_fasta(BufReader::new(file))
}

/// Parses FASTA content from a reader.
pub fn parse_fasta<R: BufRead>(reader: R) -> FastaResult<Vec<Sequence>> {
    let mut sequences = Vec::new();
    let mut current_name = DEFAULT_NAME.to_string();
    let mut current_text = String::new();

    for line_result in reader.lines() {
        let line = line_result?;

        if line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            if has_letters(&current_text) {
                sequences.push(Sequence::from_text(current_name, &current_text));
                current_text.clear();
            }
            current_name = header_name(header);
        } else {
            current_text.push_str(&line);
        }
    }

    // Don't forget the last record
    sequences.push(Sequence::from_text(current_name, &current_text));
    Ok(sequences)
}

fn has_letters(text: &str) -> bool {
    text.chars().any(|c| !c.is_whitespace())
}

fn header_name(header: &str) -> String {
    match header.trim() {
        "" => DEFAULT_NAME.to_string(),
        name => name.to_string(),
    }
}

/// Parses FASTA content from a string.
///
/// Useful for testing or processing in-memory data.
pub fn parse_fasta_str(content: &str) -> FastaResult<Vec<Sequence>> {
    parse_fasta(content.as_bytes())
}

/// Writes sequences as FASTA, one line of letters per sequence.
///
/// Gap letters are written as they are.
pub fn write_fasta<W: Write>(writer: &mut W, sequences: &[Sequence]) -> io::Result<()> {
    for seq in sequences {
        writeln!(writer, ">{}", seq.name())?;
        writeln!(writer, "{}", seq.as_string())?;
    }
    Ok(())
}
