//! Document file formats.
//!
//! Supports:
//! - JSON save files (.json), the full document with annotations and hidden columns
//! - FASTA (.fasta, .fa, .fna, .faa, .fas, .ffn, .frn), sequences only
//!
//! Format detection priority:
//! 1. Explicit format specification (-f option)
//! 2. File extension
//! 3. Content-based detection
//! 4. Try all formats

pub mod fasta;
pub mod json;

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::info;
use thiserror::Error;

use crate::document::Snapshot;

/// Supported file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Fasta,
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Json => write!(f, "JSON"),
            FileFormat::Fasta => write!(f, "FASTA"),
        }
    }
}

/// Errors that can occur while loading or saving documents.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Could not determine file format.\n\
             Hint: Use -f/--format to specify the format explicitly:\n  \
             seqmark -f json <file>    # JSON save file\n  \
             seqmark -f fasta <file>   # FASTA format")]
    UnknownFormat,

    #[error("FASTA error: {0}")]
    FastaError(#[from] fasta::FastaError),

    #[error("JSON error: {0}")]
    JsonError(#[from] json::JsonError),
}

/// Result type for load and save operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Detects format from file extension.
pub fn detect_format_from_extension<P: AsRef<Path>>(path: P) -> Option<FileFormat> {
    let ext = path.as_ref().extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "json" => Some(FileFormat::Json),
        "fa" | "fas" | "fasta" | "fna" | "faa" | "ffn" | "frn" => Some(FileFormat::Fasta),
        _ => None,
    }
}

/// Detects the file format by examining the first non-empty line.
pub fn detect_format_from_content(content: &str) -> Option<FileFormat> {
    let trimmed = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    if trimmed.starts_with('{') {
        Some(FileFormat::Json)
    } else if trimmed.starts_with('>') || trimmed.starts_with('#') {
        Some(FileFormat::Fasta)
    } else {
        None
    }
}

/// Parses content with a specific format.
pub fn parse_content(content: &str, format: FileFormat) -> ParseResult<Snapshot> {
    match format {
        FileFormat::Json => Ok(json::parse_json_str(content)?),
        FileFormat::Fasta => Ok(Snapshot::from_sequences(fasta::parse_fasta_str(content)?)),
    }
}

/// Tries to parse with multiple formats, returning the first success.
fn try_parse_formats(content: &str, formats: &[FileFormat]) -> ParseResult<(Snapshot, FileFormat)> {
    let mut last_error = None;

    for &format in formats {
        match parse_content(content, format) {
            Ok(snapshot) => return Ok((snapshot, format)),
            Err(e) => last_error = Some(e),
        }
    }

    Err(last_error.unwrap_or(ParseError::UnknownFormat))
}

/// Extension first, then content, then every format in turn.
fn detect_and_parse(path: &Path, content: &str) -> ParseResult<(Snapshot, FileFormat)> {
    if let Some(format) = detect_format_from_extension(path) {
        if let Ok(snapshot) = parse_content(content, format) {
            return Ok((snapshot, format));
        }
    }

    if let Some(format) = detect_format_from_content(content) {
        return Ok((parse_content(content, format)?, format));
    }

    // Plain letters without a header are still valid FASTA
    try_parse_formats(content, &[FileFormat::Fasta, FileFormat::Json])
        .map_err(|_| ParseError::UnknownFormat)
}

/// Loads a document file with optional format specification.
///
/// Returns the contents together with the format that was used.
pub fn load_file_with_options<P: AsRef<Path>>(
    path: P,
    forced_format: Option<FileFormat>,
) -> ParseResult<(Snapshot, FileFormat)> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;

    if content.trim().is_empty() {
        return Err(ParseError::EmptyFile);
    }

    let (snapshot, format) = match forced_format {
        Some(format) => (parse_content(&content, format)?, format),
        None => detect_and_parse(path, &content)?,
    };

    info!(
        "loaded {} sequences from {} ({})",
        snapshot.sequences.len(),
        path.display(),
        format
    );
    Ok((snapshot, format))
}

/// Loads a document file, detecting the format.
pub fn load_file<P: AsRef<Path>>(path: P) -> ParseResult<Snapshot> {
    load_file_with_options(path, None).map(|(snapshot, _)| snapshot)
}

/// Writes document contents in the given format.
///
/// FASTA keeps only names and letters.
pub fn write_document<W: Write>(writer: &mut W, snapshot: &Snapshot, format: FileFormat) -> ParseResult<()> {
    match format {
        FileFormat::Json => json::write_json(&mut *writer, snapshot)?,
        FileFormat::Fasta => fasta::write_fasta(writer, &snapshot.sequences)?,
    }
    Ok(())
}

/// Saves document contents to a file.
pub fn save_file<P: AsRef<Path>>(path: P, snapshot: &Snapshot, format: FileFormat) -> ParseResult<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_document(&mut writer, snapshot, format)?;
    writer.flush()?;
    info!(
        "saved {} sequences to {} ({})",
        snapshot.sequences.len(),
        path.display(),
        format
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sequence;

    #[test]
    fn test_detect_from_content() {
        assert_eq!(detect_format_from_content(">seq1\nACGT\n"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_content("# note\n>seq1\n"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_content("\n\n  {\"versteckt\": []}"), Some(FileFormat::Json));
        assert_eq!(detect_format_from_content("ACGT\n"), None);
        assert_eq!(detect_format_from_content("   \n"), None);
    }

    #[test]
    fn test_detect_from_extension() {
        assert_eq!(detect_format_from_extension("test.json"), Some(FileFormat::Json));
        assert_eq!(detect_format_from_extension("test.JSON"), Some(FileFormat::Json));
        assert_eq!(detect_format_from_extension("test.fa"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.fas"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.fasta"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.fna"), Some(FileFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.txt"), None);
        assert_eq!(detect_format_from_extension("noext"), None);
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let mut snapshot = Snapshot::from_sequences(vec![Sequence::from_text("A", "ACGT")]);
        snapshot.hidden_columns.insert(2);

        save_file(&path, &snapshot, FileFormat::Json).unwrap();
        let (loaded, format) = load_file_with_options(&path, None).unwrap();
        assert_eq!(format, FileFormat::Json);
        assert_eq!(loaded.sequences[0].as_string(), "ACGT");
        assert!(loaded.hidden_columns.contains(&2));
    }

    #[test]
    fn test_content_detection_overrides_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actually_fasta.json");
        std::fs::write(&path, ">x\nAC\n").unwrap();
        let (loaded, format) = load_file_with_options(&path, None).unwrap();
        assert_eq!(format, FileFormat::Fasta);
        assert_eq!(loaded.sequences[0].name(), "x");
    }

    #[test]
    fn test_headerless_text_loads_as_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, "acgt\n").unwrap();
        let (loaded, format) = load_file_with_options(&path, None).unwrap();
        assert_eq!(format, FileFormat::Fasta);
        assert_eq!(loaded.sequences[0].name(), fasta::DEFAULT_NAME);
    }

    #[test]
    fn test_forced_format_errors_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.fa");
        std::fs::write(&path, ">x\nAC\n").unwrap();
        assert!(matches!(
            load_file_with_options(&path, Some(FileFormat::Json)),
            Err(ParseError::JsonError(_))
        ));
    }

    #[test]
    fn test_empty_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fa");
        std::fs::write(&path, "  \n").unwrap();
        assert!(matches!(load_file(&path), Err(ParseError::EmptyFile)));
        assert!(matches!(
            load_file(dir.path().join("missing.fa")),
            Err(ParseError::IoError(_))
        ));
    }

    #[test]
    fn test_write_fasta_drops_annotations() {
        let snapshot = Snapshot::from_sequences(vec![Sequence::from_text("A", "AC")]);
        let mut out = Vec::new();
        write_document(&mut out, &snapshot, FileFormat::Fasta).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), ">A\nAC\n");
    }
}
