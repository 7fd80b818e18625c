//! JSON save files.
//!
//! ```text
//! {
//!   "markierungen": [ { "Markierung": { "_beschreibung": "exon1", "_farbe": "#ff0000" } } ],
//!   "versteckt":    [ 1, 3 ],
//!   "sequenzen":    [ { "Sequenz": { "_name": "A", "_basen": [ { "_char": "A", "_mtxt": "exon1" } ] } } ]
//! }
//! ```
//!
//! Letters refer to their annotation by description (`_mtxt`). On load the
//! descriptions are resolved to the annotations of the same file, so two
//! annotations sharing a description cannot be told apart after a round
//! trip: letters end up on the last one.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Snapshot;
use crate::model::{Annotation, AnnotationId, Letter, Sequence, GAP};

/// Errors that can occur while reading or writing save files.
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid save file: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Sequence '{sequence}', position {position}: '{value}' is not a single letter")]
    InvalidLetter {
        sequence: String,
        position: usize,
        value: String,
    },

    #[error("Sequence '{sequence}', position {position}: unknown annotation '{description}'")]
    UnknownAnnotation {
        sequence: String,
        position: usize,
        description: String,
    },
}

/// Result type for save file operations.
pub type JsonResult<T> = Result<T, JsonError>;

/// Top level of a save file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub markierungen: Vec<AnnotationEntry>,
    pub versteckt: Vec<usize>,
    pub sequenzen: Vec<SequenceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationEntry {
    #[serde(rename = "Markierung")]
    pub annotation: AnnotationRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    #[serde(rename = "_beschreibung")]
    pub description: String,
    #[serde(rename = "_farbe")]
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEntry {
    #[serde(rename = "Sequenz")]
    pub sequence: SequenceRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    #[serde(rename = "_name")]
    pub name: String,
    #[serde(rename = "_basen")]
    pub letters: Vec<LetterRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterRecord {
    /// Missing characters default to the gap letter
    #[serde(rename = "_char", default = "gap_string")]
    pub character: String,
    #[serde(rename = "_mtxt", default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
}

fn gap_string() -> String {
    GAP.to_string()
}

impl SaveFile {
    /// Builds the save file form of document contents.
    pub fn encode(snapshot: &Snapshot) -> Self {
        let descriptions: HashMap<AnnotationId, &str> = snapshot
            .annotations
            .iter()
            .map(|a| (a.id(), a.description.as_str()))
            .collect();

        let sequenzen = snapshot
            .sequences
            .iter()
            .map(|seq| SequenceEntry {
                sequence: SequenceRecord {
                    name: seq.name().to_string(),
                    letters: seq
                        .letters()
                        .iter()
                        .map(|letter| LetterRecord {
                            character: letter.character().to_string(),
                            annotation: letter
                                .annotation()
                                .and_then(|id| descriptions.get(&id))
                                .map(|d| d.to_string()),
                        })
                        .collect(),
                },
            })
            .collect();

        Self {
            markierungen: snapshot
                .annotations
                .iter()
                .map(|a| AnnotationEntry {
                    annotation: AnnotationRecord {
                        description: a.description.clone(),
                        color: a.color.clone(),
                    },
                })
                .collect(),
            versteckt: snapshot.hidden_columns.iter().copied().collect(),
            sequenzen,
        }
    }

    /// Turns a save file into document contents, resolving annotation names.
    pub fn decode(self) -> JsonResult<Snapshot> {
        let annotations: Vec<Annotation> = self
            .markierungen
            .into_iter()
            .map(|entry| Annotation::new(entry.annotation.description, entry.annotation.color))
            .collect();
        // later duplicates win
        let by_description: HashMap<&str, AnnotationId> = annotations
            .iter()
            .map(|a| (a.description.as_str(), a.id()))
            .collect();

        let mut sequences = Vec::with_capacity(self.sequenzen.len());
        for entry in self.sequenzen {
            let record = entry.sequence;
            let mut letters = Vec::with_capacity(record.letters.len());
            for (position, letter) in record.letters.into_iter().enumerate() {
                let mut chars = letter.character.chars();
                let character = match (chars.next(), chars.next()) {
                    (Some(c), None) => c,
                    _ => {
                        return Err(JsonError::InvalidLetter {
                            sequence: record.name,
                            position,
                            value: letter.character,
                        })
                    }
                };
                let annotation = match letter.annotation {
                    None => None,
                    Some(description) => match by_description.get(description.as_str()) {
                        Some(id) => Some(*id),
                        None => {
                            return Err(JsonError::UnknownAnnotation {
                                sequence: record.name,
                                position,
                                description,
                            })
                        }
                    },
                };
                letters.push(Letter::new(character).with_annotation(annotation));
            }
            sequences.push(Sequence::from_letters(record.name, letters));
        }

        Ok(Snapshot {
            sequences,
            annotations,
            hidden_columns: self.versteckt.into_iter().collect(),
        })
    }
}

/// Reads document contents from JSON.
pub fn read_json<R: Read>(reader: R) -> JsonResult<Snapshot> {
    let file: SaveFile = serde_json::from_reader(reader)?;
    file.decode()
}

/// Parses document contents from a JSON string.
pub fn parse_json_str(content: &str) -> JsonResult<Snapshot> {
    let file: SaveFile = serde_json::from_str(content)?;
    file.decode()
}

/// Writes document contents as JSON.
pub fn write_json<W: Write>(writer: W, snapshot: &Snapshot) -> JsonResult<()> {
    serde_json::to_writer(writer, &SaveFile::encode(snapshot))?;
    Ok(())
}

/// Reads a save file from disk.
pub fn read_json_file<P: AsRef<Path>>(path: P) -> JsonResult<Snapshot> {
    let file = File::open(path)?;
    read_json(BufReader::new(file))
}

/// Writes a save file to disk.
pub fn write_json_file<P: AsRef<Path>>(path: P, snapshot: &Snapshot) -> JsonResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_json(&mut writer, snapshot)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn example() -> Snapshot {
        let a = Sequence::from_text("A", "ACGT");
        let b = Sequence::from_text("B", "TTAA");
        let exon = Annotation::new("exon1", "#ff0000");
        let (ia, ie) = (a.id(), exon.id());
        let mut document = Document::new();
        document.add_sequences(vec![a, b]);
        document.add_annotations(vec![exon]);
        document.mark_range(ia, 0, 2, Some(ie)).unwrap();
        document.add_hidden_columns([1, 3]);
        document.snapshot()
    }

    #[test]
    fn test_round_trip() {
        let mut out = Vec::new();
        write_json(&mut out, &example()).unwrap();
        let loaded = read_json(out.as_slice()).unwrap();

        assert_eq!(loaded.sequences.len(), 2);
        assert_eq!(loaded.sequences[0].name(), "A");
        assert_eq!(loaded.sequences[0].as_string(), "ACGT");
        assert_eq!(loaded.sequences[1].name(), "B");
        assert_eq!(loaded.sequences[1].as_string(), "TTAA");

        assert_eq!(loaded.annotations.len(), 1);
        let exon = &loaded.annotations[0];
        assert_eq!(exon.description, "exon1");
        assert_eq!(exon.color, "#ff0000");
        let tags: Vec<_> = loaded.sequences[0].letters().iter().map(Letter::annotation).collect();
        assert_eq!(tags, vec![Some(exon.id()), Some(exon.id()), None, None]);
        assert!(loaded.sequences[1].letters().iter().all(|l| l.annotation().is_none()));

        assert_eq!(loaded.hidden_columns.iter().copied().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_field_names() {
        let mut out = Vec::new();
        write_json(&mut out, &example()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["markierungen"][0]["Markierung"]["_beschreibung"], "exon1");
        assert_eq!(value["markierungen"][0]["Markierung"]["_farbe"], "#ff0000");
        assert_eq!(value["versteckt"], serde_json::json!([1, 3]));
        let letters = &value["sequenzen"][0]["Sequenz"]["_basen"];
        assert_eq!(value["sequenzen"][0]["Sequenz"]["_name"], "A");
        assert_eq!(letters[0]["_char"], "A");
        assert_eq!(letters[0]["_mtxt"], "exon1");
        // unannotated letters carry no _mtxt at all
        assert!(letters[2].get("_mtxt").is_none());
    }

    #[test]
    fn test_missing_char_is_gap_and_null_mtxt() {
        let content = r#"{"markierungen": [], "versteckt": [2, 2],
            "sequenzen": [{"Sequenz": {"_name": "x", "_basen": [{}, {"_char": "A", "_mtxt": null}]}}]}"#;
        let loaded = parse_json_str(content).unwrap();
        assert_eq!(loaded.sequences[0].as_string(), "~A");
        assert!(loaded.sequences[0].letters()[1].annotation().is_none());
        assert_eq!(loaded.hidden_columns.len(), 1);
    }

    #[test]
    fn test_duplicate_descriptions_resolve_to_last() {
        let content = r#"{"markierungen": [
                {"Markierung": {"_beschreibung": "dup", "_farbe": "red"}},
                {"Markierung": {"_beschreibung": "dup", "_farbe": "blue"}}],
            "versteckt": [],
            "sequenzen": [{"Sequenz": {"_name": "x", "_basen": [{"_char": "A", "_mtxt": "dup"}]}}]}"#;
        let loaded = parse_json_str(content).unwrap();
        assert_eq!(loaded.annotations.len(), 2);
        assert_eq!(
            loaded.sequences[0].letters()[0].annotation(),
            Some(loaded.annotations[1].id())
        );
    }

    #[test]
    fn test_unknown_annotation() {
        let content = r#"{"markierungen": [], "versteckt": [],
            "sequenzen": [{"Sequenz": {"_name": "x", "_basen": [{"_char": "A"}, {"_char": "C", "_mtxt": "nope"}]}}]}"#;
        match parse_json_str(content) {
            Err(JsonError::UnknownAnnotation {
                sequence,
                position,
                description,
            }) => {
                assert_eq!(sequence, "x");
                assert_eq!(position, 1);
                assert_eq!(description, "nope");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_letter() {
        let content = r#"{"markierungen": [], "versteckt": [],
            "sequenzen": [{"Sequenz": {"_name": "x", "_basen": [{"_char": "AC"}]}}]}"#;
        assert!(matches!(
            parse_json_str(content),
            Err(JsonError::InvalidLetter { position: 0, .. })
        ));
        let content = r#"{"markierungen": [], "versteckt": [],
            "sequenzen": [{"Sequenz": {"_name": "x", "_basen": [{"_char": ""}]}}]}"#;
        assert!(matches!(parse_json_str(content), Err(JsonError::InvalidLetter { .. })));
    }

    #[test]
    fn test_missing_fields_and_garbage() {
        assert!(matches!(parse_json_str("{}"), Err(JsonError::Syntax(_))));
        assert!(matches!(parse_json_str("not json"), Err(JsonError::Syntax(_))));
        let negative = r#"{"markierungen": [], "versteckt": [-1], "sequenzen": []}"#;
        assert!(matches!(parse_json_str(negative), Err(JsonError::Syntax(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        write_json_file(&path, &example()).unwrap();
        let loaded = read_json_file(&path).unwrap();
        assert_eq!(loaded.sequences.len(), 2);
        assert!(matches!(
            read_json_file(dir.path().join("missing.json")),
            Err(JsonError::IoError(_))
        ));
    }
}
