//! Reversible edit commands and the undo/redo history.
//!
//! Each user-visible edit is a [`Command`]. `apply` performs it on a
//! [`Document`], `revert` restores the exact state from before `apply`,
//! annotation references and hidden columns included. State needed for
//! `revert` is captured when the command is built, or taken from what
//! `apply` reports (e.g. the letters a removal actually removed).
//!
//! [`History`] keeps applied and undone commands and knows whether the
//! document differs from the last saved state.

use log::debug;

use crate::document::{Document, Snapshot};
use crate::model::{
    blank_letters, letters_from_text, Annotation, AnnotationId, EditError, EditResult, Letter,
    LetterId, Sequence, SequenceId,
};

/// A reversible edit.
#[derive(Debug, Clone)]
pub enum Command {
    AddSequences {
        sequences: Vec<Sequence>,
    },
    RemoveSequences {
        ids: Vec<SequenceId>,
        removed: Vec<(usize, Sequence)>,
    },
    RenameSequence {
        sequence: SequenceId,
        name: String,
        previous: String,
    },
    /// Replace the letter list of a sequence (amino-acid expansion, new text)
    ReplaceLetters {
        sequence: SequenceId,
        letters: Vec<Letter>,
        previous: Vec<Letter>,
        label: String,
    },
    InsertLetters {
        sequence: SequenceId,
        position: usize,
        letters: Vec<Letter>,
    },
    RemoveLetters {
        sequence: SequenceId,
        position: usize,
        count: usize,
        removed: Vec<Letter>,
    },
    MarkLetters {
        sequence: SequenceId,
        start: usize,
        count: usize,
        annotation: Option<AnnotationId>,
        previous: Vec<(LetterId, Option<AnnotationId>)>,
    },
    AddAnnotation {
        annotation: Annotation,
    },
    RemoveAnnotation {
        annotation: Annotation,
        index: usize,
        references: Vec<(SequenceId, Vec<LetterId>)>,
    },
    SetAnnotationColor {
        annotation: AnnotationId,
        color: String,
        previous: String,
    },
    SetAnnotationDescription {
        annotation: AnnotationId,
        description: String,
        previous: String,
    },
    HideColumns {
        columns: Vec<usize>,
        applied: Vec<usize>,
    },
    RevealColumns {
        columns: Vec<usize>,
        applied: Vec<usize>,
    },
    ReplaceAll {
        contents: Snapshot,
        previous: Snapshot,
    },
}

impl Command {
    /// Adds sequences at the end of the document.
    pub fn add_sequences(sequences: Vec<Sequence>) -> Self {
        Command::AddSequences { sequences }
    }

    /// Removes sequences, remembering their positions.
    pub fn remove_sequences(ids: Vec<SequenceId>) -> Self {
        Command::RemoveSequences {
            ids,
            removed: Vec::new(),
        }
    }

    pub fn rename_sequence(document: &Document, sequence: SequenceId, name: impl Into<String>) -> EditResult<Self> {
        let previous = lookup_sequence(document, sequence)?.name().to_string();
        Ok(Command::RenameSequence {
            sequence,
            name: name.into(),
            previous,
        })
    }

    /// Turns every letter into a codon slot: the letter and two gaps.
    pub fn amino_acid_expansion(document: &Document, sequence: SequenceId) -> EditResult<Self> {
        let current = lookup_sequence(document, sequence)?;
        Ok(Command::ReplaceLetters {
            sequence,
            letters: current.amino_acid_expansion(),
            previous: current.letters().to_vec(),
            label: format!("Amino acids: {}", current.name()),
        })
    }

    /// Replaces all letters of a sequence by the given text.
    pub fn replace_with_text(document: &Document, sequence: SequenceId, text: &str) -> EditResult<Self> {
        let current = lookup_sequence(document, sequence)?;
        Ok(Command::ReplaceLetters {
            sequence,
            letters: letters_from_text(text),
            previous: current.letters().to_vec(),
            label: format!("Replace letters: {}", current.name()),
        })
    }

    pub fn insert_text(sequence: SequenceId, position: usize, text: &str) -> Self {
        Command::InsertLetters {
            sequence,
            position,
            letters: letters_from_text(text),
        }
    }

    pub fn insert_blanks(sequence: SequenceId, position: usize, count: usize) -> Self {
        Command::InsertLetters {
            sequence,
            position,
            letters: blank_letters(count),
        }
    }

    pub fn remove_letters(sequence: SequenceId, position: usize, count: usize) -> Self {
        Command::RemoveLetters {
            sequence,
            position,
            count,
            removed: Vec::new(),
        }
    }

    /// Sets (or clears, with `None`) the annotation of a range of letters.
    pub fn mark_letters(
        sequence: SequenceId,
        start: usize,
        count: usize,
        annotation: Option<AnnotationId>,
    ) -> Self {
        Command::MarkLetters {
            sequence,
            start,
            count,
            annotation,
            previous: Vec::new(),
        }
    }

    pub fn add_annotation(annotation: Annotation) -> Self {
        Command::AddAnnotation { annotation }
    }

    /// Removes an annotation; reverting restores every reference it had.
    pub fn remove_annotation(document: &Document, annotation: AnnotationId) -> EditResult<Self> {
        let index = document
            .annotations()
            .iter()
            .position(|a| a.id() == annotation)
            .ok_or(EditError::UnknownAnnotation(annotation))?;
        Ok(Command::RemoveAnnotation {
            annotation: document.annotations()[index].clone(),
            index,
            references: document.annotation_references(annotation),
        })
    }

    pub fn set_annotation_color(document: &Document, annotation: AnnotationId, color: impl Into<String>) -> EditResult<Self> {
        let previous = lookup_annotation(document, annotation)?.color.clone();
        Ok(Command::SetAnnotationColor {
            annotation,
            color: color.into(),
            previous,
        })
    }

    pub fn set_annotation_description(
        document: &Document,
        annotation: AnnotationId,
        description: impl Into<String>,
    ) -> EditResult<Self> {
        let previous = lookup_annotation(document, annotation)?.description.clone();
        Ok(Command::SetAnnotationDescription {
            annotation,
            description: description.into(),
            previous,
        })
    }

    pub fn hide_columns(columns: impl IntoIterator<Item = usize>) -> Self {
        Command::HideColumns {
            columns: columns.into_iter().collect(),
            applied: Vec::new(),
        }
    }

    pub fn reveal_columns(columns: impl IntoIterator<Item = usize>) -> Self {
        Command::RevealColumns {
            columns: columns.into_iter().collect(),
            applied: Vec::new(),
        }
    }

    /// Replaces the whole document (new file, open file).
    pub fn replace_all(document: &Document, contents: Snapshot) -> Self {
        Command::ReplaceAll {
            contents,
            previous: document.snapshot(),
        }
    }

    /// Short description for status messages.
    pub fn label(&self) -> String {
        match self {
            Command::AddSequences { sequences } => match sequences.as_slice() {
                [single] => format!("Add sequence {}", single.name()),
                many => format!("Add {} sequences", many.len()),
            },
            Command::RemoveSequences { ids, .. } => format!("Remove {} sequence(s)", ids.len()),
            Command::RenameSequence { name, .. } => format!("Rename sequence to {}", name),
            Command::ReplaceLetters { label, .. } => label.clone(),
            Command::InsertLetters { letters, .. } => format!("Insert {} letter(s)", letters.len()),
            Command::RemoveLetters { count, .. } => format!("Remove {} letter(s)", count),
            Command::MarkLetters { annotation: None, count, .. } => format!("Unmark {} letter(s)", count),
            Command::MarkLetters { count, .. } => format!("Mark {} letter(s)", count),
            Command::AddAnnotation { annotation } => format!("Add annotation {}", annotation.description),
            Command::RemoveAnnotation { annotation, .. } => {
                format!("Remove annotation {}", annotation.description)
            }
            Command::SetAnnotationColor { color, .. } => format!("Annotation colour {}", color),
            Command::SetAnnotationDescription { description, .. } => {
                format!("Annotation name {}", description)
            }
            Command::HideColumns { columns, .. } => format!("Hide {} column(s)", columns.len()),
            Command::RevealColumns { columns, .. } => format!("Reveal {} column(s)", columns.len()),
            Command::ReplaceAll { .. } => "Replace document".to_string(),
        }
    }

    /// Performs the edit.
    pub fn apply(&mut self, document: &mut Document) -> EditResult<()> {
        match self {
            Command::AddSequences { sequences } => {
                document.add_sequences(sequences.clone());
            }
            Command::RemoveSequences { ids, removed } => {
                *removed = document.remove_sequences(ids);
            }
            Command::RenameSequence { sequence, name, .. } => {
                document.rename_sequence(*sequence, name.clone())?;
            }
            Command::ReplaceLetters { sequence, letters, .. } => {
                document.replace_letters(*sequence, letters.clone())?;
            }
            Command::InsertLetters {
                sequence,
                position,
                letters,
            } => {
                document.insert_letters(*sequence, *position, letters.clone())?;
            }
            Command::RemoveLetters {
                sequence,
                position,
                count,
                removed,
            } => {
                *removed = document.remove_letters(*sequence, *position, *count)?;
            }
            Command::MarkLetters {
                sequence,
                start,
                count,
                annotation,
                previous,
            } => {
                *previous = document.mark_range(*sequence, *start, *count, *annotation)?;
            }
            Command::AddAnnotation { annotation } => {
                document.add_annotations(vec![annotation.clone()]);
            }
            Command::RemoveAnnotation { annotation, .. } => {
                document.remove_annotation(annotation.id())?;
            }
            Command::SetAnnotationColor { annotation, color, .. } => {
                document.set_annotation_color(*annotation, color.clone())?;
            }
            Command::SetAnnotationDescription {
                annotation,
                description,
                ..
            } => {
                document.set_annotation_description(*annotation, description.clone())?;
            }
            Command::HideColumns { columns, applied } => {
                *applied = document.add_hidden_columns(columns.iter().copied());
            }
            Command::RevealColumns { columns, applied } => {
                *applied = document.remove_hidden_columns(columns.iter().copied());
            }
            Command::ReplaceAll { contents, previous } => {
                *previous = document.replace_all(contents.clone());
            }
        }
        Ok(())
    }

    /// Undoes a previous `apply`.
    pub fn revert(&mut self, document: &mut Document) -> EditResult<()> {
        match self {
            Command::AddSequences { sequences } => {
                let ids: Vec<SequenceId> = sequences.iter().map(Sequence::id).collect();
                // keep the edited state so that a redo brings it back unchanged
                *sequences = document
                    .remove_sequences(&ids)
                    .into_iter()
                    .map(|(_, s)| s)
                    .collect();
            }
            Command::RemoveSequences { removed, .. } => {
                for (index, sequence) in std::mem::take(removed) {
                    document.insert_sequences(index, vec![sequence])?;
                }
            }
            Command::RenameSequence { sequence, previous, .. } => {
                document.rename_sequence(*sequence, previous.clone())?;
            }
            Command::ReplaceLetters { sequence, previous, .. } => {
                document.replace_letters(*sequence, previous.clone())?;
            }
            Command::InsertLetters {
                sequence,
                position,
                letters,
            } => {
                document.remove_letters(*sequence, *position, letters.len())?;
            }
            Command::RemoveLetters {
                sequence,
                position,
                removed,
                ..
            } => {
                // nothing was removed past the end, and there is nothing to put back
                if !removed.is_empty() {
                    document.insert_letters(*sequence, *position, std::mem::take(removed))?;
                }
            }
            Command::MarkLetters { sequence, previous, .. } => {
                document.assign_annotations(*sequence, previous)?;
            }
            Command::AddAnnotation { annotation } => {
                document.remove_annotation(annotation.id())?;
            }
            Command::RemoveAnnotation {
                annotation,
                index,
                references,
            } => {
                document.insert_annotations(*index, vec![annotation.clone()])?;
                let id = Some(annotation.id());
                for (sequence, letters) in references.iter() {
                    let assignments: Vec<(LetterId, Option<AnnotationId>)> =
                        letters.iter().map(|letter| (*letter, id)).collect();
                    document.assign_annotations(*sequence, &assignments)?;
                }
            }
            Command::SetAnnotationColor { annotation, previous, .. } => {
                document.set_annotation_color(*annotation, previous.clone())?;
            }
            Command::SetAnnotationDescription {
                annotation,
                previous,
                ..
            } => {
                document.set_annotation_description(*annotation, previous.clone())?;
            }
            Command::HideColumns { applied, .. } => {
                document.remove_hidden_columns(applied.iter().copied());
            }
            Command::RevealColumns { applied, .. } => {
                document.add_hidden_columns(applied.iter().copied());
            }
            Command::ReplaceAll { contents, previous } => {
                *contents = document.replace_all(previous.clone());
            }
        }
        Ok(())
    }
}

fn lookup_sequence(document: &Document, id: SequenceId) -> EditResult<&Sequence> {
    document.sequence(id).ok_or(EditError::UnknownSequence(id))
}

fn lookup_annotation(document: &Document, id: AnnotationId) -> EditResult<&Annotation> {
    document.annotation(id).ok_or(EditError::UnknownAnnotation(id))
}

/// Undo/redo stacks with a saved-state marker.
#[derive(Debug)]
pub struct History {
    done: Vec<Command>,
    undone: Vec<Command>,
    /// Length of `done` when the document was last saved, `None` if that
    /// state can no longer be reached
    saved_at: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            done: Vec::new(),
            undone: Vec::new(),
            saved_at: Some(0),
        }
    }

    /// Applies a command and records it. Failed commands are not recorded.
    pub fn push(&mut self, mut command: Command, document: &mut Document) -> EditResult<()> {
        command.apply(document)?;
        debug!("applied: {}", command.label());
        if matches!(self.saved_at, Some(saved) if saved > self.done.len()) {
            self.saved_at = None;
        }
        self.done.push(command);
        self.undone.clear();
        Ok(())
    }

    /// Reverts the last command. Returns its label, or `None` if there is
    /// nothing to undo.
    pub fn undo(&mut self, document: &mut Document) -> EditResult<Option<String>> {
        let Some(mut command) = self.done.pop() else {
            return Ok(None);
        };
        if let Err(e) = command.revert(document) {
            self.done.push(command);
            return Err(e);
        }
        let label = command.label();
        debug!("undone: {}", label);
        self.undone.push(command);
        Ok(Some(label))
    }

    /// Re-applies the last undone command.
    pub fn redo(&mut self, document: &mut Document) -> EditResult<Option<String>> {
        let Some(mut command) = self.undone.pop() else {
            return Ok(None);
        };
        if let Err(e) = command.apply(document) {
            self.undone.push(command);
            return Err(e);
        }
        let label = command.label();
        debug!("redone: {}", label);
        self.done.push(command);
        Ok(Some(label))
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Records the current state as saved.
    pub fn mark_saved(&mut self) {
        self.saved_at = Some(self.done.len());
    }

    /// Returns true if the document differs from the last saved state.
    pub fn is_dirty(&self) -> bool {
        self.saved_at != Some(self.done.len())
    }
}
