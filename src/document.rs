//! The document: sequences, annotations and hidden columns.
//!
//! `Document` owns every entity of an editing session and enforces the
//! invariants that span them:
//! - a letter only refers to an annotation that is part of the document
//! - removing an annotation clears every reference to it before returning
//! - hidden columns form a set, independent of any sequence length
//!
//! Every mutation notifies the registered listeners synchronously, after the
//! mutation is complete, with the exact delta (see [`Change`]).
//! `replace_all` is the only operation reported as a wholesale [`Change::Reset`].

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use log::debug;

use crate::model::{
    clamp_range, Annotation, AnnotationId, EditError, EditResult, Letter, LetterId, Sequence,
    SequenceId,
};

/// A single mutation of a [`Document`], as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Sequences were inserted, starting at `index`
    SequencesAdded { index: usize, sequences: Vec<SequenceId> },
    /// Sequences were removed
    SequencesRemoved(Vec<SequenceId>),
    /// A sequence got a new name
    SequenceRenamed { sequence: SequenceId, name: String },
    /// Letters were inserted before `position`
    LettersInserted {
        sequence: SequenceId,
        position: usize,
        letters: Vec<Letter>,
    },
    /// Letters were removed starting at `position`
    LettersRemoved {
        sequence: SequenceId,
        position: usize,
        letters: Vec<Letter>,
    },
    /// The whole letter list of a sequence was replaced
    LettersReplaced { sequence: SequenceId },
    /// Annotation references changed on a range of letters
    LettersMarked {
        sequence: SequenceId,
        start: usize,
        count: usize,
    },
    AnnotationsAdded(Vec<AnnotationId>),
    AnnotationRemoved(AnnotationId),
    /// Colour or description of an annotation changed
    AnnotationChanged(AnnotationId),
    HiddenColumnsAdded(Vec<usize>),
    HiddenColumnsRemoved(Vec<usize>),
    /// Everything was replaced at once
    Reset,
}

/// Handle returned by [`Document::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

/// Callback invoked after each mutation.
pub type Listener = Box<dyn FnMut(&Change)>;

/// Copy of the three top-level containers of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub sequences: Vec<Sequence>,
    pub annotations: Vec<Annotation>,
    pub hidden_columns: BTreeSet<usize>,
}

impl Snapshot {
    /// Creates a snapshot holding only sequences.
    pub fn from_sequences(sequences: Vec<Sequence>) -> Self {
        Self {
            sequences,
            ..Self::default()
        }
    }
}

/// The editable collection of sequences.
#[derive(Default)]
pub struct Document {
    sequences: Vec<Sequence>,
    annotations: Vec<Annotation>,
    hidden_columns: BTreeSet<usize>,
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("sequences", &self.sequences)
            .field("annotations", &self.annotations)
            .field("hidden_columns", &self.hidden_columns)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a document from loaded contents.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut document = Self::new();
        document.install(snapshot);
        document
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn hidden_columns(&self) -> &BTreeSet<usize> {
        &self.hidden_columns
    }

    /// Returns true if column `col` is hidden.
    pub fn is_hidden(&self, col: usize) -> bool {
        self.hidden_columns.contains(&col)
    }

    /// Returns the number of sequences.
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Returns true if the document holds no sequences.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Length of the longest sequence.
    pub fn width(&self) -> usize {
        self.sequences.iter().map(Sequence::len).max().unwrap_or(0)
    }

    pub fn sequence(&self, id: SequenceId) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id() == id)
    }

    pub fn sequence_index(&self, id: SequenceId) -> Option<usize> {
        self.sequences.iter().position(|s| s.id() == id)
    }

    pub fn annotation(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id() == id)
    }

    /// First annotation with the given description.
    pub fn annotation_by_description(&self, description: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.description == description)
    }

    /// Annotation of a letter, resolved.
    pub fn annotation_of(&self, letter: &Letter) -> Option<&Annotation> {
        letter.annotation().and_then(|id| self.annotation(id))
    }

    /// Copies of the sequences, annotations and hidden columns.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sequences: self.sequences.clone(),
            annotations: self.annotations.clone(),
            hidden_columns: self.hidden_columns.clone(),
        }
    }

    /// Every letter referencing `annotation`, grouped by sequence.
    pub fn annotation_references(&self, annotation: AnnotationId) -> Vec<(SequenceId, Vec<LetterId>)> {
        self.sequences
            .iter()
            .filter_map(|s| {
                let letters: Vec<LetterId> = s
                    .letters()
                    .iter()
                    .filter(|l| l.annotation() == Some(annotation))
                    .map(Letter::id)
                    .collect();
                (!letters.is_empty()).then(|| (s.id(), letters))
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Listeners
    // ---------------------------------------------------------------------

    /// Registers a listener called after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: ListenerId) {
        self.listeners.retain(|(lid, _)| *lid != id);
    }

    fn notify(&mut self, change: Change) {
        debug!("document change: {:?}", change);
        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
    }

    // ---------------------------------------------------------------------
    // Sequences
    // ---------------------------------------------------------------------

    /// Appends sequences.
    pub fn add_sequences(&mut self, sequences: Vec<Sequence>) {
        self.splice_sequences(self.sequences.len(), sequences);
    }

    /// Inserts sequences before `index`.
    pub fn insert_sequences(&mut self, index: usize, sequences: Vec<Sequence>) -> EditResult<()> {
        if index > self.sequences.len() {
            return Err(EditError::InvalidIndex {
                index,
                len: self.sequences.len(),
            });
        }
        self.splice_sequences(index, sequences);
        Ok(())
    }

    /// `index` must be at most the number of sequences.
    fn splice_sequences(&mut self, index: usize, mut sequences: Vec<Sequence>) {
        if sequences.is_empty() {
            return;
        }
        let known = self.annotation_ids();
        for sequence in sequences.iter_mut() {
            drop_unknown_annotations(sequence.letters_mut(), &known);
        }
        let ids = sequences.iter().map(Sequence::id).collect();
        self.sequences.splice(index..index, sequences);
        self.notify(Change::SequencesAdded {
            index,
            sequences: ids,
        });
    }

    /// Removes sequences by id. Sequences not in the document are skipped.
    ///
    /// Returns the removed sequences with the index each one had before the
    /// call, in ascending index order.
    pub fn remove_sequences(&mut self, ids: &[SequenceId]) -> Vec<(usize, Sequence)> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.sequences.len());
        for (index, sequence) in self.sequences.drain(..).enumerate() {
            if ids.contains(&sequence.id()) {
                removed.push((index, sequence));
            } else {
                kept.push(sequence);
            }
        }
        self.sequences = kept;
        if !removed.is_empty() {
            let ids = removed.iter().map(|(_, s)| s.id()).collect();
            self.notify(Change::SequencesRemoved(ids));
        }
        removed
    }

    /// Renames a sequence and returns the previous name.
    pub fn rename_sequence(&mut self, id: SequenceId, name: impl Into<String>) -> EditResult<String> {
        let name = name.into();
        let previous = self.sequence_mut(id)?.set_name(name.clone());
        self.notify(Change::SequenceRenamed { sequence: id, name });
        Ok(previous)
    }

    /// Inserts letters before `position` of a sequence.
    pub fn insert_letters(
        &mut self,
        id: SequenceId,
        position: usize,
        letters: Vec<Letter>,
    ) -> EditResult<()> {
        let known = self.annotation_ids();
        let mut letters = letters;
        drop_unknown_annotations(&mut letters, &known);
        let sequence = self.sequence_mut(id)?;
        let updated = sequence.inserted(position, &letters)?;
        sequence.set_letters(updated);
        self.notify(Change::LettersInserted {
            sequence: id,
            position,
            letters,
        });
        Ok(())
    }

    /// Removes up to `count` letters at `position`, clamped to the sequence.
    ///
    /// Returns the letters actually removed. Listeners are only told when
    /// there were any.
    pub fn remove_letters(&mut self, id: SequenceId, position: usize, count: usize) -> EditResult<Vec<Letter>> {
        let sequence = self.sequence_mut(id)?;
        let (remaining, removed) = sequence.removed(position, count);
        if removed.is_empty() {
            return Ok(removed);
        }
        sequence.set_letters(remaining);
        self.notify(Change::LettersRemoved {
            sequence: id,
            position,
            letters: removed.clone(),
        });
        Ok(removed)
    }

    /// Replaces the letters of a sequence and returns the previous ones.
    pub fn replace_letters(&mut self, id: SequenceId, letters: Vec<Letter>) -> EditResult<Vec<Letter>> {
        let known = self.annotation_ids();
        let mut letters = letters;
        drop_unknown_annotations(&mut letters, &known);
        let previous = self.sequence_mut(id)?.set_letters(letters);
        self.notify(Change::LettersReplaced { sequence: id });
        Ok(previous)
    }

    /// Sets the annotation of `count` letters from `start`, clamped.
    ///
    /// Returns the previous annotation of every affected letter.
    pub fn mark_range(
        &mut self,
        id: SequenceId,
        start: usize,
        count: usize,
        annotation: Option<AnnotationId>,
    ) -> EditResult<Vec<(LetterId, Option<AnnotationId>)>> {
        if let Some(annotation) = annotation {
            if self.annotation(annotation).is_none() {
                return Err(EditError::UnknownAnnotation(annotation));
            }
        }
        let sequence = self.sequence_mut(id)?;
        let range = clamp_range(start, count, sequence.len());
        let previous: Vec<_> = sequence.letters()[range.clone()]
            .iter()
            .map(|l| (l.id(), l.annotation()))
            .collect();
        let updated = sequence.marked(start, count, annotation);
        sequence.set_letters(updated);
        self.notify(Change::LettersMarked {
            sequence: id,
            start: range.start,
            count: range.len(),
        });
        Ok(previous)
    }

    /// Sets annotations on individual letters of a sequence, by letter id.
    ///
    /// Letters no longer in the sequence are skipped; references to unknown
    /// annotations are stored as `None`.
    pub fn assign_annotations(
        &mut self,
        id: SequenceId,
        assignments: &[(LetterId, Option<AnnotationId>)],
    ) -> EditResult<()> {
        let known = self.annotation_ids();
        let wanted: HashMap<LetterId, Option<AnnotationId>> = assignments.iter().copied().collect();
        let sequence = self.sequence_mut(id)?;
        let mut first: Option<usize> = None;
        let mut last = 0;
        for (index, letter) in sequence.letters_mut().iter_mut().enumerate() {
            if let Some(annotation) = wanted.get(&letter.id()) {
                letter.set_annotation((*annotation).filter(|a| known.contains(a)));
                first.get_or_insert(index);
                last = index;
            }
        }
        if let Some(start) = first {
            self.notify(Change::LettersMarked {
                sequence: id,
                start,
                count: last - start + 1,
            });
        }
        Ok(())
    }

    fn sequence_mut(&mut self, id: SequenceId) -> EditResult<&mut Sequence> {
        self.sequences
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(EditError::UnknownSequence(id))
    }

    // ---------------------------------------------------------------------
    // Annotations
    // ---------------------------------------------------------------------

    /// Appends annotations. Annotations already present are skipped.
    pub fn add_annotations(&mut self, annotations: Vec<Annotation>) {
        self.splice_annotations(self.annotations.len(), annotations);
    }

    /// Inserts annotations before `index`. Annotations already present are skipped.
    pub fn insert_annotations(&mut self, index: usize, annotations: Vec<Annotation>) -> EditResult<()> {
        if index > self.annotations.len() {
            return Err(EditError::InvalidIndex {
                index,
                len: self.annotations.len(),
            });
        }
        self.splice_annotations(index, annotations);
        Ok(())
    }

    /// `index` must be at most the number of annotations.
    fn splice_annotations(&mut self, index: usize, annotations: Vec<Annotation>) {
        let known = self.annotation_ids();
        let mut fresh: Vec<Annotation> = Vec::with_capacity(annotations.len());
        for annotation in annotations {
            if !known.contains(&annotation.id()) && !fresh.iter().any(|a| a.id() == annotation.id()) {
                fresh.push(annotation);
            }
        }
        if fresh.is_empty() {
            return;
        }
        let ids = fresh.iter().map(Annotation::id).collect();
        self.annotations.splice(index..index, fresh);
        self.notify(Change::AnnotationsAdded(ids));
    }

    /// Removes an annotation and clears every letter that referenced it.
    ///
    /// Scans all letters of all sequences. Returns the removed annotation and
    /// the index it had.
    pub fn remove_annotation(&mut self, id: AnnotationId) -> EditResult<(usize, Annotation)> {
        let index = self
            .annotations
            .iter()
            .position(|a| a.id() == id)
            .ok_or(EditError::UnknownAnnotation(id))?;
        let mut cleared = 0usize;
        for sequence in self.sequences.iter_mut() {
            for letter in sequence.letters_mut() {
                if letter.annotation() == Some(id) {
                    letter.set_annotation(None);
                    cleared += 1;
                }
            }
        }
        let annotation = self.annotations.remove(index);
        debug!(
            "removed annotation '{}', cleared {} letters",
            annotation.description, cleared
        );
        self.notify(Change::AnnotationRemoved(id));
        Ok((index, annotation))
    }

    /// Changes the colour of an annotation and returns the previous one.
    pub fn set_annotation_color(&mut self, id: AnnotationId, color: impl Into<String>) -> EditResult<String> {
        let annotation = self.annotation_mut(id)?;
        let previous = std::mem::replace(&mut annotation.color, color.into());
        self.notify(Change::AnnotationChanged(id));
        Ok(previous)
    }

    /// Changes the description of an annotation and returns the previous one.
    pub fn set_annotation_description(
        &mut self,
        id: AnnotationId,
        description: impl Into<String>,
    ) -> EditResult<String> {
        let annotation = self.annotation_mut(id)?;
        let previous = std::mem::replace(&mut annotation.description, description.into());
        self.notify(Change::AnnotationChanged(id));
        Ok(previous)
    }

    fn annotation_mut(&mut self, id: AnnotationId) -> EditResult<&mut Annotation> {
        self.annotations
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or(EditError::UnknownAnnotation(id))
    }

    fn annotation_ids(&self) -> HashSet<AnnotationId> {
        self.annotations.iter().map(Annotation::id).collect()
    }

    // ---------------------------------------------------------------------
    // Hidden columns
    // ---------------------------------------------------------------------

    /// Hides columns. Returns the columns that were not hidden before.
    pub fn add_hidden_columns(&mut self, columns: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let added: Vec<usize> = columns
            .into_iter()
            .filter(|col| self.hidden_columns.insert(*col))
            .collect();
        if !added.is_empty() {
            self.notify(Change::HiddenColumnsAdded(added.clone()));
        }
        added
    }

    /// Reveals columns. Returns the columns that were hidden before.
    pub fn remove_hidden_columns(&mut self, columns: impl IntoIterator<Item = usize>) -> Vec<usize> {
        let removed: Vec<usize> = columns
            .into_iter()
            .filter(|col| self.hidden_columns.remove(col))
            .collect();
        if !removed.is_empty() {
            self.notify(Change::HiddenColumnsRemoved(removed.clone()));
        }
        removed
    }

    // ---------------------------------------------------------------------
    // Whole document
    // ---------------------------------------------------------------------

    /// Replaces all contents at once and returns the previous contents.
    pub fn replace_all(&mut self, snapshot: Snapshot) -> Snapshot {
        let previous = self.snapshot();
        self.install(snapshot);
        self.notify(Change::Reset);
        previous
    }

    fn install(&mut self, snapshot: Snapshot) {
        let Snapshot {
            mut sequences,
            annotations,
            hidden_columns,
        } = snapshot;
        let known: HashSet<AnnotationId> = annotations.iter().map(Annotation::id).collect();
        for sequence in sequences.iter_mut() {
            drop_unknown_annotations(sequence.letters_mut(), &known);
        }
        self.sequences = sequences;
        self.annotations = annotations;
        self.hidden_columns = hidden_columns;
    }
}

fn drop_unknown_annotations(letters: &mut [Letter], known: &HashSet<AnnotationId>) {
    for letter in letters.iter_mut() {
        if let Some(annotation) = letter.annotation() {
            if !known.contains(&annotation) {
                letter.set_annotation(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::model::{blank_letters, letters_from_text};

    fn recorder(document: &mut Document) -> Rc<RefCell<Vec<Change>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        document.subscribe(move |change| sink.borrow_mut().push(change.clone()));
        log
    }

    fn two_sequences() -> (Document, SequenceId, SequenceId) {
        let a = Sequence::from_text("A", "ACGT");
        let b = Sequence::from_text("B", "TTAA");
        let (ia, ib) = (a.id(), b.id());
        let mut document = Document::new();
        document.add_sequences(vec![a, b]);
        (document, ia, ib)
    }

    #[test]
    fn test_add_and_remove_sequences() {
        let mut document = Document::new();
        let log = recorder(&mut document);
        let a = Sequence::from_text("A", "AC");
        let b = Sequence::from_text("B", "GT");
        let (ia, ib) = (a.id(), b.id());
        document.add_sequences(vec![a, b]);
        assert_eq!(document.sequence_count(), 2);
        assert_eq!(
            log.borrow()[0],
            Change::SequencesAdded {
                index: 0,
                sequences: vec![ia, ib]
            }
        );

        let removed = document.remove_sequences(&[ib]);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, 1);
        assert_eq!(log.borrow()[1], Change::SequencesRemoved(vec![ib]));

        // redundant removal is a no-op without notification
        assert!(document.remove_sequences(&[ib]).is_empty());
        assert_eq!(log.borrow().len(), 2);
        assert_eq!(document.sequences()[0].id(), ia);
    }

    #[test]
    fn test_insert_sequences_at_index() {
        let (mut document, ia, ib) = two_sequences();
        let c = Sequence::from_text("C", "GG");
        let ic = c.id();
        document.insert_sequences(1, vec![c]).unwrap();
        let order: Vec<SequenceId> = document.sequences().iter().map(Sequence::id).collect();
        assert_eq!(order, vec![ia, ic, ib]);
        assert!(matches!(
            document.insert_sequences(9, vec![Sequence::from_text("D", "A")]),
            Err(EditError::InvalidIndex { index: 9, len: 3 })
        ));
    }

    #[test]
    fn test_insert_and_remove_letters_notify_delta() {
        let (mut document, ia, _) = two_sequences();
        let log = recorder(&mut document);
        let gaps = blank_letters(2);
        document.insert_letters(ia, 1, gaps.clone()).unwrap();
        assert_eq!(document.sequence(ia).unwrap().as_string(), "A~~CGT");
        assert_eq!(
            log.borrow()[0],
            Change::LettersInserted {
                sequence: ia,
                position: 1,
                letters: gaps.clone()
            }
        );

        let removed = document.remove_letters(ia, 1, 2).unwrap();
        assert_eq!(removed, gaps);
        assert_eq!(document.sequence(ia).unwrap().as_string(), "ACGT");
    }

    #[test]
    fn test_insert_letters_out_of_range() {
        let (mut document, ia, _) = two_sequences();
        let err = document.insert_letters(ia, 5, letters_from_text("A")).unwrap_err();
        assert_eq!(err, EditError::InvalidPosition { position: 5, len: 4 });
        assert_eq!(document.sequence(ia).unwrap().as_string(), "ACGT");
    }

    #[test]
    fn test_remove_letters_clamps() {
        let (mut document, ia, _) = two_sequences();
        let removed = document.remove_letters(ia, 2, 10).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(document.remove_letters(ia, 10, 1).unwrap().is_empty());
        assert_eq!(document.sequence(ia).unwrap().as_string(), "AC");
    }

    #[test]
    fn test_removing_nothing_is_silent() {
        let (mut document, ia, _) = two_sequences();
        let log = recorder(&mut document);
        assert!(document.remove_letters(ia, 10, 1).unwrap().is_empty());
        assert!(document.remove_letters(ia, 1, 0).unwrap().is_empty());
        assert!(log.borrow().is_empty());
        assert_eq!(document.sequence(ia).unwrap().as_string(), "ACGT");
    }

    #[test]
    fn test_assign_annotations_by_letter_id() {
        let (mut document, ia, _) = two_sequences();
        let exon = Annotation::new("exon1", "red");
        let eid = exon.id();
        document.add_annotations(vec![exon]);
        let ids: Vec<LetterId> = document.sequence(ia).unwrap().letters().iter().map(Letter::id).collect();
        let log = recorder(&mut document);

        // order of the assignments does not matter; a stranger id is skipped
        let stranger = Letter::new('A').id();
        document
            .assign_annotations(ia, &[(ids[2], Some(eid)), (stranger, Some(eid)), (ids[1], Some(eid))])
            .unwrap();
        let tags: Vec<_> = document.sequence(ia).unwrap().letters().iter().map(Letter::annotation).collect();
        assert_eq!(tags, vec![None, Some(eid), Some(eid), None]);
        assert_eq!(
            log.borrow()[0],
            Change::LettersMarked {
                sequence: ia,
                start: 1,
                count: 2
            }
        );
    }

    #[test]
    fn test_unknown_sequence() {
        let mut document = Document::new();
        let stranger = Sequence::from_text("X", "A");
        assert_eq!(
            document.rename_sequence(stranger.id(), "Y"),
            Err(EditError::UnknownSequence(stranger.id()))
        );
    }

    #[test]
    fn test_rename_sequence() {
        let (mut document, ia, _) = two_sequences();
        let log = recorder(&mut document);
        assert_eq!(document.rename_sequence(ia, "alpha").unwrap(), "A");
        assert_eq!(document.sequence(ia).unwrap().name(), "alpha");
        assert_eq!(
            log.borrow()[0],
            Change::SequenceRenamed {
                sequence: ia,
                name: "alpha".to_string()
            }
        );
    }

    #[test]
    fn test_mark_range_requires_known_annotation() {
        let (mut document, ia, _) = two_sequences();
        let stray = Annotation::new("stray", "blue");
        assert_eq!(
            document.mark_range(ia, 0, 2, Some(stray.id())),
            Err(EditError::UnknownAnnotation(stray.id()))
        );
    }

    #[test]
    fn test_mark_range_clamps_and_reports_previous() {
        let (mut document, ia, _) = two_sequences();
        let exon = Annotation::new("exon1", "#ff0000");
        let eid = exon.id();
        document.add_annotations(vec![exon]);
        let log = recorder(&mut document);

        let previous = document.mark_range(ia, 2, 9, Some(eid)).unwrap();
        assert_eq!(previous.len(), 2);
        assert!(previous.iter().all(|(_, a)| a.is_none()));
        assert_eq!(
            log.borrow()[0],
            Change::LettersMarked {
                sequence: ia,
                start: 2,
                count: 2
            }
        );
        let tags: Vec<_> = document.sequence(ia).unwrap().letters().iter().map(Letter::annotation).collect();
        assert_eq!(tags, vec![None, None, Some(eid), Some(eid)]);
    }

    #[test]
    fn test_remove_annotation_cascades() {
        let (mut document, ia, ib) = two_sequences();
        let exon = Annotation::new("exon1", "#ff0000");
        let eid = exon.id();
        document.add_annotations(vec![exon]);
        document.mark_range(ia, 0, 2, Some(eid)).unwrap();
        document.mark_range(ib, 1, 3, Some(eid)).unwrap();
        assert_eq!(document.annotation_references(eid).len(), 2);

        let (index, removed) = document.remove_annotation(eid).unwrap();
        assert_eq!(index, 0);
        assert!(document.annotation(eid).is_none());
        for sequence in document.sequences() {
            assert!(sequence.letters().iter().all(|l| l.annotation().is_none()));
        }

        // re-adding does not bring the references back
        document.add_annotations(vec![removed]);
        assert!(document.annotation(eid).is_some());
        assert!(document.annotation_references(eid).is_empty());
    }

    #[test]
    fn test_add_annotations_skips_duplicates() {
        let mut document = Document::new();
        let exon = Annotation::new("exon1", "red");
        document.add_annotations(vec![exon.clone(), exon.clone()]);
        document.add_annotations(vec![exon]);
        assert_eq!(document.annotations().len(), 1);
    }

    #[test]
    fn test_annotation_edits() {
        let mut document = Document::new();
        let exon = Annotation::new("exon1", "red");
        let eid = exon.id();
        document.add_annotations(vec![exon]);
        assert_eq!(document.set_annotation_color(eid, "#00ff00").unwrap(), "red");
        assert_eq!(document.set_annotation_description(eid, "exon2").unwrap(), "exon1");
        assert_eq!(document.annotation_by_description("exon2").unwrap().color, "#00ff00");
        assert!(document.annotation_by_description("exon1").is_none());
    }

    #[test]
    fn test_inserted_letters_lose_unknown_annotations() {
        let (mut document, ia, _) = two_sequences();
        let stray = Annotation::new("stray", "blue");
        let letters = vec![Letter::new('G').with_annotation(Some(stray.id()))];
        document.insert_letters(ia, 0, letters).unwrap();
        assert!(document.sequence(ia).unwrap().letters()[0].annotation().is_none());
    }

    #[test]
    fn test_hidden_columns_idempotent() {
        let mut document = Document::new();
        let log = recorder(&mut document);
        assert_eq!(document.add_hidden_columns([1, 3]), vec![1, 3]);
        assert!(document.add_hidden_columns([3]).is_empty());
        assert!(document.remove_hidden_columns([7]).is_empty());
        assert_eq!(log.borrow().len(), 1);
        assert!(document.is_hidden(1));
        assert!(!document.is_hidden(2));

        assert_eq!(document.remove_hidden_columns([1, 2]), vec![1]);
        assert_eq!(document.hidden_columns().iter().copied().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_hidden_columns_beyond_sequences() {
        let (mut document, _, _) = two_sequences();
        document.add_hidden_columns([100]);
        assert!(document.is_hidden(100));
        assert_eq!(document.width(), 4);
    }

    #[test]
    fn test_replace_all_single_notification() {
        let (mut document, _, _) = two_sequences();
        document.add_hidden_columns([2]);
        let log = recorder(&mut document);

        let previous = document.replace_all(Snapshot::default());
        assert!(document.is_empty());
        assert!(document.hidden_columns().is_empty());
        assert_eq!(*log.borrow(), vec![Change::Reset]);

        document.replace_all(previous);
        assert_eq!(document.sequence_count(), 2);
        assert!(document.is_hidden(2));
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let (mut document, ia, _) = two_sequences();
        let snapshot = document.snapshot();
        document.remove_sequences(&[ia]);
        assert_eq!(snapshot.sequences.len(), 2);
        assert_eq!(document.sequence_count(), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut document = Document::new();
        let log = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&log);
        let id = document.subscribe(move |_| *sink.borrow_mut() += 1);
        document.add_hidden_columns([1]);
        document.unsubscribe(id);
        document.add_hidden_columns([2]);
        assert_eq!(*log.borrow(), 1);
    }
}
