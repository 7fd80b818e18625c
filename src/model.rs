//! Data model for annotated sequences.
//!
//! This module contains the leaf entities of a document:
//! - `Annotation`: a described, coloured label
//! - `Letter`: one position of a sequence, optionally tagged with an annotation
//! - `Sequence`: a named, ordered list of letters
//!
//! Letters, sequences and annotations carry identities. Two letters with the
//! same character are different entities, and a letter refers to its
//! annotation by `AnnotationId` rather than owning it.
//!
//! All operations on `Sequence` are pure: they return a new letter list and
//! leave the sequence untouched. Applying the result (and notifying
//! observers) is the job of [`crate::document::Document`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

/// Reserved character of a gap (blank placeholder) letter.
pub const GAP: char = '~';

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            fn next() -> Self {
                Self(next_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

entity_id!(
    /// Identity of a [`Letter`].
    LetterId,
    "letter"
);
entity_id!(
    /// Identity of a [`Sequence`].
    SequenceId,
    "sequence"
);
entity_id!(
    /// Identity of an [`Annotation`].
    AnnotationId,
    "annotation"
);

/// Errors raised by edit operations on sequences and documents.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Invalid position {position} (sequence has {len} letters)")]
    InvalidPosition { position: usize, len: usize },

    #[error("Invalid index {index} (only {len} entries)")]
    InvalidIndex { index: usize, len: usize },

    #[error("{0} is not part of the sequence")]
    LetterNotFound(LetterId),

    #[error("Unknown {0}")]
    UnknownSequence(SequenceId),

    #[error("Unknown {0}")]
    UnknownAnnotation(AnnotationId),
}

/// Result type for edit operations.
pub type EditResult<T> = Result<T, EditError>;

/// A coloured label that can be applied to letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    id: AnnotationId,
    /// Human readable label, used as key in save files
    pub description: String,
    /// Colour as `#RRGGBB` or a colour name
    pub color: String,
}

impl Annotation {
    /// Creates a new annotation with a fresh identity.
    pub fn new(description: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: AnnotationId::next(),
            description: description.into(),
            color: color.into(),
        }
    }

    pub fn id(&self) -> AnnotationId {
        self.id
    }
}

/// A single position of a sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    id: LetterId,
    character: char,
    annotation: Option<AnnotationId>,
}

impl Letter {
    /// Creates an unannotated letter with a fresh identity.
    pub fn new(character: char) -> Self {
        Self {
            id: LetterId::next(),
            character,
            annotation: None,
        }
    }

    /// Creates a gap letter.
    pub fn blank() -> Self {
        Self::new(GAP)
    }

    pub fn id(&self) -> LetterId {
        self.id
    }

    pub fn character(&self) -> char {
        self.character
    }

    pub fn annotation(&self) -> Option<AnnotationId> {
        self.annotation
    }

    /// Returns true for the gap placeholder.
    pub fn is_gap(&self) -> bool {
        self.character == GAP
    }

    pub(crate) fn with_annotation(mut self, annotation: Option<AnnotationId>) -> Self {
        self.annotation = annotation;
        self
    }

    pub(crate) fn set_annotation(&mut self, annotation: Option<AnnotationId>) {
        self.annotation = annotation;
    }
}

/// Removes all whitespace and upper-cases the rest.
pub fn normalize_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Creates one letter per character of the normalized `raw` text.
pub fn letters_from_text(raw: &str) -> Vec<Letter> {
    normalize_text(raw).chars().map(Letter::new).collect()
}

/// Creates `count` gap letters without annotation.
pub fn blank_letters(count: usize) -> Vec<Letter> {
    (0..count).map(|_| Letter::blank()).collect()
}

/// A named sequence of letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    id: SequenceId,
    name: String,
    letters: Vec<Letter>,
}

impl Sequence {
    /// Creates a sequence from explicit letters.
    pub fn from_letters(name: impl Into<String>, letters: Vec<Letter>) -> Self {
        Self {
            id: SequenceId::next(),
            name: name.into(),
            letters,
        }
    }

    /// Creates a sequence from raw text (whitespace stripped, upper-cased).
    ///
    /// Empty text gives a sequence without letters.
    pub fn from_text(name: impl Into<String>, raw_text: &str) -> Self {
        Self::from_letters(name, letters_from_text(raw_text))
    }

    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn letters(&self) -> &[Letter] {
        &self.letters
    }

    /// Returns the number of letters.
    pub fn len(&self) -> usize {
        self.letters.len()
    }

    /// Returns true if the sequence has no letters.
    pub fn is_empty(&self) -> bool {
        self.letters.is_empty()
    }

    /// Gets the letter at a specific position.
    pub fn letter(&self, pos: usize) -> Option<&Letter> {
        self.letters.get(pos)
    }

    /// Gets the character at a specific position.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.letters.get(pos).map(Letter::character)
    }

    /// The letters as plain text.
    pub fn as_string(&self) -> String {
        self.letters.iter().map(Letter::character).collect()
    }

    /// Position of a letter, compared by identity.
    pub fn index_of(&self, letter: LetterId) -> EditResult<usize> {
        self.letters
            .iter()
            .position(|l| l.id == letter)
            .ok_or(EditError::LetterNotFound(letter))
    }

    /// 1-based number of the letter when gap letters are not counted.
    pub fn ordinal_excluding_gaps(&self, letter: LetterId) -> EditResult<usize> {
        let index = self.index_of(letter)?;
        let gaps_before = self.letters[..index].iter().filter(|l| l.is_gap()).count();
        Ok(index - gaps_before + 1)
    }

    /// Letter list with `letters` inserted before `position`.
    ///
    /// `position == len()` appends. Larger positions are rejected.
    pub fn inserted(&self, position: usize, letters: &[Letter]) -> EditResult<Vec<Letter>> {
        if position > self.letters.len() {
            return Err(EditError::InvalidPosition {
                position,
                len: self.letters.len(),
            });
        }
        let mut result = Vec::with_capacity(self.letters.len() + letters.len());
        result.extend_from_slice(&self.letters[..position]);
        result.extend_from_slice(letters);
        result.extend_from_slice(&self.letters[position..]);
        Ok(result)
    }

    /// Splits off up to `count` letters starting at `position`.
    ///
    /// Returns `(remaining, removed)`. The range is clamped to the sequence,
    /// so removing past the end removes fewer letters (or none).
    pub fn removed(&self, position: usize, count: usize) -> (Vec<Letter>, Vec<Letter>) {
        let range = clamp_range(position, count, self.letters.len());
        let mut remaining = Vec::with_capacity(self.letters.len() - range.len());
        remaining.extend_from_slice(&self.letters[..range.start]);
        remaining.extend_from_slice(&self.letters[range.end..]);
        (remaining, self.letters[range].to_vec())
    }

    /// Every letter followed by two fresh gap letters (codon slots).
    pub fn amino_acid_expansion(&self) -> Vec<Letter> {
        let mut result = Vec::with_capacity(self.letters.len() * 3);
        for letter in &self.letters {
            result.push(letter.clone());
            result.push(Letter::blank());
            result.push(Letter::blank());
        }
        result
    }

    /// Letter list with `count` letters from `start` set to `annotation`.
    pub fn marked(&self, start: usize, count: usize, annotation: Option<AnnotationId>) -> Vec<Letter> {
        let range = clamp_range(start, count, self.letters.len());
        self.letters
            .iter()
            .enumerate()
            .map(|(i, l)| {
                if range.contains(&i) {
                    l.clone().with_annotation(annotation)
                } else {
                    l.clone()
                }
            })
            .collect()
    }

    pub(crate) fn set_name(&mut self, name: String) -> String {
        std::mem::replace(&mut self.name, name)
    }

    pub(crate) fn set_letters(&mut self, letters: Vec<Letter>) -> Vec<Letter> {
        std::mem::replace(&mut self.letters, letters)
    }

    pub(crate) fn letters_mut(&mut self) -> &mut [Letter] {
        &mut self.letters
    }
}

/// `start..start+count` clamped to `0..len`.
pub(crate) fn clamp_range(start: usize, count: usize, len: usize) -> std::ops::Range<usize> {
    let start = start.min(len);
    let end = start.saturating_add(count).min(len);
    start..end
}
