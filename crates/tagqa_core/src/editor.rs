use std::fmt;

use thiserror::Error;

use crate::history::SessionHistory;
use crate::{KeywordSpec, LanguageCode, SequenceNumber, UrlSpec};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("keyword text cannot be empty")]
    EmptyText,
    #[error("url cannot be empty")]
    EmptyUrl,
    #[error("sequence number must be at least 1")]
    InvalidSequence,
    #[error("keyword '{text}' [{language}] #{sequence} already exists")]
    Duplicate {
        text: String,
        language: LanguageCode,
        sequence: SequenceNumber,
    },
    #[error("no entry at position {index} (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A record that can live in an [`EditableList`].
pub trait ListRecord: Clone + PartialEq + fmt::Debug {
    fn validate(&self) -> Result<(), EditError>;

    /// Rejects `self` if it may not coexist with `other` in one list.
    fn check_conflict(&self, other: &Self) -> Result<(), EditError>;

    /// Whether a pasted record should be skipped because `other` is already present.
    fn already_listed_as(&self, other: &Self) -> bool;
}

impl ListRecord for KeywordSpec {
    fn validate(&self) -> Result<(), EditError> {
        if self.text.trim().is_empty() {
            return Err(EditError::EmptyText);
        }
        if self.sequence == 0 {
            return Err(EditError::InvalidSequence);
        }
        Ok(())
    }

    fn check_conflict(&self, other: &Self) -> Result<(), EditError> {
        if self.same_identity(other) {
            return Err(EditError::Duplicate {
                text: self.text.clone(),
                language: self.language,
                sequence: self.sequence,
            });
        }
        Ok(())
    }

    fn already_listed_as(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl ListRecord for UrlSpec {
    fn validate(&self) -> Result<(), EditError> {
        if self.url.trim().is_empty() {
            return Err(EditError::EmptyUrl);
        }
        if self.sequence == 0 {
            return Err(EditError::InvalidSequence);
        }
        Ok(())
    }

    // Duplicate URLs are allowed so a page can be swept more than once.
    fn check_conflict(&self, _other: &Self) -> Result<(), EditError> {
        Ok(())
    }

    fn already_listed_as(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PasteStats {
    pub added: usize,
    pub skipped: usize,
}

/// Ordered list of records with validated edits and snapshot undo/redo.
///
/// Every successful mutation commits a snapshot; failed edits leave the list
/// and its history untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableList<R> {
    items: Vec<R>,
    history: SessionHistory<R>,
}

impl<R: ListRecord> EditableList<R> {
    pub fn new(history_depth: usize) -> Self {
        Self::with_items(Vec::new(), history_depth)
    }

    pub fn with_items(items: Vec<R>, history_depth: usize) -> Self {
        let mut history = SessionHistory::new(history_depth);
        history.commit(items.clone());
        Self { items, history }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&R> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn add(&mut self, record: R) -> Result<(), EditError> {
        record.validate()?;
        for existing in &self.items {
            record.check_conflict(existing)?;
        }
        self.items.push(record);
        self.commit();
        Ok(())
    }

    /// Replaces the record at `index`; the old record is excluded from the conflict check.
    pub fn replace(&mut self, index: usize, record: R) -> Result<(), EditError> {
        self.check_index(index)?;
        record.validate()?;
        for (pos, existing) in self.items.iter().enumerate() {
            if pos != index {
                record.check_conflict(existing)?;
            }
        }
        self.items[index] = record;
        self.commit();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<R, EditError> {
        self.check_index(index)?;
        let removed = self.items.remove(index);
        self.commit();
        Ok(removed)
    }

    /// Removes everything. Returns false when the list was already empty.
    pub fn clear(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        self.items.clear();
        self.commit();
        true
    }

    /// Appends records that validate and are not already listed, as one undoable edit.
    pub fn paste(&mut self, records: impl IntoIterator<Item = R>) -> PasteStats {
        let mut stats = PasteStats::default();
        for record in records {
            let listed = self
                .items
                .iter()
                .any(|existing| record.already_listed_as(existing));
            if listed || record.validate().is_err() {
                stats.skipped += 1;
                continue;
            }
            self.items.push(record);
            stats.added += 1;
        }
        if stats.added > 0 {
            self.commit();
        }
        stats
    }

    /// Replaces the whole list, e.g. from a loaded session.
    ///
    /// Records that fail validation or conflict with an earlier record are
    /// dropped. Returns how many were dropped.
    pub fn load(&mut self, records: Vec<R>) -> usize {
        let offered = records.len();
        let mut accepted: Vec<R> = Vec::with_capacity(offered);
        for record in records {
            let fits = record.validate().is_ok()
                && accepted
                    .iter()
                    .all(|other| record.check_conflict(other).is_ok());
            if fits {
                accepted.push(record);
            }
        }
        let dropped = offered - accepted.len();
        self.items = accepted;
        self.commit();
        dropped
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(state) => {
                self.items = state.to_vec();
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.items = state.to_vec();
                true
            }
            None => false,
        }
    }

    fn check_index(&self, index: usize) -> Result<(), EditError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(EditError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    fn commit(&mut self) {
        self.history.commit(self.items.clone());
    }
}

/// Splits pasted text into trimmed, non-empty lines.
pub fn pasted_lines(raw: &str) -> impl Iterator<Item = &str> {
    raw.lines().map(str::trim).filter(|line| !line.is_empty())
}
