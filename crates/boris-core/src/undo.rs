//! Bounded undo history of event-list snapshots.

use std::collections::VecDeque;

use thiserror::Error;

use crate::event::Event;

/// Number of snapshots kept before the oldest is dropped.
pub const MAX_UNDO_QUEUE: usize = 25;

/// Returned when undo is requested with an empty history.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("nothing to undo")]
pub struct EmptyUndoError;

/// A snapshot taken before a mutation, with a label for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    pub events: Vec<Event>,
    pub label: String,
}

/// LIFO history of whole event lists.
///
/// Snapshots are owned copies, so later edits of the live list never leak
/// into the history.
#[derive(Debug, Clone)]
pub struct UndoStack {
    entries: VecDeque<UndoEntry>,
    capacity: usize,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_capacity(MAX_UNDO_QUEUE)
    }
}

impl UndoStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A history holding at most `capacity` snapshots (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records a snapshot, evicting the oldest when full.
    pub fn push(&mut self, events: &[Event], label: impl Into<String>) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(UndoEntry {
            events: events.to_vec(),
            label: label.into(),
        });
    }

    /// Takes back the most recent snapshot.
    pub fn pop(&mut self) -> Result<UndoEntry, EmptyUndoError> {
        self.entries.pop_back().ok_or(EmptyUndoError)
    }

    /// Label of the snapshot [`pop`](Self::pop) would return.
    #[must_use]
    pub fn peek_label(&self) -> Option<&str> {
        self.entries.back().map(|e| e.label.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
