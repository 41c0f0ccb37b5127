//! # History Manager
//!
//! Bounded, linear snapshot history.
//!
//! ## Design
//!
//! - Every commit stores a full `Snapshot` (markup + colors), not a diff
//! - The cursor points at the snapshot that matches the live document
//! - Pushing while the cursor is interior discards everything after it
//! - Pushing past capacity evicts the oldest snapshot
//! - Pushing a snapshot equal to the current one is a no-op
//! - While a restore is in progress pushes are suppressed, so restoring
//!   a snapshot never records itself
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! history.push(Snapshot::new("<p>a</p>", colors.clone()));
//! history.push(Snapshot::new("<p>b</p>", colors.clone()));
//!
//! let previous = history.undo().cloned();   // "<p>a</p>"
//! let next = history.redo().cloned();       // "<p>b</p>"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Default number of snapshots kept
pub const DEFAULT_CAPACITY: usize = 60;

/// One point in edit history. Equality compares markup and the full
/// color map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub body_markup: String,
    pub colors: BTreeMap<String, String>,
}

impl Snapshot {
    pub fn new(body_markup: impl Into<String>, colors: BTreeMap<String, String>) -> Self {
        Self {
            body_markup: body_markup.into(),
            colors,
        }
    }
}

/// Result of `History::push`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended as the new current snapshot
    Recorded,
    /// Equal to the current snapshot; nothing changed
    Duplicate,
    /// A restore is in progress; nothing changed
    Suppressed,
}

impl PushOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, PushOutcome::Recorded)
    }
}

/// Linear undo history
#[derive(Debug)]
pub struct History {
    entries: VecDeque<Snapshot>,

    /// Index of the current snapshot. Only meaningful when non-empty.
    cursor: usize,

    /// Maximum number of entries (at least 1)
    capacity: usize,

    /// Set while a snapshot is being restored into the live document
    skip_recording: bool,
}

impl History {
    /// Create a history with the default capacity (60)
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            cursor: 0,
            capacity,
            skip_recording: false,
        }
    }

    /// Record a snapshot as the new current state
    pub fn push(&mut self, snapshot: Snapshot) -> PushOutcome {
        if self.skip_recording {
            return PushOutcome::Suppressed;
        }
        if self.current() == Some(&snapshot) {
            return PushOutcome::Duplicate;
        }

        // Drop the redo tail
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }

        self.entries.push_back(snapshot);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
        PushOutcome::Recorded
    }

    /// Step back. Returns the snapshot to restore, or `None` at the oldest
    /// entry.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward. Returns the snapshot to restore, or `None` at the tail.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    /// The snapshot matching the live document
    pub fn current(&self) -> Option<&Snapshot> {
        self.entries.get(self.cursor)
    }

    pub fn cursor(&self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.cursor)
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.cursor + 1 < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: usize) -> Option<&Snapshot> {
        self.entries.get(index)
    }

    /// Suppress recording until `end_restore`
    pub fn begin_restore(&mut self) {
        self.skip_recording = true;
    }

    pub fn end_restore(&mut self) {
        self.skip_recording = false;
    }

    pub fn is_restoring(&self) -> bool {
        self.skip_recording
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.skip_recording = false;
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
