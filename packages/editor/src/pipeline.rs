//! # Commit Pipeline
//!
//! Every committed change takes the same path:
//!
//! ```text
//! live Dom ──derivations (bar sync)──▶ clean serialization ──▶ Snapshot ──▶ History
//! ```
//!
//! Snapshots are serialized without UI markers, so selecting an element
//! never makes a document differ from its history entry.

use crate::history::{History, PushOutcome, Snapshot};
use crate::overlay::clean_options;
use crate::sync::SyncEngine;
use std::collections::BTreeMap;
use tracing::debug;
use vellum_parser::{serialize_children, Dom};

/// Result of one commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitResult {
    /// Elements rewritten by derivations
    pub derived: usize,
    pub outcome: PushOutcome,
}

/// Owns the derivations and the history they feed
#[derive(Debug)]
pub struct Pipeline {
    sync: SyncEngine,
    history: History,
}

impl Pipeline {
    pub fn new(capacity: usize) -> Self {
        Self::with_sync(SyncEngine::new(), capacity)
    }

    pub fn with_sync(sync: SyncEngine, capacity: usize) -> Self {
        Self {
            sync,
            history: History::with_capacity(capacity),
        }
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Normalize derived content, then record the result
    pub fn commit(&mut self, dom: &mut Dom, colors: &BTreeMap<String, String>) -> CommitResult {
        let derived = self.sync.run(dom);
        let outcome = self.record(dom, colors);
        debug!(derived, ?outcome, len = self.history.len(), "Committed");
        CommitResult { derived, outcome }
    }

    /// Record the document as-is (pre-operation snapshots)
    pub fn record(&mut self, dom: &Dom, colors: &BTreeMap<String, String>) -> PushOutcome {
        self.history.push(snapshot_of(dom, colors))
    }
}

/// Snapshot of the live document without UI markers
pub fn snapshot_of(dom: &Dom, colors: &BTreeMap<String, String>) -> Snapshot {
    Snapshot::new(serialize_children(dom, dom.root(), &clean_options()), colors.clone())
}
