use flowcore::{Input, NodeRef};
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::trace;

/// A node waiting to be dispatched with its inputs
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub node: NodeRef,
    pub inputs: Vec<Input>,
}

/// Thread-safe FIFO of pending dispatches.
///
/// Every operation holds the lock only for the structural update, so
/// `push` never waits on a dispatch in progress.
#[derive(Debug, Default)]
pub struct WorkQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, node: NodeRef, inputs: Vec<Input>) {
        let mut entries = self.entries.lock();
        entries.push_back(QueueEntry { node, inputs });
        trace!(depth = entries.len(), "queued entry");
    }

    pub fn pop(&self) -> Option<QueueEntry> {
        self.entries.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drop every pending entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    /// Names of queued nodes, front first.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|e| e.node.name().to_string())
            .collect()
    }
}
