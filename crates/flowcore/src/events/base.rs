use crate::{NodeId, RunState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

pub type RunId = Uuid;

/// How a run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// The queue emptied.
    Drained,
    /// `stop()` was honoured between dispatches.
    Stopped,
    /// A termination probe unwound the in-flight node.
    Terminated,
    /// An error ended the loop.
    Failed,
}

/// Events emitted by the orchestrator and its middleware stack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExecutionEvent {
    RunStarted {
        run_id: RunId,
        queued: usize,
        timestamp: DateTime<Utc>,
    },
    RunFinished {
        run_id: RunId,
        outcome: RunOutcome,
        dispatched: usize,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    StateChanged {
        from: RunState,
        to: RunState,
        timestamp: DateTime<Utc>,
    },
    NodeStarted {
        node_id: NodeId,
        node: String,
        timestamp: DateTime<Utc>,
    },
    NodeCompleted {
        node_id: NodeId,
        node: String,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        node_id: NodeId,
        node: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeEvent {
        node_id: NodeId,
        event: NodeEvent,
        timestamp: DateTime<Utc>,
    },
}

/// Events a node may publish while it runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum NodeEvent {
    Info { message: String },
    Warning { message: String },
    Progress { percent: f64, message: Option<String> },
}

/// Event emitter for nodes to send real-time updates
#[derive(Clone)]
pub struct EventEmitter {
    node_id: NodeId,
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventEmitter {
    pub fn new(node_id: NodeId, sender: broadcast::Sender<ExecutionEvent>) -> Self {
        Self { node_id, sender }
    }

    /// Emit a node-specific event
    pub fn emit(&self, event: NodeEvent) {
        // No subscribers is not an error.
        let _ = self.sender.send(ExecutionEvent::NodeEvent {
            node_id: self.node_id,
            event,
            timestamp: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Info {
            message: message.into(),
        });
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.emit(NodeEvent::Warning {
            message: message.into(),
        });
    }

    pub fn progress(&self, percent: f64, message: Option<String>) {
        self.emit(NodeEvent::Progress { percent, message });
    }
}

/// Broadcast bus shared by an orchestrator and its stack
///
/// `send` is synchronous, so publishing works from the blocking run loop
/// without an async runtime. Subscribers can drain with `try_recv`.
pub struct EventBus {
    sender: broadcast::Sender<ExecutionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ExecutionEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if self.sender.send(event).is_err() {
            trace!("event dropped: no subscribers");
        }
    }

    pub fn create_emitter(&self, node_id: NodeId) -> EventEmitter {
        EventEmitter::new(node_id, self.sender.clone())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}
