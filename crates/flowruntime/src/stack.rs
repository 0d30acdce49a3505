//! Middleware chain around node invocation.
//!
//! Layers run outermost first; each receives the invocation and a [`Next`]
//! handle for the rest of the chain. The innermost core checks for
//! termination, calls the node and wraps the result into a provenance
//! record whose sources are the input records.

use chrono::Utc;
use flowcore::{
    EventBus, ExecutionEvent, NodeContext, NodeError, NodeRef, Producer, Record, StateHandle, Value,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info_span, warn};

/// A single node call travelling through the stack
#[derive(Debug, Clone)]
pub struct Invocation {
    pub node: NodeRef,
    pub inputs: Vec<Arc<Record>>,
    pub dependencies: Vec<Arc<Record>>,
}

/// A call-wrapping layer
pub trait Layer: Send + Sync {
    fn name(&self) -> &str;

    fn call(&self, invocation: Invocation, next: Next<'_>) -> Result<Arc<Record>, NodeError>;
}

/// The remainder of the chain below the current layer
pub struct Next<'a> {
    layers: &'a [Arc<dyn Layer>],
    core: &'a Core,
}

impl Next<'_> {
    pub fn run(self, invocation: Invocation) -> Result<Arc<Record>, NodeError> {
        match self.layers.split_first() {
            Some((layer, rest)) => layer.call(
                invocation,
                Next {
                    layers: rest,
                    core: self.core,
                },
            ),
            None => self.core.call(invocation),
        }
    }
}

struct Core {
    state: StateHandle,
    events: Arc<EventBus>,
}

impl Core {
    fn call(&self, invocation: Invocation) -> Result<Arc<Record>, NodeError> {
        self.state.check_terminate()?;

        let Invocation {
            node,
            inputs,
            dependencies,
        } = invocation;
        let ctx = NodeContext::new(node.id(), self.state.clone(), self.events.create_emitter(node.id()))
            .with_dependencies(dependencies);
        let values: Vec<Value> = inputs.iter().map(|r| r.value().clone()).collect();
        let value = node.call(&ctx, &values)?;

        Ok(Record::new(Producer::Node(node), value, inputs))
    }
}

pub struct Stack {
    layers: Vec<Arc<dyn Layer>>,
    core: Core,
}

impl Stack {
    /// A bare stack: just the core.
    pub fn new(state: StateHandle, events: Arc<EventBus>) -> Self {
        Self {
            layers: Vec::new(),
            core: Core { state, events },
        }
    }

    /// Core wrapped by the tracing and event layers.
    pub fn with_defaults(state: StateHandle, events: Arc<EventBus>) -> Self {
        let mut stack = Self::new(state, Arc::clone(&events));
        stack.push(Arc::new(TracingLayer));
        stack.push(Arc::new(EventLayer::new(events)));
        stack
    }

    /// Add a layer inside the existing ones, just outside the core.
    pub fn push(&mut self, layer: Arc<dyn Layer>) {
        self.layers.push(layer);
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    pub fn invoke(&self, invocation: Invocation) -> Result<Arc<Record>, NodeError> {
        Next {
            layers: &self.layers,
            core: &self.core,
        }
        .run(invocation)
    }
}

/// Wraps every call in a span and logs its duration
pub struct TracingLayer;

impl Layer for TracingLayer {
    fn name(&self) -> &str {
        "tracing"
    }

    fn call(&self, invocation: Invocation, next: Next<'_>) -> Result<Arc<Record>, NodeError> {
        let span = info_span!("node", name = %invocation.node, node_type = invocation.node.node_type());
        let _entered = span.enter();
        let start = Instant::now();

        let result = next.run(invocation);
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(record) => debug!(elapsed_ms, value = %record.value(), "node completed"),
            Err(NodeError::Terminated) => debug!(elapsed_ms, "node unwound by terminate"),
            Err(e) => warn!(elapsed_ms, error = %e, "node failed"),
        }
        result
    }
}

/// Publishes node start/complete/fail events on the bus
pub struct EventLayer {
    events: Arc<EventBus>,
}

impl EventLayer {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self { events }
    }
}

impl Layer for EventLayer {
    fn name(&self) -> &str {
        "events"
    }

    fn call(&self, invocation: Invocation, next: Next<'_>) -> Result<Arc<Record>, NodeError> {
        let node = invocation.node.clone();
        self.events.emit(ExecutionEvent::NodeStarted {
            node_id: node.id(),
            node: node.name().to_string(),
            timestamp: Utc::now(),
        });

        let start = Instant::now();
        let result = next.run(invocation);
        match &result {
            Ok(_) => self.events.emit(ExecutionEvent::NodeCompleted {
                node_id: node.id(),
                node: node.name().to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            }),
            Err(e) => self.events.emit(ExecutionEvent::NodeFailed {
                node_id: node.id(),
                node: node.name().to_string(),
                error: e.to_string(),
                timestamp: Utc::now(),
            }),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowcore::RunState;
    use parking_lot::Mutex;

    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Layer for Recording {
        fn name(&self) -> &str {
            self.label
        }

        fn call(&self, invocation: Invocation, next: Next<'_>) -> Result<Arc<Record>, NodeError> {
            self.log.lock().push(format!("enter {}", self.label));
            let result = next.run(invocation);
            self.log.lock().push(format!("leave {}", self.label));
            result
        }
    }

    fn invocation(node: &NodeRef, inputs: Vec<Arc<Record>>) -> Invocation {
        Invocation {
            node: node.clone(),
            inputs,
            dependencies: Vec::new(),
        }
    }

    #[test]
    fn layers_wrap_outermost_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut stack = Stack::new(StateHandle::new(), Arc::new(EventBus::default()));
        stack.push(Arc::new(Recording { label: "outer", log: log.clone() }));
        stack.push(Arc::new(Recording { label: "inner", log: log.clone() }));

        let node = NodeRef::from_fn("noop", |_, _| Ok(Value::Null));
        stack.invoke(invocation(&node, Vec::new())).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["enter outer", "enter inner", "leave inner", "leave outer"]
        );
        assert_eq!(stack.layer_names(), vec!["outer", "inner"]);
    }

    #[test]
    fn core_sources_result_from_inputs() {
        let stack = Stack::with_defaults(StateHandle::new(), Arc::new(EventBus::default()));
        let node = NodeRef::from_fn("sum", |_, inputs| {
            Ok(Value::from(inputs.iter().filter_map(|v| v.as_f64()).sum::<f64>()))
        });
        let a = Record::external(1);
        let b = Record::external(2);

        let record = stack.invoke(invocation(&node, vec![a.clone(), b.clone()])).unwrap();
        assert_eq!(record.value(), &Value::from(3));
        assert!(record.is_merge());
        assert_eq!(record.node(), Some(&node));
    }

    #[test]
    fn core_refuses_to_call_when_terminating() {
        let state = StateHandle::new();
        state.set(RunState::Terminating);
        let stack = Stack::new(state, Arc::new(EventBus::default()));
        let node = NodeRef::from_fn("never", |_, _| Err(NodeError::failed("called")));

        assert_eq!(
            stack.invoke(invocation(&node, Vec::new())).unwrap_err(),
            NodeError::Terminated
        );
    }

    #[test]
    fn event_layer_reports_failures() {
        let events = Arc::new(EventBus::default());
        let mut receiver = events.subscribe();
        let stack = Stack::with_defaults(StateHandle::new(), events);
        let node = NodeRef::from_fn("boom", |_, _| Err(NodeError::failed("boom")));

        assert!(stack.invoke(invocation(&node, Vec::new())).is_err());
        assert!(matches!(receiver.try_recv(), Ok(ExecutionEvent::NodeStarted { .. })));
        assert!(matches!(receiver.try_recv(), Ok(ExecutionEvent::NodeFailed { .. })));
    }
}
