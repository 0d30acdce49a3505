use crate::aggregate::Aggregator;
use crate::queue::WorkQueue;
use crate::registry::DependencyRegistry;
use crate::stack::{Invocation, Layer, Stack};
use chrono::Utc;
use flowcore::{
    ConfigError, Dispatcher, EventBus, ExecutionEvent, FlowError, Input, NodeError, NodeRef, Record, RunOutcome,
    RunState, StateHandle,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Configuration for the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Propagate node failures out of `run` instead of logging them.
    pub debug: bool,
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug: false,
            event_buffer_size: 1000,
        }
    }
}

impl RuntimeConfig {
    /// Read `FLOW_DEBUG` and `FLOW_EVENT_BUFFER`, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("FLOW_DEBUG") {
            config.debug = parse_flag("FLOW_DEBUG", &raw)?;
        }
        if let Ok(raw) = std::env::var("FLOW_EVENT_BUFFER") {
            config.event_buffer_size = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "FLOW_EVENT_BUFFER".to_string(),
                value: raw.clone(),
            })?;
        }
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// The orchestrator: owns the queue, dependency registry, middleware stack
/// and run state, and drains the queue one dispatch at a time.
///
/// `enqueue`, `stop`, `terminate` and the state accessors may be called
/// from other threads while `run` is draining; each of the queue, registry
/// and state has its own lock.
pub struct App {
    config: RuntimeConfig,
    queue: WorkQueue,
    registry: DependencyRegistry,
    stack: Stack,
    state: StateHandle,
    events: Arc<EventBus>,
    results: Aggregator,
}

/// Returns the state to `Ready` however the run loop exits.
struct ReadyGuard<'a> {
    app: &'a App,
}

impl Drop for ReadyGuard<'_> {
    fn drop(&mut self) {
        let prev = self.app.state.set(RunState::Ready);
        if prev != RunState::Ready {
            self.app.emit_state(prev, RunState::Ready);
        }
    }
}

impl App {
    /// Create an orchestrator with default settings
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let state = StateHandle::new();
        let events = Arc::new(EventBus::new(config.event_buffer_size));
        let stack = Stack::with_defaults(state.clone(), Arc::clone(&events));

        Self {
            config,
            queue: WorkQueue::new(),
            registry: DependencyRegistry::new(),
            stack,
            state,
            events,
            results: Aggregator::new(),
        }
    }

    /// Install an extra middleware layer just outside the core.
    pub fn with_layer(mut self, layer: Arc<dyn Layer>) -> Self {
        self.stack.push(layer);
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Append a node and its inputs to the back of the queue.
    pub fn enqueue<I>(&self, node: &NodeRef, inputs: I)
    where
        I: IntoIterator,
        I::Item: Into<Input>,
    {
        self.queue.push(node.clone(), inputs.into_iter().map(Into::into).collect());
    }

    /// Drain the queue until it is empty or the run is stopped/terminated.
    ///
    /// A no-op unless the state is `Ready`. Node failures are logged and end
    /// the loop without an error, unless `RuntimeConfig::debug` is set.
    /// Structural errors (cycles, slot collisions, bad switch indices) are
    /// always returned. The state is `Ready` again when this returns.
    pub fn run(&self) -> Result<(), FlowError> {
        let (prev, started) = self
            .state
            .transition(|s| s == RunState::Ready, RunState::Running);
        if !started {
            debug!(state = %prev, "run requested while not ready; ignoring");
            return Ok(());
        }
        self.emit_state(prev, RunState::Running);
        let _ready = ReadyGuard { app: self };

        let run_id = Uuid::new_v4();
        let start = Instant::now();
        info!(%run_id, queued = self.queue.len(), "run started");
        self.events.emit(ExecutionEvent::RunStarted {
            run_id,
            queued: self.queue.len(),
            timestamp: Utc::now(),
        });

        let mut dispatched = 0;
        let (outcome, result) = match self.drain(&mut dispatched) {
            Ok(()) => {
                let outcome = match self.state.get() {
                    RunState::Stopping => RunOutcome::Stopped,
                    RunState::Terminating => RunOutcome::Terminated,
                    _ => RunOutcome::Drained,
                };
                (outcome, Ok(()))
            }
            Err(e) if e.is_termination() => (RunOutcome::Terminated, Ok(())),
            Err(e) if self.config.debug || e.is_structural() => {
                error!(action = e.kind(), message = %e, "run aborted");
                (RunOutcome::Failed, Err(e))
            }
            Err(e) => {
                error!(
                    action = e.kind(),
                    message = %e,
                    remaining = self.queue.len(),
                    "node failed; run loop exited"
                );
                (RunOutcome::Failed, Ok(()))
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(%run_id, ?outcome, dispatched, duration_ms, "run finished");
        self.events.emit(ExecutionEvent::RunFinished {
            run_id,
            outcome,
            dispatched,
            duration_ms,
            timestamp: Utc::now(),
        });
        result
    }

    fn drain(&self, dispatched: &mut usize) -> Result<(), FlowError> {
        while self.state.is_running() {
            let Some(entry) = self.queue.pop() else {
                break;
            };
            debug!(node = %entry.node, inputs = entry.inputs.len(), "dequeued");
            self.dispatch(&entry.node, entry.inputs)?;
            *dispatched += 1;
        }
        Ok(())
    }

    /// Let the in-flight node finish, then leave the run loop.
    pub fn stop(&self) -> Result<(), FlowError> {
        let (from, moved) = self
            .state
            .transition(|s| s == RunState::Running, RunState::Stopping);
        if !moved {
            return Err(FlowError::InvalidTransition { from, action: "stop" });
        }
        warn!(queued = self.queue.len(), "stop requested");
        self.emit_state(from, RunState::Stopping);
        Ok(())
    }

    /// Ask the in-flight node to unwind at its next termination probe.
    pub fn terminate(&self) -> Result<(), FlowError> {
        let (from, moved) = self
            .state
            .transition(|s| s != RunState::Ready, RunState::Terminating);
        if !moved {
            return Err(FlowError::InvalidTransition {
                from,
                action: "terminate",
            });
        }
        if from != RunState::Terminating {
            warn!(queued = self.queue.len(), "terminate requested");
            self.emit_state(from, RunState::Terminating);
        }
        Ok(())
    }

    /// Termination check-point for code holding the orchestrator directly.
    pub fn check_terminate(&self) -> Result<(), NodeError> {
        self.state.check_terminate()
    }

    /// Resolve the node's dependencies, call it through the stack, then hand
    /// the record to its join (or store it if it has none).
    pub fn dispatch(&self, node: &NodeRef, inputs: Vec<Input>) -> Result<Arc<Record>, FlowError> {
        let invoke = |dependency: &NodeRef, resolved: Vec<Arc<Record>>| self.invoke(dependency, Vec::new(), resolved);
        let dependencies = self.registry.resolve_dependencies(node, &invoke)?;

        let inputs = inputs.into_iter().map(Input::into_record).collect();
        let record = self.invoke(node, inputs, dependencies)?;

        match node.join() {
            Some(join) => {
                debug!(node = %node, join = join.kind(), "handing result to join");
                join.on_complete(self, Arc::clone(&record))?;
            }
            None => self.complete(Arc::clone(&record)),
        }
        Ok(record)
    }

    fn invoke(&self, node: &NodeRef, inputs: Vec<Arc<Record>>, dependencies: Vec<Arc<Record>>) -> Result<Arc<Record>, FlowError> {
        let record = self.stack.invoke(Invocation {
            node: node.clone(),
            inputs,
            dependencies,
        })?;
        Ok(record)
    }

    /// Check the dependency graph reachable from `roots` for cycles up front.
    pub fn validate(&self, roots: &[NodeRef]) -> Result<(), FlowError> {
        DependencyRegistry::check_acyclic(roots)
    }

    pub fn state(&self) -> RunState {
        self.state.get()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    /// Status line: state name and queue depth.
    pub fn info(&self) -> String {
        format!("{} (queue: {})", self.state.get(), self.queue.len())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn clear_queue(&self) -> usize {
        self.queue.clear()
    }

    pub fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    pub fn reset_dependency(&self, node: &NodeRef, recursive: bool) {
        self.registry.reset(node, recursive);
    }

    /// Records stored by the default completion handler, in completion order.
    pub fn results(&self) -> Vec<Arc<Record>> {
        self.results.all()
    }

    pub fn results_for(&self, node: &NodeRef) -> Vec<Arc<Record>> {
        self.results.for_node(node)
    }

    pub fn take_results(&self) -> Vec<Arc<Record>> {
        self.results.take()
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn emit_state(&self, from: RunState, to: RunState) {
        self.events.emit(ExecutionEvent::StateChanged {
            from,
            to,
            timestamp: Utc::now(),
        });
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for App {
    fn submit(&self, node: &NodeRef, record: Arc<Record>, inline: bool) -> Result<(), FlowError> {
        if inline {
            self.dispatch(node, vec![Input::Record(record)])?;
        } else {
            self.queue.push(node.clone(), vec![Input::Record(record)]);
        }
        Ok(())
    }

    fn complete(&self, record: Arc<Record>) {
        self.results.push(record);
    }
}

static DEFAULT_APP: OnceLock<Arc<App>> = OnceLock::new();

/// Process-wide orchestrator for top-level entry points such as a CLI.
///
/// Library code should take an `&App` explicitly instead.
pub fn default_app() -> Arc<App> {
    Arc::clone(DEFAULT_APP.get_or_init(|| {
        let config = RuntimeConfig::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "ignoring invalid runtime environment");
            RuntimeConfig::default()
        });
        Arc::new(App::with_config(config))
    }))
}
