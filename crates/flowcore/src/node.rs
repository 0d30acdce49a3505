use crate::{events::EventEmitter, Join, NodeError, Record, StateHandle, Value};
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

pub type NodeId = Uuid;

/// Core trait that all executable nodes implement
pub trait Node: Send + Sync {
    /// Type identifier (e.g., "math.increment", "text.concat")
    fn node_type(&self) -> &str;

    /// Run the operation over the input values and produce one result.
    ///
    /// Long-running implementations should call `ctx.check_terminate()`
    /// periodically so `terminate()` can unwind them.
    fn call(&self, ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError>;
}

/// Execution context passed to each node call
#[derive(Clone)]
pub struct NodeContext {
    pub node_id: NodeId,

    /// Resolved dependency records, in declaration order
    pub dependencies: Vec<Arc<Record>>,

    /// Orchestrator state, used by the termination probe
    pub state: StateHandle,

    /// Event emitter for real-time updates
    pub events: EventEmitter,
}

impl NodeContext {
    pub fn new(node_id: NodeId, state: StateHandle, events: EventEmitter) -> Self {
        Self {
            node_id,
            dependencies: Vec::new(),
            state,
            events,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Arc<Record>>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Termination check-point. Propagate the error with `?`.
    pub fn check_terminate(&self) -> Result<(), NodeError> {
        self.state.check_terminate()
    }

    /// Value produced by the dependency at `index`
    pub fn dependency(&self, index: usize) -> Option<&Value> {
        self.dependencies.get(index).map(|r| r.value())
    }
}

/// Get a required positional input or fail with `MissingInput`
pub fn require_input(inputs: &[Value], index: usize) -> Result<&Value, NodeError> {
    inputs
        .get(index)
        .ok_or_else(|| NodeError::MissingInput(format!("#{}", index)))
}

type NodeFn = dyn Fn(&NodeContext, &[Value]) -> Result<Value, NodeError> + Send + Sync;

/// Adapter that makes a closure dispatchable
pub struct FnNode {
    f: Box<NodeFn>,
}

impl FnNode {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&NodeContext, &[Value]) -> Result<Value, NodeError> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }
}

impl Node for FnNode {
    fn node_type(&self) -> &str {
        "fn"
    }

    fn call(&self, ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        (self.f)(ctx, inputs)
    }
}

struct NodeCell {
    id: NodeId,
    name: String,
    node: Box<dyn Node>,
    dependencies: RwLock<Vec<NodeRef>>,
    join: RwLock<Option<Arc<dyn Join>>>,
}

/// Shared handle to a dispatchable node.
///
/// Equality is identity: two handles are equal only if they point at the
/// same node. Dependencies and the join are attached before first dispatch.
#[derive(Clone)]
pub struct NodeRef {
    inner: Arc<NodeCell>,
}

impl NodeRef {
    pub fn new(name: impl Into<String>, node: impl Node + 'static) -> Self {
        Self {
            inner: Arc::new(NodeCell {
                id: Uuid::new_v4(),
                name: name.into(),
                node: Box::new(node),
                dependencies: RwLock::new(Vec::new()),
                join: RwLock::new(None),
            }),
        }
    }

    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&NodeContext, &[Value]) -> Result<Value, NodeError> + Send + Sync + 'static,
    {
        Self::new(name, FnNode::new(f))
    }

    pub fn with_dependencies(self, dependencies: impl IntoIterator<Item = NodeRef>) -> Self {
        self.inner.dependencies.write().extend(dependencies);
        self
    }

    pub fn add_dependency(&self, dependency: &NodeRef) {
        self.inner.dependencies.write().push(dependency.clone());
    }

    pub fn set_join(&self, join: Arc<dyn Join>) {
        *self.inner.join.write() = Some(join);
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn node_type(&self) -> &str {
        self.inner.node.node_type()
    }

    pub fn dependencies(&self) -> Vec<NodeRef> {
        self.inner.dependencies.read().clone()
    }

    pub fn join(&self) -> Option<Arc<dyn Join>> {
        self.inner.join.read().clone()
    }

    pub fn call(&self, ctx: &NodeContext, inputs: &[Value]) -> Result<Value, NodeError> {
        self.inner.node.call(ctx, inputs)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("name", &self.inner.name)
            .field("type", &self.node_type())
            .field("id", &self.inner.id)
            .finish()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}
